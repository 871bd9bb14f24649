//! Scan frame and view geometry, and the sensor-to-view transform.
//!
//! The detector reports boxes in the coordinate space of the raw sensor
//! frame. On phones the sensor is mounted landscape while the preview is
//! shown portrait, so the frame is rotated 90° relative to what the view
//! displays. [`map_to_view`] undoes that rotation and scales the result into
//! the measured view.
//!
//! ```text
//!     sensor (640×480)                 view (480×640)
//!     ┌──────────────────┐             ┌───────────┐
//!     │ ▣ x→             │             │        y  │
//!     │ y                │    ───►     │        ↓ ▣│
//!     │ ↓                │             │   ←x      │
//!     └──────────────────┘             │           │
//!                                      └───────────┘
//! ```
//!
//! Only this fixed 90° mount is supported. The naive same-axis scale
//! (`x * view.width / frame.width`, no swap) and the variant that swaps the
//! axes without flipping both misplace boxes and are intentionally absent.
//!
//! # Example
//!
//! ```
//! use scanlayout::{FrameDimensions, Rect, ViewLayout, map_to_view};
//!
//! let mapped = map_to_view(
//!     Rect::new(100.0, 50.0, 20.0, 30.0),
//!     FrameDimensions::new(640.0, 480.0),
//!     ViewLayout::new(0.0, 0.0, 240.0, 640.0),
//! )
//! .unwrap();
//!
//! assert_eq!(mapped, Rect::new(200.0, 100.0, 15.0, 20.0));
//! ```

use core::fmt;

use num_traits::Float;

/// Axis-aligned rectangle. Top-left origin, x grows right, y grows down.
///
/// Used for both sensor-space detections and view-space overlay boxes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rect.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// All components finite and both extents non-negative.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// Right edge (`x + width`).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shift by `(dx, dy)`.
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow to whole pixels: top-left floors, bottom-right ceils.
    ///
    /// The snapped rect always contains the original.
    pub fn snap_outward(self) -> Self {
        let x0 = Float::floor(self.x);
        let y0 = Float::floor(self.y);
        let x1 = Float::ceil(self.right());
        let y1 = Float::ceil(self.bottom());
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Overlap with `other`, or `None` if they share no area.
    ///
    /// Rects that only touch along an edge do not overlap.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 > x0 && y1 > y0 {
            Some(Self::new(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }
}

/// Width and height of the sensor-reported scan frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameDimensions {
    pub width: f64,
    pub height: f64,
}

impl FrameDimensions {
    /// Stand-in used before the first frame arrives. Maps to a degenerate
    /// but defined result instead of dividing by zero.
    pub const PLACEHOLDER: Self = Self::new(1.0, 1.0);

    /// Create new frame dimensions.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both extents finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Landscape when wider than tall; square frames count as portrait.
    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Sensor extents used for scaling, as `(effective_w, effective_h)`.
    ///
    /// The longer side always comes first: a portrait frame is treated as
    /// the same landscape-mounted sensor reporting with its axes exchanged.
    pub fn effective_extents(&self) -> (f64, f64) {
        match self.orientation() {
            Orientation::Landscape => (self.width, self.height),
            Orientation::Portrait => (self.height, self.width),
        }
    }
}

impl Default for FrameDimensions {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

/// Orientation of a scan frame, derived from its dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Wider than tall.
    Landscape,
    /// Taller than wide, or square.
    Portrait,
}

/// Position and size of the preview surface as measured by the host.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ViewLayout {
    /// Offset of the surface within its parent.
    pub x: f64,
    /// Offset of the surface within its parent.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewLayout {
    /// Layout before the first measurement pass: everything zero.
    pub const UNMEASURED: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a new layout.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// All components finite and both extents non-negative. Zero is valid.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// The surface in its own coordinates: `(0, 0, width, height)`.
    pub fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Geometry error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// Frame extents not strictly positive, or view extents negative.
    /// Also covers non-finite values and scale factors that overflow.
    InvalidDimensions,
    /// Box with a negative extent or a non-finite component, before or
    /// after mapping.
    InvalidRect,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions => f.write_str("frame or view has invalid dimensions"),
            Self::InvalidRect => f.write_str("box has a negative extent or non-finite component"),
        }
    }
}

impl core::error::Error for GeometryError {}

/// Precomputed sensor-to-view transform for one frame and one view.
///
/// Build once per detection batch, then [`map`](Self::map) each box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SensorToView {
    frame: FrameDimensions,
    scale_x: f64,
    scale_y: f64,
}

impl SensorToView {
    /// Validate both inputs and compute the scale factors.
    ///
    /// View width scales against the rotated sensor's short axis, view height
    /// against its long axis.
    pub fn new(frame: FrameDimensions, view: ViewLayout) -> Result<Self, GeometryError> {
        if !frame.is_valid() || !view.is_valid() {
            return Err(GeometryError::InvalidDimensions);
        }
        let (effective_w, effective_h) = frame.effective_extents();
        // Guards the divisions below.
        if effective_w <= 0.0 || effective_h <= 0.0 {
            return Err(GeometryError::InvalidDimensions);
        }
        let scale_x = view.width / effective_h;
        let scale_y = view.height / effective_w;
        // A tiny frame under a large view overflows.
        if !scale_x.is_finite() || !scale_y.is_finite() {
            return Err(GeometryError::InvalidDimensions);
        }
        Ok(Self {
            frame,
            scale_x,
            scale_y,
        })
    }

    /// `(scale_x, scale_y)` applied to view-space x and y.
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Map one sensor-space box into view space.
    ///
    /// Sensor y (flipped against the frame height) becomes view x, sensor x
    /// becomes view y; extents swap accordingly. A box whose mapped
    /// components overflow is rejected as [`GeometryError::InvalidRect`].
    pub fn map(&self, rect: Rect) -> Result<Rect, GeometryError> {
        if !rect.is_valid() {
            return Err(GeometryError::InvalidRect);
        }
        let mapped = Rect::new(
            (self.frame.height - rect.y - rect.height) * self.scale_x,
            rect.x * self.scale_y,
            rect.height * self.scale_x,
            rect.width * self.scale_y,
        );
        if !mapped.is_valid() {
            return Err(GeometryError::InvalidRect);
        }
        Ok(mapped)
    }
}

/// Map one sensor-space box into view space.
///
/// Shorthand for [`SensorToView::new`] followed by [`SensorToView::map`].
/// Pure; a zero-size (unmeasured) view yields a zero-size box.
pub fn map_to_view(
    rect: Rect,
    frame: FrameDimensions,
    view: ViewLayout,
) -> Result<Rect, GeometryError> {
    SensorToView::new(frame, view)?.map(rect)
}
