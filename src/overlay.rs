//! Overlay controller: detection batches and layout in, view-space boxes out.
//!
//! The host pushes three kinds of events into an [`OverlayController`]:
//! device availability, detector batches, and layout measurements. After
//! every accepted event the overlay boxes are re-derived in full from the
//! latest batch and the latest layout. Nothing is merged across batches.
//!
//! ```text
//!     on_device ──► AwaitingDevice ──Available──► Ready ◄─┐
//!                        │                          │     │ on_detection
//!                        └──Missing──► NoDevice ◄───┘     │ on_layout
//!                                         │               │
//!                                         └──Available────┘
//! ```
//!
//! While in [`Phase::NoDevice`] every input is refused with
//! [`OverlayError::NoDevice`] before any geometry runs, and the host shows
//! an error indicator instead of boxes.

use alloc::vec::Vec;
use core::fmt;

use crate::geometry::{FrameDimensions, GeometryError, Rect, SensorToView, ViewLayout};
use crate::symbology::{DetectedCode, Symbology};

/// Result of the host's camera device lookup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    /// A usable camera was found.
    Available,
    /// No camera device exists.
    Missing,
}

/// Controller lifecycle phase.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No device lookup has been reported yet. Inputs are still accepted.
    #[default]
    AwaitingDevice,
    /// Device available; detections and layouts are mapped.
    Ready,
    /// No device; inputs are refused and no boxes are published.
    NoDevice,
}

/// Coordinate space of published overlay boxes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum OverlayOrigin {
    /// Relative to the preview surface's own top-left corner.
    #[default]
    View,
    /// Relative to the surface's parent, offset by [`ViewLayout::x`]/[`ViewLayout::y`].
    Parent,
}

/// How mapped boxes are post-processed before publishing.
///
/// # Example
///
/// ```
/// use scanlayout::{OverlayOptions, OverlayOrigin, Symbology};
///
/// let options = OverlayOptions::default()
///     .origin(OverlayOrigin::Parent)
///     .snap_to_pixels(true)
///     .symbologies(&[Symbology::Qr]);
///
/// assert!(options.accepts(Symbology::Qr));
/// assert!(!options.accepts(Symbology::Ean13));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayOptions {
    origin: OverlayOrigin,
    snap_to_pixels: bool,
    clip_to_view: bool,
    symbologies: Vec<Symbology>,
}

impl OverlayOptions {
    /// Accept only QR and Code 128, the pair a typical ticket/label scanner asks for.
    pub fn qr_and_code128() -> Self {
        Self::default().symbologies(&[Symbology::Qr, Symbology::Code128])
    }

    /// Coordinate space of the published boxes.
    pub fn origin(mut self, origin: OverlayOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Grow boxes outward to whole pixels.
    pub fn snap_to_pixels(mut self, snap: bool) -> Self {
        self.snap_to_pixels = snap;
        self
    }

    /// Intersect boxes with the view bounds, dropping any with no overlap.
    ///
    /// Before the first layout pass the view has no area, so clipping
    /// publishes nothing.
    pub fn clip_to_view(mut self, clip: bool) -> Self {
        self.clip_to_view = clip;
        self
    }

    /// Symbologies accepted by [`OverlayController::on_codes`]. Empty accepts all.
    pub fn symbologies(mut self, symbologies: &[Symbology]) -> Self {
        self.symbologies = symbologies.to_vec();
        self
    }

    /// Whether codes of this symbology are drawn.
    pub fn accepts(&self, symbology: Symbology) -> bool {
        self.symbologies.is_empty() || self.symbologies.contains(&symbology)
    }

    /// Snap, clip, then move into the requested origin.
    ///
    /// Clipping runs last among the view-local steps so a snapped edge never
    /// lands outside a fractional view.
    fn place(&self, mapped: Rect, view: &ViewLayout) -> Option<Rect> {
        let mut rect = mapped;
        if self.snap_to_pixels {
            rect = rect.snap_outward();
        }
        if self.clip_to_view {
            rect = rect.intersect(&view.local_bounds())?;
        }
        if self.origin == OverlayOrigin::Parent {
            rect = rect.translate(view.x, view.y);
        }
        Some(rect)
    }
}

/// Overlay controller error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverlayError {
    /// The device lookup reported no camera.
    NoDevice,
    /// A frame, layout or box could not be mapped. State was left unchanged.
    Geometry(GeometryError),
}

impl From<GeometryError> for OverlayError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice => f.write_str("no camera device found"),
            Self::Geometry(e) => write!(f, "overlay mapping failed: {e}"),
        }
    }
}

impl core::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::NoDevice => None,
            Self::Geometry(e) => Some(e),
        }
    }
}

/// What the renderer should draw.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Overlay<'a> {
    /// Error indicator only.
    NoDevice,
    /// Overlay rectangles in the configured origin. May be empty.
    Boxes(&'a [Rect]),
}

/// Latest detection batch and layout, and the overlay boxes derived from them.
#[derive(Clone, Debug, Default)]
pub struct OverlayController {
    options: OverlayOptions,
    phase: Phase,
    frame: FrameDimensions,
    view: ViewLayout,
    raw: Vec<Rect>,
    boxes: Vec<Rect>,
}

impl OverlayController {
    /// Controller with default options, awaiting the device lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller with custom options.
    pub fn with_options(options: OverlayOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Frame dimensions of the stored batch, or the placeholder.
    pub fn frame(&self) -> FrameDimensions {
        self.frame
    }

    pub fn view(&self) -> ViewLayout {
        self.view
    }

    /// Sensor-space boxes of the stored batch.
    pub fn raw_boxes(&self) -> &[Rect] {
        &self.raw
    }

    /// Record the device lookup for this update cycle.
    ///
    /// Losing the device drops the stored batch; the layout is kept since it
    /// belongs to the host surface.
    pub fn on_device(&mut self, status: DeviceStatus) {
        let next = match status {
            DeviceStatus::Available => Phase::Ready,
            DeviceStatus::Missing => Phase::NoDevice,
        };
        if next == self.phase {
            return;
        }
        log::debug!("overlay phase {:?} -> {:?}", self.phase, next);
        if next == Phase::NoDevice {
            self.frame = FrameDimensions::PLACEHOLDER;
            self.raw.clear();
            self.boxes.clear();
        }
        self.phase = next;
    }

    /// Replace the stored batch and re-derive the overlay.
    ///
    /// `boxes` must all be expressed against `frame`. On error the previous
    /// batch and overlay stay in place.
    pub fn on_detection(
        &mut self,
        boxes: &[Rect],
        frame: FrameDimensions,
    ) -> Result<(), OverlayError> {
        self.refuse_without_device()?;
        let derived = self.derive(boxes, frame, &self.view).inspect_err(|e| {
            log::debug!("rejected detection batch ({frame:?}): {e}");
        })?;
        log::debug!(
            "detection batch: {} boxes in {}x{} frame, {} drawn",
            boxes.len(),
            frame.width,
            frame.height,
            derived.len()
        );
        self.frame = frame;
        self.raw.clear();
        self.raw.extend_from_slice(boxes);
        self.boxes = derived;
        Ok(())
    }

    /// Detector entry point: filter by symbology, then [`on_detection`](Self::on_detection).
    ///
    /// Decoded values are not inspected.
    pub fn on_codes(
        &mut self,
        codes: &[DetectedCode],
        frame: FrameDimensions,
    ) -> Result<(), OverlayError> {
        self.refuse_without_device()?;
        let frames: Vec<Rect> = codes
            .iter()
            .filter(|code| self.options.accepts(code.symbology))
            .map(|code| code.frame)
            .collect();
        log::trace!("{} of {} codes pass symbology filter", frames.len(), codes.len());
        self.on_detection(&frames, frame)
    }

    /// Replace the stored layout and re-map the stored batch against it.
    pub fn on_layout(&mut self, view: ViewLayout) -> Result<(), OverlayError> {
        self.refuse_without_device()?;
        let derived = self.derive(&self.raw, self.frame, &view).inspect_err(|e| {
            log::debug!("rejected layout {view:?}: {e}");
        })?;
        log::debug!("layout {}x{} at ({}, {})", view.width, view.height, view.x, view.y);
        self.view = view;
        self.boxes = derived;
        Ok(())
    }

    /// Latest overlay boxes. Empty before the first detection.
    pub fn current_overlay_boxes(&self) -> Result<&[Rect], OverlayError> {
        match self.phase {
            Phase::NoDevice => Err(OverlayError::NoDevice),
            Phase::AwaitingDevice | Phase::Ready => Ok(&self.boxes),
        }
    }

    /// What the renderer should draw this cycle.
    pub fn overlay(&self) -> Overlay<'_> {
        match self.current_overlay_boxes() {
            Ok(boxes) => Overlay::Boxes(boxes),
            Err(_) => Overlay::NoDevice,
        }
    }

    fn refuse_without_device(&self) -> Result<(), OverlayError> {
        if self.phase == Phase::NoDevice {
            return Err(OverlayError::NoDevice);
        }
        Ok(())
    }

    /// Map a whole batch. All-or-nothing: the first bad box fails the batch.
    fn derive(
        &self,
        raw: &[Rect],
        frame: FrameDimensions,
        view: &ViewLayout,
    ) -> Result<Vec<Rect>, GeometryError> {
        let transform = SensorToView::new(frame, *view)?;
        let mut out = Vec::with_capacity(raw.len());
        for &rect in raw {
            let mapped = transform.map(rect)?;
            if let Some(placed) = self.options.place(mapped, view) {
                // Parent offsets and snapping can still overflow.
                if !placed.is_valid() {
                    return Err(GeometryError::InvalidRect);
                }
                out.push(placed);
            }
        }
        Ok(out)
    }
}

/// [`OverlayController`] behind a mutex, for hosts that deliver detector
/// and layout callbacks on different threads.
///
/// Each call holds the lock for its whole read-modify-publish step.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct SharedOverlay {
    inner: std::sync::Mutex<OverlayController>,
}

#[cfg(feature = "std")]
impl SharedOverlay {
    pub fn new(controller: OverlayController) -> Self {
        Self {
            inner: std::sync::Mutex::new(controller),
        }
    }

    // Updates commit only after a batch fully maps, so a poisoned
    // controller is still consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, OverlayController> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn on_device(&self, status: DeviceStatus) {
        self.lock().on_device(status);
    }

    pub fn on_detection(&self, boxes: &[Rect], frame: FrameDimensions) -> Result<(), OverlayError> {
        self.lock().on_detection(boxes, frame)
    }

    pub fn on_codes(
        &self,
        codes: &[DetectedCode],
        frame: FrameDimensions,
    ) -> Result<(), OverlayError> {
        self.lock().on_codes(codes, frame)
    }

    pub fn on_layout(&self, view: ViewLayout) -> Result<(), OverlayError> {
        self.lock().on_layout(view)
    }

    /// Snapshot of the latest overlay boxes.
    pub fn current_overlay_boxes(&self) -> Result<Vec<Rect>, OverlayError> {
        self.lock().current_overlay_boxes().map(<[Rect]>::to_vec)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    /// Run `f` against the controller while holding the lock.
    pub fn with<R>(&self, f: impl FnOnce(&OverlayController) -> R) -> R {
        f(&self.lock())
    }

    pub fn into_inner(self) -> OverlayController {
        self.inner
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENSOR: FrameDimensions = FrameDimensions::new(640.0, 480.0);
    const PORTRAIT: ViewLayout = ViewLayout::new(0.0, 0.0, 480.0, 640.0);

    fn ready() -> OverlayController {
        let mut c = OverlayController::new();
        c.on_device(DeviceStatus::Available);
        c
    }

    #[test]
    fn starts_empty_and_awaiting() {
        let c = OverlayController::new();
        assert_eq!(c.phase(), Phase::AwaitingDevice);
        assert_eq!(c.frame(), FrameDimensions::PLACEHOLDER);
        assert_eq!(c.view(), ViewLayout::UNMEASURED);
        assert_eq!(c.current_overlay_boxes(), Ok(&[][..]));
        assert_eq!(c.overlay(), Overlay::Boxes(&[]));
    }

    #[test]
    fn detection_maps_with_current_layout() {
        let mut c = ready();
        c.on_layout(PORTRAIT).unwrap();
        c.on_detection(&[Rect::new(100.0, 50.0, 20.0, 30.0)], SENSOR)
            .unwrap();
        assert_eq!(
            c.current_overlay_boxes().unwrap(),
            &[Rect::new(400.0, 100.0, 30.0, 20.0)]
        );
        assert_eq!(c.raw_boxes(), &[Rect::new(100.0, 50.0, 20.0, 30.0)]);
        assert_eq!(c.frame(), SENSOR);
    }

    #[test]
    fn detection_before_layout_is_zero_size() {
        let mut c = ready();
        c.on_detection(&[Rect::new(100.0, 50.0, 20.0, 30.0)], SENSOR)
            .unwrap();
        let boxes = c.current_overlay_boxes().unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!((boxes[0].width, boxes[0].height), (0.0, 0.0));
    }

    #[test]
    fn invalid_frame_leaves_state() {
        let mut c = ready();
        c.on_layout(PORTRAIT).unwrap();
        c.on_detection(&[Rect::new(0.0, 0.0, 10.0, 10.0)], SENSOR)
            .unwrap();
        let before = c.current_overlay_boxes().unwrap().to_vec();

        let err = c
            .on_detection(&[Rect::new(1.0, 1.0, 1.0, 1.0)], FrameDimensions::new(0.0, 480.0))
            .unwrap_err();
        assert_eq!(err, OverlayError::Geometry(GeometryError::InvalidDimensions));
        assert_eq!(c.current_overlay_boxes().unwrap(), &before[..]);
        assert_eq!(c.frame(), SENSOR);
    }

    #[test]
    fn one_bad_box_fails_whole_batch() {
        let mut c = ready();
        c.on_layout(PORTRAIT).unwrap();
        let err = c
            .on_detection(
                &[Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(0.0, 0.0, -5.0, 10.0)],
                SENSOR,
            )
            .unwrap_err();
        assert_eq!(err, OverlayError::Geometry(GeometryError::InvalidRect));
        assert!(c.current_overlay_boxes().unwrap().is_empty());
        assert!(c.raw_boxes().is_empty());
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let mut c = ready();
        c.on_layout(PORTRAIT).unwrap();
        let err = c
            .on_layout(ViewLayout::new(0.0, 0.0, f64::NAN, 10.0))
            .unwrap_err();
        assert_eq!(err, OverlayError::Geometry(GeometryError::InvalidDimensions));
        assert_eq!(c.view(), PORTRAIT);
    }

    #[test]
    fn no_device_short_circuits() {
        let mut c = ready();
        c.on_layout(PORTRAIT).unwrap();
        c.on_detection(&[Rect::new(0.0, 0.0, 10.0, 10.0)], SENSOR)
            .unwrap();

        c.on_device(DeviceStatus::Missing);
        assert_eq!(c.phase(), Phase::NoDevice);
        assert_eq!(c.current_overlay_boxes(), Err(OverlayError::NoDevice));
        assert_eq!(c.overlay(), Overlay::NoDevice);
        // Even invalid input is refused before any geometry check.
        assert_eq!(
            c.on_detection(&[], FrameDimensions::new(0.0, 0.0)),
            Err(OverlayError::NoDevice)
        );
        assert_eq!(c.on_layout(PORTRAIT), Err(OverlayError::NoDevice));
        assert!(c.raw_boxes().is_empty());
        assert_eq!(c.view(), PORTRAIT);
    }

    #[test]
    fn device_can_return() {
        let mut c = OverlayController::new();
        c.on_device(DeviceStatus::Missing);
        assert_eq!(c.phase(), Phase::NoDevice);
        c.on_device(DeviceStatus::Available);
        assert_eq!(c.phase(), Phase::Ready);
        assert_eq!(c.current_overlay_boxes(), Ok(&[][..]));
    }

    #[test]
    fn options_parent_origin_and_snap() {
        let options = OverlayOptions::default()
            .origin(OverlayOrigin::Parent)
            .snap_to_pixels(true);
        let mut c = OverlayController::with_options(options);
        c.on_layout(ViewLayout::new(10.0, 20.0, 360.0, 800.0)).unwrap();
        c.on_detection(&[Rect::new(101.0, 50.0, 20.0, 31.0)], SENSOR)
            .unwrap();
        // Unsnapped view-space box: (299.25, 126.25, 23.25, 25.0)
        assert_eq!(
            c.current_overlay_boxes().unwrap(),
            &[Rect::new(309.0, 146.0, 24.0, 26.0)]
        );
    }

    #[test]
    fn options_clip_to_view() {
        let mut c = OverlayController::with_options(OverlayOptions::default().clip_to_view(true));
        c.on_layout(PORTRAIT).unwrap();
        c.on_detection(
            &[
                // Straddles the sensor's bottom edge, i.e. the view's left edge.
                Rect::new(100.0, 470.0, 20.0, 30.0),
                // Entirely outside the sensor frame.
                Rect::new(700.0, 0.0, 20.0, 20.0),
                Rect::new(100.0, 50.0, 20.0, 30.0),
            ],
            SENSOR,
        )
        .unwrap();
        assert_eq!(
            c.current_overlay_boxes().unwrap(),
            &[
                Rect::new(0.0, 100.0, 10.0, 20.0),
                Rect::new(400.0, 100.0, 30.0, 20.0)
            ]
        );
        assert_eq!(c.raw_boxes().len(), 3);
    }

    #[test]
    fn snapped_and_clipped_boxes_stay_inside_fractional_view() {
        let options = OverlayOptions::default()
            .snap_to_pixels(true)
            .clip_to_view(true);
        let mut c = OverlayController::with_options(options);
        let view = ViewLayout::new(0.0, 0.0, 359.5, 640.0);
        c.on_layout(view).unwrap();
        // Touches the sensor's top edge, i.e. the view's right edge.
        c.on_detection(&[Rect::new(100.0, 0.0, 20.0, 30.0)], SENSOR)
            .unwrap();
        let boxes = c.current_overlay_boxes().unwrap();
        assert_eq!(boxes, &[Rect::new(337.0, 100.0, 22.5, 20.0)]);
        assert!(boxes[0].right() <= view.width);
    }

    #[test]
    fn overflowing_box_leaves_state() {
        let mut c = ready();
        c.on_layout(ViewLayout::new(0.0, 0.0, 480.0, 1280.0)).unwrap();
        c.on_detection(&[Rect::new(0.0, 0.0, 10.0, 10.0)], SENSOR)
            .unwrap();
        let before = c.current_overlay_boxes().unwrap().to_vec();

        let err = c
            .on_detection(&[Rect::new(1e308, 0.0, 1e308, 10.0)], SENSOR)
            .unwrap_err();
        assert_eq!(err, OverlayError::Geometry(GeometryError::InvalidRect));
        assert_eq!(c.current_overlay_boxes().unwrap(), &before[..]);
        assert!(before.iter().all(Rect::is_valid));
    }

    #[test]
    fn overflowing_parent_offset_is_rejected() {
        let options = OverlayOptions::default().origin(OverlayOrigin::Parent);
        let mut c = OverlayController::with_options(options);
        c.on_layout(ViewLayout::new(0.0, f64::MAX, 480.0, 640.0)).unwrap();
        let err = c
            .on_detection(&[Rect::new(f64::MAX / 2.0, 0.0, 10.0, 10.0)], SENSOR)
            .unwrap_err();
        assert_eq!(err, OverlayError::Geometry(GeometryError::InvalidRect));
        assert!(c.current_overlay_boxes().unwrap().is_empty());
    }

    #[test]
    fn codes_are_filtered_by_symbology() {
        let mut c = OverlayController::with_options(OverlayOptions::qr_and_code128());
        c.on_device(DeviceStatus::Available);
        c.on_layout(PORTRAIT).unwrap();
        let codes = [
            DetectedCode::new(Rect::new(100.0, 50.0, 20.0, 30.0), "https://example.com", Symbology::Qr),
            DetectedCode::new(Rect::new(0.0, 0.0, 40.0, 10.0), "4006381333931", Symbology::Ean13),
            DetectedCode::new(Rect::new(10.0, 10.0, 40.0, 10.0), "TICKET-42", Symbology::Code128),
        ];
        c.on_codes(&codes, SENSOR).unwrap();
        assert_eq!(
            c.current_overlay_boxes().unwrap(),
            &[
                Rect::new(400.0, 100.0, 30.0, 20.0),
                Rect::new(460.0, 10.0, 10.0, 40.0)
            ]
        );
    }

    #[test]
    fn error_source_chain() {
        use core::error::Error;
        let e = OverlayError::from(GeometryError::InvalidRect);
        assert!(e.source().is_some());
        assert!(OverlayError::NoDevice.source().is_none());
        assert_eq!(OverlayError::NoDevice.to_string(), "no camera device found");
    }
}
