//! Overlay geometry for live code scanner previews.
//!
//! Maps bounding boxes of detected codes from the sensor's scan frame into
//! the coordinate space of the rendered preview, and keeps the derived
//! overlay boxes in sync with detection batches and layout changes.
//!
//! Pure geometry — no pixel operations, `no_std` compatible. The controller
//! needs `alloc`.
//!
//! # Modules
//!
//! - [`geometry`] — Frame/view types, orientation, the sensor-to-view transform
//! - [`overlay`] — Controller state, options, device handling
//! - [`symbology`] — Code types and detector records
//!
//! # Example
//!
//! ```
//! use scanlayout::{DeviceStatus, FrameDimensions, OverlayController, Rect, ViewLayout};
//!
//! let mut overlay = OverlayController::new();
//! overlay.on_device(DeviceStatus::Available);
//! overlay.on_layout(ViewLayout::new(0.0, 0.0, 480.0, 640.0)).unwrap();
//! overlay
//!     .on_detection(&[Rect::new(100.0, 50.0, 20.0, 30.0)], FrameDimensions::new(640.0, 480.0))
//!     .unwrap();
//!
//! assert_eq!(
//!     overlay.current_overlay_boxes().unwrap(),
//!     &[Rect::new(400.0, 100.0, 30.0, 20.0)]
//! );
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod geometry;
#[cfg(feature = "alloc")]
pub mod overlay;
#[cfg(feature = "alloc")]
pub mod symbology;

pub use geometry::{
    FrameDimensions, GeometryError, Orientation, Rect, SensorToView, ViewLayout, map_to_view,
};
#[cfg(feature = "std")]
pub use overlay::SharedOverlay;
#[cfg(feature = "alloc")]
pub use overlay::{
    DeviceStatus, Overlay, OverlayController, OverlayError, OverlayOptions, OverlayOrigin, Phase,
};
#[cfg(feature = "alloc")]
pub use symbology::{DetectedCode, Symbology, UnknownSymbology};
