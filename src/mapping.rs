//! Mapping of estimator coordinates to display coordinates.
//!
//! The pose estimator reports landmarks in a normalized unit square whose axes are swapped relative
//! to the display (the capture device delivers frames in sensor orientation). The front camera
//! preview is also shown mirrored. [`CoordinateMapper`] undoes all of that so the overlay lines up
//! with the preview:
//!
//! 1. swap X and Y,
//! 2. scale the unit square into the display layer according to the [`PreviewMapping`],
//! 3. mirror both axes (`x' = width - x`, `y' = height - y`).
//!
//! The mirroring makes this a one-way transform. Mapping an already mapped point again does *not*
//! yield the original point.

use nalgebra::Point2;

use crate::hand::landmark::{HandPose, Landmark, NUM_LANDMARKS};
use crate::resolution::{LayerRect, Resolution, Viewport};

/// A point in display (view) coordinates.
pub type DisplayPoint = Point2<f32>;

/// Describes how the camera preview is laid out inside the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PreviewMapping {
    /// The preview is stretched to exactly cover the display layer.
    #[default]
    Stretch,
    /// The preview is scaled to cover the whole layer while keeping the frame's aspect ratio.
    /// Overflowing parts of the frame are cropped.
    ///
    /// The [`Resolution`] is the frame resolution as shown on screen (after orientation is
    /// applied).
    AspectFill(Resolution),
    /// The preview is scaled to fit inside the layer while keeping the frame's aspect ratio,
    /// leaving bars on two sides.
    AspectFit(Resolution),
}

impl PreviewMapping {
    /// Returns the rectangle of the display layer that the unit square maps to.
    fn content_rect(&self, viewport: Viewport) -> LayerRect {
        let full = LayerRect::new(0.0, 0.0, viewport.width(), viewport.height());
        match self {
            PreviewMapping::Stretch => full,
            PreviewMapping::AspectFill(res) => match res.aspect_ratio() {
                Some(ratio) => viewport.fill_rect(ratio),
                None => full,
            },
            PreviewMapping::AspectFit(res) => match res.aspect_ratio() {
                Some(ratio) => viewport.fit_rect(ratio),
                None => full,
            },
        }
    }
}

/// Maps landmarks of a [`HandPose`] into display coordinates.
///
/// The mapper holds no state besides its configuration; it is recreated (or [`set_viewport`] is
/// called) whenever the display layout changes.
///
/// [`set_viewport`]: CoordinateMapper::set_viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    viewport: Viewport,
    preview: PreviewMapping,
    content: LayerRect,
}

impl CoordinateMapper {
    pub fn new(viewport: Viewport, preview: PreviewMapping) -> Self {
        Self {
            viewport,
            preview,
            content: preview.content_rect(viewport),
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn preview(&self) -> PreviewMapping {
        self.preview
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        *self = Self::new(viewport, self.preview);
    }

    /// Maps a single landmark to display coordinates.
    pub fn map_landmark(&self, landmark: &Landmark) -> DisplayPoint {
        let (u, v) = (landmark.y(), landmark.x());
        let [x, y] = self.content.transform_out(u, v);
        Point2::new(self.viewport.width() - x, self.viewport.height() - y)
    }

    /// Maps all landmarks of `pose`, preserving their order.
    pub fn map_pose(&self, pose: &HandPose) -> [DisplayPoint; NUM_LANDMARKS] {
        pose.landmarks().map(|lm| self.map_landmark(&lm))
    }
}
