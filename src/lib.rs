//! Real-time hand sign recognition.
//!
//! Every camera frame is run through a short pipeline:
//!
//! 1. a [`PoseEstimator`] finds the 21 joints of (at most) one hand, and [`LandmarkExtractor`]
//!    discards anything short of a complete hand,
//! 2. a [`ConfidenceGate`] rejects the hand if any joint is not confidently detected,
//! 3. a [`CoordinateMapper`] maps the joints into display coordinates for the skeleton overlay,
//! 4. a [`GestureClassifier`] maps the joints to a letter,
//! 5. a [`Presenter`] displays the overlay and the letter.
//!
//! [`FrameOrchestrator`] ties these together per frame, and [`CaptureSession`] feeds it frames
//! from a capture layer on a dedicated thread.
//!
//! The pose estimator and classifier are pre-trained models supplied by the user.
//! [`OnnxClassifier`] can run classifiers exported to ONNX.
//!
//! # Coordinates
//!
//! Landmarks are normalized to the unit square of the estimator's input, with X and Y swapped
//! relative to the display. Display coordinates have their origin in the top left corner, with X
//! pointing right and Y pointing down.
//!
//! # Environment Variables
//!
//! See the [`config`] module.
//!
//! [`PoseEstimator`]: estimator::PoseEstimator
//! [`LandmarkExtractor`]: estimator::LandmarkExtractor
//! [`ConfidenceGate`]: hand::gate::ConfidenceGate
//! [`CoordinateMapper`]: mapping::CoordinateMapper
//! [`GestureClassifier`]: classifier::GestureClassifier
//! [`Presenter`]: presenter::Presenter
//! [`FrameOrchestrator`]: orchestrator::FrameOrchestrator
//! [`CaptureSession`]: session::CaptureSession
//! [`OnnxClassifier`]: nn::OnnxClassifier

use log::LevelFilter;

pub mod classifier;
pub mod config;
mod drop;
pub mod estimator;
pub mod hand;
pub mod mapping;
pub mod nn;
pub mod orchestrator;
pub mod presenter;
pub mod resolution;
pub mod session;
pub mod timer;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
