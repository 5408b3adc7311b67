//! Confidence gating of hand poses.

use super::landmark::HandPose;

/// Rejects hand poses containing any insufficiently confident landmark.
///
/// A single weak joint invalidates the whole pose; there is no partial output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl ConfidenceGate {
    pub const DEFAULT_THRESHOLD: f32 = 0.3;

    /// Creates a gate with the given threshold.
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is NaN or outside of 0.0 to 1.0.
    pub fn new(threshold: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&threshold),
            "confidence threshold must be in range 0.0 to 1.0, got {threshold}"
        );
        Self { threshold }
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Returns whether `pose` passes the gate.
    ///
    /// Landmarks with a confidence of exactly the threshold are accepted. NaN confidences are
    /// rejected.
    pub fn accepts(&self, pose: &HandPose) -> bool {
        // `!(c >= t)` instead of `c < t` so that NaN fails the gate.
        !pose.iter().any(|lm| !(lm.confidence() >= self.threshold))
    }

    /// Passes `pose` through if it is accepted, otherwise returns [`None`].
    pub fn filter(&self, pose: HandPose) -> Option<HandPose> {
        if self.accepts(&pose) {
            Some(pose)
        } else {
            log::trace!(
                "gate: min confidence {} < {} -> rejected",
                pose.min_confidence(),
                self.threshold,
            );
            None
        }
    }
}
