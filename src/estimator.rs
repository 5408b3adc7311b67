//! Hand pose estimation interface and landmark extraction.
//!
//! The actual estimator is an external, pre-trained model. It is abstracted as the
//! [`PoseEstimator`] trait, which reports named joints for at most one hand. [`LandmarkExtractor`]
//! turns those into complete [`HandPose`]s or nothing.

use std::sync::Arc;

use image::RgbImage;

use crate::hand::landmark::{HandPose, JointName, Landmark, CANONICAL_ORDER, NUM_LANDMARKS};
use crate::timer::Timer;

/// A single video frame delivered by the capture layer.
///
/// This is a cheaply [`Clone`]able handle to the pixel data.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    seq: u64,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self::with_seq(image, 0)
    }

    /// Creates a frame carrying a capture sequence number, used for logging.
    pub fn with_seq(image: RgbImage, seq: u64) -> Self {
        Self {
            image: Arc::new(image),
            seq,
        }
    }

    #[inline]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Parameters passed to a [`PoseEstimator`] with every request.
///
/// Frames are always passed upright, and at most one hand is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorOptions {
    max_hands: usize,
}

impl EstimatorOptions {
    /// The options every [`LandmarkExtractor`] requests.
    pub const SINGLE_HAND: Self = Self { max_hands: 1 };

    /// Maximum number of hands to report.
    #[inline]
    pub fn max_hands(&self) -> usize {
        self.max_hands
    }
}

/// The joints an estimator resolved for one hand.
///
/// Estimators may report any subset of the 21 joints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    joints: [Option<Landmark>; NUM_LANDMARKS],
}

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an observation where every joint is resolved, taking landmarks in canonical order.
    pub fn complete(landmarks: [Landmark; NUM_LANDMARKS]) -> Self {
        Self {
            joints: landmarks.map(Some),
        }
    }

    pub fn set(&mut self, joint: JointName, landmark: Landmark) {
        self.joints[joint.index()] = Some(landmark);
    }

    pub fn remove(&mut self, joint: JointName) -> Option<Landmark> {
        self.joints[joint.index()].take()
    }

    pub fn get(&self, joint: JointName) -> Option<Landmark> {
        self.joints[joint.index()]
    }

    /// Returns the number of resolved joints.
    pub fn len(&self) -> usize {
        self.joints.iter().filter(|j| j.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(JointName, Landmark)> for Observation {
    fn from_iter<T: IntoIterator<Item = (JointName, Landmark)>>(iter: T) -> Self {
        let mut obs = Observation::new();
        for (joint, landmark) in iter {
            obs.set(joint, landmark);
        }
        obs
    }
}

/// An external hand pose estimation model.
pub trait PoseEstimator: Send {
    /// Estimates the joints of (at most) one hand in `frame`.
    ///
    /// Returns `Ok(None)` when no hand is visible. An `Err` indicates that the estimator itself
    /// failed (for example on malformed input), which is treated as fatal by the capture session.
    fn estimate(
        &mut self,
        frame: &Frame,
        options: &EstimatorOptions,
    ) -> anyhow::Result<Option<Observation>>;
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn estimate(
        &mut self,
        frame: &Frame,
        options: &EstimatorOptions,
    ) -> anyhow::Result<Option<Observation>> {
        (**self).estimate(frame, options)
    }
}

/// The outcome of landmark extraction on a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// All 21 joints were resolved.
    Pose(HandPose),
    /// The estimator found no hand.
    NoHand,
    /// A hand was found, but `missing` (and maybe others) could not be resolved.
    Incomplete { missing: JointName },
}

impl Extraction {
    pub fn into_pose(self) -> Option<HandPose> {
        match self {
            Extraction::Pose(pose) => Some(pose),
            Extraction::NoHand | Extraction::Incomplete { .. } => None,
        }
    }
}

/// Gathers complete [`HandPose`]s from a [`PoseEstimator`].
///
/// Partial hands are treated the same as no hand at all.
pub struct LandmarkExtractor<E> {
    estimator: E,
    t_estimate: Timer,
}

impl<E: PoseEstimator> LandmarkExtractor<E> {
    pub fn new(estimator: E) -> Self {
        Self {
            estimator,
            t_estimate: Timer::new("estimate"),
        }
    }

    /// Returns the profiling timer of the estimator call.
    pub fn timer(&self) -> &Timer {
        &self.t_estimate
    }

    /// Runs the estimator on `frame` and gathers the joints in canonical order.
    pub fn extract(&mut self, frame: &Frame) -> anyhow::Result<Extraction> {
        let observation = self
            .t_estimate
            .time(|| self.estimator.estimate(frame, &EstimatorOptions::SINGLE_HAND))?;
        let Some(observation) = observation else {
            return Ok(Extraction::NoHand);
        };

        Ok(gather(&observation))
    }
}

fn gather(observation: &Observation) -> Extraction {
    let mut landmarks = Vec::with_capacity(NUM_LANDMARKS);
    for joint in CANONICAL_ORDER {
        match observation.get(joint) {
            Some(lm) => landmarks.push(lm),
            None => {
                log::trace!(
                    "extractor: {}/{} joints resolved, {} missing",
                    observation.len(),
                    NUM_LANDMARKS,
                    joint,
                );
                return Extraction::Incomplete { missing: joint };
            }
        }
    }

    match HandPose::from_landmarks(landmarks) {
        Some(pose) => Extraction::Pose(pose),
        None => unreachable!("gathered exactly one landmark per canonical joint"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<Observation>);

    impl PoseEstimator for Fixed {
        fn estimate(
            &mut self,
            _: &Frame,
            options: &EstimatorOptions,
        ) -> anyhow::Result<Option<Observation>> {
            assert_eq!(*options, EstimatorOptions::SINGLE_HAND);
            assert_eq!(options.max_hands(), 1);
            Ok(self.0.clone())
        }
    }

    fn frame() -> Frame {
        Frame::new(RgbImage::new(4, 4))
    }

    fn full_observation() -> Observation {
        CANONICAL_ORDER
            .iter()
            .enumerate()
            .map(|(i, &joint)| (joint, Landmark::new(i as f32 / 20.0, 0.5, 0.9)))
            .collect()
    }

    #[test]
    fn no_hand() {
        let mut extractor = LandmarkExtractor::new(Fixed(None));
        assert_eq!(extractor.extract(&frame()).unwrap(), Extraction::NoHand);
    }

    #[test]
    fn complete_hand_in_canonical_order() {
        let mut extractor = LandmarkExtractor::new(Fixed(Some(full_observation())));
        let pose = extractor.extract(&frame()).unwrap().into_pose().unwrap();
        for (i, lm) in pose.iter().enumerate() {
            assert_eq!(lm.x(), i as f32 / 20.0);
        }
        assert_eq!(pose.wrist().x(), 1.0);
    }

    #[test]
    fn missing_joint_yields_nothing() {
        for joint in CANONICAL_ORDER {
            let mut obs = full_observation();
            obs.remove(joint);
            assert_eq!(obs.len(), 20);

            let mut extractor = LandmarkExtractor::new(Fixed(Some(obs)));
            assert_eq!(
                extractor.extract(&frame()).unwrap(),
                Extraction::Incomplete { missing: joint }
            );
        }
    }

    #[test]
    fn empty_observation_is_incomplete() {
        let mut extractor = LandmarkExtractor::new(Fixed(Some(Observation::new())));
        let extraction = extractor.extract(&frame()).unwrap();
        assert!(extraction.into_pose().is_none());
    }

    #[test]
    fn estimator_error_propagates() {
        struct Failing;
        impl PoseEstimator for Failing {
            fn estimate(
                &mut self,
                _: &Frame,
                _: &EstimatorOptions,
            ) -> anyhow::Result<Option<Observation>> {
                anyhow::bail!("malformed pixel buffer")
            }
        }

        let mut extractor = LandmarkExtractor::new(Failing);
        let err = extractor.extract(&frame()).unwrap_err();
        assert_eq!(err.to_string(), "malformed pixel buffer");
    }
}
