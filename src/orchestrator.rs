//! Per-frame pipeline state machine.

use std::fmt;

use crate::classifier::{ClassifierAdapter, GestureClassifier};
use crate::estimator::{Extraction, Frame, LandmarkExtractor, PoseEstimator};
use crate::hand::gate::ConfidenceGate;
use crate::hand::landmark::JointName;
use crate::mapping::CoordinateMapper;
use crate::presenter::Presenter;
use crate::resolution::Viewport;
use crate::timer::Timer;

/// Whether the last processed frame contained a confidently detected hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    Tracking,
}

/// Why a frame did not produce a usable hand pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// The estimator did not find a hand.
    NoHand,
    /// The estimator found a hand, but not all joints were resolved.
    Incomplete { missing: JointName },
    /// At least one joint had a confidence below the gate threshold.
    LowConfidence { min_confidence: f32 },
}

/// The result of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// No hand pose was accepted; the presenter was cleared.
    Idle(Rejection),
    /// A hand pose was accepted and rendered. `label` is the prediction, if the classifier
    /// produced one.
    Tracking { label: Option<String> },
}

/// An unrecoverable pipeline error.
///
/// The capture session that fed the frame must stop delivering further frames.
#[derive(Debug)]
pub enum FrameError {
    /// The pose estimator failed (as opposed to simply not finding a hand).
    Detector(anyhow::Error),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Detector(_) => f.write_str("pose estimator failed"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Detector(e) => Some(&**e),
        }
    }
}

/// Coordinates extraction, gating, mapping, classification and presentation of frames.
///
/// Each frame is evaluated on its own. The only state carried between frames is whether the
/// previous frame was [`State::Tracking`], which is exposed for observation but does not influence
/// how the next frame is processed.
pub struct FrameOrchestrator<E, C, P> {
    extractor: LandmarkExtractor<E>,
    gate: ConfidenceGate,
    mapper: CoordinateMapper,
    classifier: ClassifierAdapter<C>,
    presenter: P,
    state: State,
}

impl<E, C, P> FrameOrchestrator<E, C, P>
where
    E: PoseEstimator,
    C: GestureClassifier,
    P: Presenter,
{
    pub fn new(
        estimator: E,
        gate: ConfidenceGate,
        mapper: CoordinateMapper,
        classifier: C,
        presenter: P,
    ) -> Self {
        Self {
            extractor: LandmarkExtractor::new(estimator),
            gate,
            mapper,
            classifier: ClassifierAdapter::new(classifier),
            presenter,
            state: State::Idle,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    #[inline]
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Updates the display viewport after a layout change.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.mapper.set_viewport(viewport);
    }

    /// Returns profiling timers for the estimator and classifier calls.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [self.extractor.timer(), self.classifier.timer()].into_iter()
    }

    /// Processes a single frame.
    ///
    /// On [`FrameError`] the presenter is left untouched and the caller is expected to stop
    /// delivering frames.
    pub fn process(&mut self, frame: &Frame) -> Result<FrameOutcome, FrameError> {
        let extraction = self
            .extractor
            .extract(frame)
            .map_err(FrameError::Detector)?;

        let pose = match extraction {
            Extraction::Pose(pose) => pose,
            Extraction::NoHand => return Ok(self.reject(frame, Rejection::NoHand)),
            Extraction::Incomplete { missing } => {
                return Ok(self.reject(frame, Rejection::Incomplete { missing }));
            }
        };

        let min_confidence = pose.min_confidence();
        let Some(pose) = self.gate.filter(pose) else {
            return Ok(self.reject(frame, Rejection::LowConfidence { min_confidence }));
        };

        let points = self.mapper.map_pose(&pose);
        self.presenter.render(&points);

        let label = self.classifier.predict(&pose).map(|p| p.into_label());
        if let Some(label) = &label {
            self.presenter.set_label(label);
        }

        self.transition(frame, State::Tracking);
        Ok(FrameOutcome::Tracking { label })
    }

    fn reject(&mut self, frame: &Frame, rejection: Rejection) -> FrameOutcome {
        log::trace!("frame {}: {:?}", frame.seq(), rejection);
        self.presenter.clear();
        self.transition(frame, State::Idle);
        FrameOutcome::Idle(rejection)
    }

    fn transition(&mut self, frame: &Frame, state: State) {
        if self.state != state {
            log::debug!("frame {}: {:?} -> {:?}", frame.seq(), self.state, state);
            self.state = state;
        }
    }
}
