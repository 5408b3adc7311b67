//! Gesture classification.
//!
//! The classifier is a pre-trained model that maps the 21 joint positions of a hand to a letter.
//! It is abstracted as the [`GestureClassifier`] trait; [`ClassifierAdapter`] packs a
//! [`HandPose`] into the input layout the model expects and deals with failures.

use ndarray::Array3;

use crate::hand::landmark::{HandPose, NUM_LANDMARKS};
use crate::timer::Timer;

/// The classifier input: joint positions as a `1×21×2` tensor of `f32`.
///
/// Joints are stored in canonical order, each as an `(x, y)` pair. Confidence values are not part
/// of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointTensor {
    data: Array3<f32>,
}

impl KeypointTensor {
    /// The shape of the tensor.
    pub const SHAPE: [usize; 3] = [1, NUM_LANDMARKS, 2];

    pub fn from_pose(pose: &HandPose) -> Self {
        let data = Array3::from_shape_fn(Self::SHAPE, |(_, joint, coord)| {
            pose.landmarks()[joint].position()[coord]
        });
        Self { data }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    #[inline]
    pub fn array(&self) -> &Array3<f32> {
        &self.data
    }

    /// Returns the tensor elements in row-major order (`x0, y0, x1, y1, ...`).
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

/// A label predicted by a [`GestureClassifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    label: String,
}

impl Prediction {
    pub fn new<L: Into<String>>(label: L) -> Self {
        Self {
            label: label.into(),
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn into_label(self) -> String {
        self.label
    }
}

/// An external, pre-trained hand gesture classifier.
pub trait GestureClassifier: Send {
    /// Classifies a hand pose, returning its label.
    ///
    /// Implementations should return an error if `input` does not have the expected shape.
    fn classify(&mut self, input: &KeypointTensor) -> anyhow::Result<String>;
}

impl<C: GestureClassifier + ?Sized> GestureClassifier for Box<C> {
    fn classify(&mut self, input: &KeypointTensor) -> anyhow::Result<String> {
        (**self).classify(input)
    }
}

/// Feeds [`HandPose`]s to a [`GestureClassifier`].
pub struct ClassifierAdapter<C> {
    classifier: C,
    t_classify: Timer,
}

impl<C: GestureClassifier> ClassifierAdapter<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            t_classify: Timer::new("classify"),
        }
    }

    /// Returns the profiling timer of the classifier call.
    pub fn timer(&self) -> &Timer {
        &self.t_classify
    }

    /// Classifies `pose`.
    ///
    /// Classifier failures are logged and result in [`None`]. They are never retried.
    pub fn predict(&mut self, pose: &HandPose) -> Option<Prediction> {
        let input = KeypointTensor::from_pose(pose);
        match self.t_classify.time(|| self.classifier.classify(&input)) {
            Ok(label) => Some(Prediction::new(label)),
            Err(e) => {
                log::warn!("classifier failed: {e:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hand::landmark::Landmark;

    use super::*;

    fn pose() -> HandPose {
        HandPose::from_landmarks(
            (0..NUM_LANDMARKS).map(|i| Landmark::new(i as f32, -(i as f32), 0.5 + i as f32)),
        )
        .unwrap()
    }

    #[test]
    fn tensor_layout() {
        let tensor = KeypointTensor::from_pose(&pose());
        assert_eq!(tensor.shape(), &[1, 21, 2]);
        assert_eq!(tensor.array()[[0, 3, 0]], 3.0);
        assert_eq!(tensor.array()[[0, 3, 1]], -3.0);

        let flat = tensor.to_vec();
        assert_eq!(flat.len(), 42);
        assert_eq!(&flat[..4], &[0.0, -0.0, 1.0, -1.0]);
        // Confidences (0.5 + i) never appear in the input.
        assert!(flat.iter().all(|v| v.fract() == 0.0));
    }

    struct Labels(Vec<anyhow::Result<String>>);

    impl GestureClassifier for Labels {
        fn classify(&mut self, input: &KeypointTensor) -> anyhow::Result<String> {
            assert_eq!(input.shape(), KeypointTensor::SHAPE);
            self.0.remove(0)
        }
    }

    #[test]
    fn failure_yields_no_prediction() {
        let mut adapter = ClassifierAdapter::new(Labels(vec![
            Ok("A".into()),
            Err(anyhow::anyhow!("unexpected input shape")),
            Ok("B".into()),
        ]));
        let pose = pose();
        assert_eq!(adapter.predict(&pose), Some(Prediction::new("A")));
        assert_eq!(adapter.predict(&pose), None);
        assert_eq!(adapter.predict(&pose).unwrap().label(), "B");
    }
}
