//! ONNX-backed gesture classifier.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use tract_onnx::pb::ModelProto;
use tract_onnx::prelude::{
    tvec, DatumType, Framework, Graph, InferenceFact, InferenceModelExt, SimplePlan, TValue, Tensor,
    TypedFact, TypedOp,
};
use tract_onnx::tract_hir::infer::GenericFactoid;

use crate::classifier::{GestureClassifier, KeypointTensor};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A [`GestureClassifier`] running a pre-trained ONNX model on the CPU.
///
/// The model must take a single input of 42 `f32` values (either shaped `[1, 21, 2]` or
/// `[1, 42]`). Its first output is either a score per class, in which case the highest-scoring
/// class wins, or a single integer class index.
pub struct OnnxClassifier {
    model: Model,
    input_shape: Vec<usize>,
    labels: Vec<String>,
}

impl OnnxClassifier {
    /// Loads the model from an `.onnx` file and the class labels from a text file containing one
    /// label per line.
    pub fn load<M, L>(model_path: M, labels_path: L) -> anyhow::Result<Self>
    where
        M: AsRef<Path>,
        L: AsRef<Path>,
    {
        Self::load_impl(model_path.as_ref(), labels_path.as_ref())
    }

    fn load_impl(model_path: &Path, labels_path: &Path) -> anyhow::Result<Self> {
        match model_path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => anyhow::bail!(
                "classifier model file must have `.onnx` extension: {}",
                model_path.display()
            ),
        }

        let labels = fs::read_to_string(labels_path)
            .with_context(|| format!("failed to read labels from {}", labels_path.display()))?;
        let model_data = fs::read(model_path)
            .with_context(|| format!("failed to read model from {}", model_path.display()))?;

        Self::from_onnx(&model_data, parse_labels(&labels))
    }

    /// Loads the model from an in-memory ONNX file.
    ///
    /// Symbolic input dimensions (typically a dynamic batch axis) are fixed to 1.
    pub fn from_onnx(raw: &[u8], labels: Vec<String>) -> anyhow::Result<Self> {
        let proto = tract_onnx::onnx().proto_model_for_read(&mut &*raw)?;
        Self::from_proto(&proto, labels)
    }

    fn from_proto(proto: &ModelProto, labels: Vec<String>) -> anyhow::Result<Self> {
        if labels.is_empty() {
            anyhow::bail!("classifier needs at least one label");
        }

        let mut graph = tract_onnx::onnx().model_for_proto_model(proto)?;

        let num_inputs = graph.inputs.len();
        if num_inputs != 1 {
            anyhow::bail!("classifier network has to take exactly 1 input, this one takes {num_inputs}");
        }
        let input_shape = pin_input_shape(graph.input_fact(0)?);
        let elements: usize = input_shape.iter().product();
        let expected: usize = KeypointTensor::SHAPE.iter().product();
        if elements != expected {
            anyhow::bail!(
                "invalid classifier input shape {:?}, expected {} elements",
                input_shape,
                expected,
            );
        }
        graph.set_input_fact(
            0,
            InferenceFact::dt_shape(DatumType::F32, input_shape.iter().copied()),
        )?;

        let model = SimplePlan::new(graph.into_optimized()?)?;

        log::debug!(
            "loaded classifier: input {:?}, {} labels",
            input_shape,
            labels.len()
        );

        Ok(Self {
            model,
            input_shape,
            labels,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl GestureClassifier for OnnxClassifier {
    fn classify(&mut self, input: &KeypointTensor) -> anyhow::Result<String> {
        if input.shape() != KeypointTensor::SHAPE {
            anyhow::bail!("unexpected keypoint tensor shape {:?}", input.shape());
        }

        let tensor = Tensor::from_shape(&self.input_shape, &input.to_vec())?;
        let outputs = self.model.run(tvec![TValue::from_const(Arc::new(tensor))])?;
        let output = outputs
            .first()
            .context("classifier network produced no outputs")?;
        log::trace!("classifier output: {:?}", output);

        let index = if let Ok(scores) = output.to_array_view::<f32>() {
            argmax(scores.iter().copied()).context("classifier produced an empty score vector")?
        } else {
            let class = output.to_array_view::<i64>()?;
            let class = *class
                .iter()
                .next()
                .context("classifier produced an empty class tensor")?;
            usize::try_from(class).with_context(|| format!("invalid class index {class}"))?
        };

        match self.labels.get(index) {
            Some(label) => Ok(label.clone()),
            None => anyhow::bail!(
                "class index {} out of range ({} labels)",
                index,
                self.labels.len()
            ),
        }
    }
}

/// Paths of an [`OnnxClassifier`]'s model and label files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub model: PathBuf,
    pub labels: PathBuf,
}

impl ModelPaths {
    pub fn load(&self) -> anyhow::Result<OnnxClassifier> {
        OnnxClassifier::load(&self.model, &self.labels)
    }
}

/// Returns the input shape the classifier is run with.
///
/// Dimensions the model leaves unspecified are set to 1. If not even the rank is known, the
/// keypoint tensor's own shape is used.
fn pin_input_shape(fact: &InferenceFact) -> Vec<usize> {
    if let GenericFactoid::Any = fact.shape.rank() {
        return KeypointTensor::SHAPE.to_vec();
    }

    fact.shape
        .dims()
        .map(|dim| match dim {
            GenericFactoid::Only(dim) => dim
                .as_i64()
                .and_then(|dim| usize::try_from(dim).ok())
                .unwrap_or(1),
            GenericFactoid::Any => 1,
        })
        .collect()
}

/// Parses a label file: one label per line, blank lines and surrounding whitespace ignored.
fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Returns the index of the largest value. NaN scores never win.
fn argmax<I: IntoIterator<Item = f32>>(scores: I) -> Option<usize> {
    scores
        .into_iter()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (i, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use tract_onnx::pb::{
        attribute_proto::AttributeType,
        tensor_proto::DataType,
        tensor_shape_proto::{dimension, Dimension},
        type_proto, AttributeProto, GraphProto, NodeProto, OperatorSetIdProto, TensorProto,
        TensorShapeProto, TypeProto, ValueInfoProto,
    };

    use crate::classifier::ClassifierAdapter;
    use crate::hand::landmark::{HandPose, Landmark, NUM_LANDMARKS};

    use super::*;

    fn dim(value: dimension::Value) -> Dimension {
        Dimension {
            value: Some(value),
            ..Default::default()
        }
    }

    /// A `[batch, features] x [features, 3]` linear layer where every feature only adds to the
    /// score of class 1. With `argmax`, the network outputs the class index instead of the scores.
    fn linear_model(batch: dimension::Value, features: i64, argmax: bool) -> ModelProto {
        let input = ValueInfoProto {
            name: "keypoints".into(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: DataType::Float as i32,
                    shape: Some(TensorShapeProto {
                        dim: vec![dim(batch), dim(dimension::Value::DimValue(features))],
                    }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        };
        let weights = TensorProto {
            name: "weights".into(),
            dims: vec![features, 3],
            data_type: DataType::Float as i32,
            float_data: (0..features).flat_map(|_| [0.0, 1.0, 0.0]).collect(),
            ..Default::default()
        };

        let mut node = vec![NodeProto {
            input: vec!["keypoints".into(), "weights".into()],
            output: vec!["scores".into()],
            op_type: "MatMul".into(),
            ..Default::default()
        }];
        let mut output = "scores";
        if argmax {
            node.push(NodeProto {
                input: vec!["scores".into()],
                output: vec!["class".into()],
                op_type: "ArgMax".into(),
                attribute: vec![AttributeProto {
                    name: "axis".into(),
                    r#type: AttributeType::Int as i32,
                    i: 1,
                    ..Default::default()
                }],
                ..Default::default()
            });
            output = "class";
        }

        ModelProto {
            ir_version: 8,
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: 13,
            }],
            graph: Some(GraphProto {
                name: "linear".into(),
                node,
                initializer: vec![weights],
                input: vec![input],
                output: vec![ValueInfoProto {
                    name: output.into(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn labels(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn keypoints() -> KeypointTensor {
        KeypointTensor::from_pose(&HandPose::new(
            [Landmark::new(0.5, 0.25, 1.0); NUM_LANDMARKS],
        ))
    }

    #[test]
    fn label_file() {
        assert_eq!(parse_labels("A\nB\r\n\n  C \n"), vec!["A", "B", "C"]);
        assert!(parse_labels("\n \n").is_empty());
    }

    #[test]
    fn argmax_picks_first_maximum() {
        assert_eq!(argmax([0.1f32, 0.7, 0.2]), Some(1));
        assert_eq!(argmax([0.5f32, 0.5]), Some(0));
        assert_eq!(argmax([f32::NAN, -1.0]), Some(1));
        assert_eq!(argmax(Vec::<f32>::new()), None);
    }

    #[test]
    fn rejects_wrong_extension() {
        let err = OnnxClassifier::load("model.mlmodel", "labels.txt")
            .err()
            .unwrap();
        assert!(err.to_string().contains("`.onnx` extension"));
    }

    #[test]
    fn rejects_missing_labels() {
        let err = OnnxClassifier::from_onnx(&[], Vec::new()).err().unwrap();
        assert!(err.to_string().contains("at least one label"));
    }

    #[test]
    fn symbolic_batch_is_fixed_to_one() {
        let model = linear_model(dimension::Value::DimParam("N".into()), 42, false);
        let mut classifier = OnnxClassifier::from_proto(&model, labels(&["A", "B", "C"])).unwrap();
        assert_eq!(classifier.input_shape, [1, 42]);
        assert_eq!(classifier.classify(&keypoints()).unwrap(), "B");
    }

    #[test]
    fn concrete_batch() {
        let model = linear_model(dimension::Value::DimValue(1), 42, false);
        let mut classifier = OnnxClassifier::from_proto(&model, labels(&["A", "B", "C"])).unwrap();
        assert_eq!(classifier.classify(&keypoints()).unwrap(), "B");
    }

    #[test]
    fn class_index_output() {
        let model = linear_model(dimension::Value::DimParam("N".into()), 42, true);
        let mut classifier = OnnxClassifier::from_proto(&model, labels(&["A", "B", "C"])).unwrap();
        assert_eq!(classifier.classify(&keypoints()).unwrap(), "B");
    }

    #[test]
    fn rejects_wrong_input_size() {
        let model = linear_model(dimension::Value::DimParam("N".into()), 40, false);
        let err = OnnxClassifier::from_proto(&model, labels(&["A", "B", "C"]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("expected 42 elements"), "{err}");
    }

    #[test]
    fn class_out_of_range() {
        let model = linear_model(dimension::Value::DimValue(1), 42, false);
        let mut classifier = OnnxClassifier::from_proto(&model, labels(&["A"])).unwrap();
        let err = classifier.classify(&keypoints()).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        let pose = HandPose::new([Landmark::new(0.5, 0.25, 1.0); NUM_LANDMARKS]);
        assert_eq!(ClassifierAdapter::new(classifier).predict(&pose), None);
    }
}
