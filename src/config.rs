//! Pipeline configuration.
//!
//! Defaults can be overridden through environment variables:
//!
//! * `HANDSIGN_CONFIDENCE_THRESHOLD`: minimum per-joint confidence (0.0 to 1.0) for a hand pose to
//!   be accepted. Defaults to 0.3.
//! * `HANDSIGN_PREVIEW_MAPPING`: how the camera preview is laid out in the display layer. Allowed
//!   values are `stretch` (the default), `aspect-fill` and `aspect-fit`. The latter two also
//!   require `HANDSIGN_FRAME_RESOLUTION`.
//! * `HANDSIGN_FRAME_RESOLUTION`: camera frame resolution as shown on screen, as `WIDTHxHEIGHT`.
//! * `HANDSIGN_CLASSIFIER_MODEL` and `HANDSIGN_CLASSIFIER_LABELS`: paths of the ONNX classifier
//!   model and its label file. Either both or none have to be set.

use std::env::{self, VarError};
use std::path::PathBuf;

use anyhow::Context;

use crate::hand::gate::ConfidenceGate;
use crate::mapping::{CoordinateMapper, PreviewMapping};
use crate::nn::ModelPaths;
use crate::resolution::{Resolution, Viewport};

const THRESHOLD_VAR: &str = "HANDSIGN_CONFIDENCE_THRESHOLD";
const PREVIEW_VAR: &str = "HANDSIGN_PREVIEW_MAPPING";
const RESOLUTION_VAR: &str = "HANDSIGN_FRAME_RESOLUTION";
const MODEL_VAR: &str = "HANDSIGN_CLASSIFIER_MODEL";
const LABELS_VAR: &str = "HANDSIGN_CLASSIFIER_LABELS";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    confidence_threshold: f32,
    pub preview: PreviewMapping,
    pub classifier: Option<ModelPaths>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: ConfidenceGate::DEFAULT_THRESHOLD,
            preview: PreviewMapping::Stretch,
            classifier: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key))
    }

    /// Reads the configuration through `var`, which behaves like [`std::env::var`].
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let lookup = |key: &str| -> anyhow::Result<Option<String>> {
            match var(key) {
                Ok(value) => Ok(Some(value)),
                Err(VarError::NotPresent) => Ok(None),
                Err(VarError::NotUnicode(s)) => {
                    anyhow::bail!("invalid value set for `{key}`: {}", s.to_string_lossy())
                }
            }
        };

        let mut config = Config::default();

        if let Some(value) = lookup(THRESHOLD_VAR)? {
            let threshold: f32 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid value set for `{THRESHOLD_VAR}`: '{value}'"))?;
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("`{THRESHOLD_VAR}` must be in range 0.0 to 1.0, got {threshold}");
            }
            config.confidence_threshold = threshold;
        }

        let resolution = lookup(RESOLUTION_VAR)?
            .map(|value| {
                parse_resolution(&value)
                    .with_context(|| format!("invalid value set for `{RESOLUTION_VAR}`"))
            })
            .transpose()?;
        let require_resolution = || {
            resolution.with_context(|| format!("`{RESOLUTION_VAR}` is required by `{PREVIEW_VAR}`"))
        };
        config.preview = match lookup(PREVIEW_VAR)?.as_deref() {
            None | Some("stretch") => PreviewMapping::Stretch,
            Some("aspect-fill") => PreviewMapping::AspectFill(require_resolution()?),
            Some("aspect-fit") => PreviewMapping::AspectFit(require_resolution()?),
            Some(invalid) => anyhow::bail!("invalid value set for `{PREVIEW_VAR}`: '{invalid}'"),
        };

        config.classifier = match (lookup(MODEL_VAR)?, lookup(LABELS_VAR)?) {
            (Some(model), Some(labels)) => Some(ModelPaths {
                model: PathBuf::from(model),
                labels: PathBuf::from(labels),
            }),
            (None, None) => None,
            (Some(_), None) => anyhow::bail!("`{MODEL_VAR}` is set, but `{LABELS_VAR}` is not"),
            (None, Some(_)) => anyhow::bail!("`{LABELS_VAR}` is set, but `{MODEL_VAR}` is not"),
        };

        log::debug!("configuration: {:?}", config);
        Ok(config)
    }

    /// Minimum per-joint confidence of an accepted hand pose, always in range 0.0 to 1.0.
    #[inline]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn gate(&self) -> ConfidenceGate {
        ConfidenceGate::new(self.confidence_threshold)
    }

    pub fn mapper(&self, viewport: Viewport) -> CoordinateMapper {
        CoordinateMapper::new(viewport, self.preview)
    }
}

fn parse_resolution(value: &str) -> anyhow::Result<Resolution> {
    let (w, h) = value
        .trim()
        .split_once('x')
        .with_context(|| format!("expected `WIDTHxHEIGHT`, got '{value}'"))?;
    let resolution = Resolution::new(w.parse()?, h.parse()?);
    if resolution.aspect_ratio().is_none() {
        anyhow::bail!("resolution {resolution} is empty");
    }
    Ok(resolution)
}
