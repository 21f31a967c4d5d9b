//! Model parameter definitions and the configuration provider seam.
//!
//! A [`ModelParameter`] is one selectable variant (an encoding, a bucketing
//! strategy, a learner or a prediction type) tagged with its type and carrying
//! key/value [`Property`] entries. Definitions come from a JSON file; previously
//! optimized hyperparameters come from a directory of per-log JSON files.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Type tag for sequence encodings.
pub const TYPE_ENCODING: &str = "encoding";

/// Type tag for bucketing strategies.
pub const TYPE_BUCKETING: &str = "bucketing";

/// Type tag for learners.
pub const TYPE_LEARNER: &str = "learner";

/// Type tag for prediction types (the outcome to predict).
pub const TYPE_PREDICTION: &str = "predictiontype";

/// Bucketing identifier that yields one result set per prefix length.
///
/// The misspelling is what the training scripts persist.
pub const BUCKETING_PREFIX: &str = "prefix_lenght_based";

/// Corrected spelling, accepted as an alias of [`BUCKETING_PREFIX`].
pub const BUCKETING_PREFIX_ALIAS: &str = "prefix_length_based";

/// Prediction type parameter for remaining-time regression.
pub const OUTCOME_REMTIME: &str = "remtime";

/// Returns `true` if `bucketing_id` names the prefix-length bucketing.
pub fn is_prefix_bucketing(bucketing_id: &str) -> bool {
    bucketing_id == BUCKETING_PREFIX || bucketing_id == BUCKETING_PREFIX_ALIAS
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A tunable property of a model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    /// Control type used to edit the value (e.g. `"int"`, `"float"`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Current (or default) value.
    #[serde(default)]
    pub property: String,
    #[serde(default = "unbounded")]
    pub min_value: f64,
    #[serde(default = "unbounded")]
    pub max_value: f64,
}

fn unbounded() -> f64 {
    -1.0
}

impl Property {
    /// A property with a value and no bounds.
    pub fn with_value(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: String::new(),
            property: value.into(),
            min_value: unbounded(),
            max_value: unbounded(),
        }
    }
}

/// One selectable model-parameter variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameter {
    /// Identifier (also the name the training scripts understand).
    pub id: String,
    /// Short name used in optimized-hyperparameter files.
    #[serde(default)]
    pub parameter: String,
    /// Type tag, one of the `TYPE_*` constants.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub properties: Vec<Property>,
}

fn enabled_by_default() -> bool {
    true
}

impl ModelParameter {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            parameter: id.clone(),
            id,
            kind: kind.into(),
            enabled: true,
            properties: Vec::new(),
        }
    }

    /// Properties as a `{id: value}` JSON object.
    pub fn property_map(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|p| (p.id.clone(), serde_json::Value::String(p.property.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// A user's parameter selection, grouped by type.
///
/// Job generation takes the cross product of the encodings, bucketings and
/// learners for the first selected prediction type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSelection {
    #[serde(default)]
    pub encoding: Vec<ModelParameter>,
    #[serde(default)]
    pub bucketing: Vec<ModelParameter>,
    #[serde(default)]
    pub learner: Vec<ModelParameter>,
    #[serde(default, rename = "predictiontype")]
    pub prediction_type: Vec<ModelParameter>,
}

impl ParameterSelection {
    /// Group parameters by their type tag. Parameters of unknown type are ignored.
    pub fn from_parameters<I>(parameters: I) -> Self
    where
        I: IntoIterator<Item = ModelParameter>,
    {
        let mut selection = Self::default();
        for param in parameters {
            match param.kind.as_str() {
                TYPE_ENCODING => selection.encoding.push(param),
                TYPE_BUCKETING => selection.bucketing.push(param),
                TYPE_LEARNER => selection.learner.push(param),
                TYPE_PREDICTION => selection.prediction_type.push(param),
                other => tracing::debug!(kind = other, id = %param.id, "Ignoring parameter of unknown type"),
            }
        }
        selection
    }

    /// Ensure every group has at least one entry.
    pub fn validate(&self) -> Result<(), CoreError> {
        let groups = [
            (TYPE_ENCODING, self.encoding.is_empty()),
            (TYPE_BUCKETING, self.bucketing.is_empty()),
            (TYPE_LEARNER, self.learner.is_empty()),
            (TYPE_PREDICTION, self.prediction_type.is_empty()),
        ];
        for (kind, empty) in groups {
            if empty {
                return Err(CoreError::Validation(format!(
                    "At least one {kind} must be selected"
                )));
            }
        }
        Ok(())
    }

    /// Number of jobs this selection expands into.
    pub fn job_count(&self) -> usize {
        self.encoding.len() * self.bucketing.len() * self.learner.len()
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Source of model parameter metadata.
pub trait ModelParamProvider: Send + Sync {
    /// Every defined parameter.
    fn parameters(&self) -> &[ModelParameter];

    /// The parameters making up the basic (default) selection.
    fn basic_parameters(&self) -> Vec<ModelParameter>;

    /// Previously optimized parameters for a log, if any were recorded.
    fn optimized_parameters(&self, log_name: &str) -> Option<Vec<ModelParameter>>;

    /// Every property across all parameters.
    fn all_properties(&self) -> Vec<Property> {
        self.parameters()
            .iter()
            .flat_map(|p| p.properties.iter().cloned())
            .collect()
    }

    /// Parameters for Basic mode: the optimized set when one exists for the
    /// log, otherwise the configured basic set.
    fn gather_basic_parameters(&self, log_name: &str) -> ParameterSelection {
        match self.optimized_parameters(log_name) {
            Some(optimized) => {
                tracing::debug!(log_name, "Found optimized parameters for log");
                ParameterSelection::from_parameters(optimized)
            }
            None => {
                tracing::debug!(log_name, "No optimized parameters for log, using basic set");
                ParameterSelection::from_parameters(self.basic_parameters())
            }
        }
    }
}

/// On-disk shape of the model configuration file.
#[derive(Debug, Deserialize)]
struct ModelConfigFile {
    parameters: Vec<ModelParameter>,
    #[serde(default)]
    basic: Vec<String>,
}

/// File-backed [`ModelParamProvider`].
#[derive(Debug, Clone, Default)]
pub struct ModelConfiguration {
    parameters: Vec<ModelParameter>,
    basic: Vec<String>,
    optimized: HashMap<String, Vec<ModelParameter>>,
}

impl ModelConfiguration {
    /// Build a configuration from in-memory definitions.
    pub fn new(parameters: Vec<ModelParameter>, basic: Vec<String>) -> Self {
        Self {
            parameters,
            basic,
            optimized: HashMap::new(),
        }
    }

    /// Load definitions from `config_path` and optimized hyperparameters from
    /// every `*.json` file in `optimized_dir` (a missing directory is empty).
    pub fn load(config_path: &Path, optimized_dir: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(config_path).map_err(|e| {
            CoreError::Configuration(format!(
                "Could not read model configuration {}: {e}",
                config_path.display()
            ))
        })?;
        let file: ModelConfigFile = serde_json::from_str(&raw).map_err(|e| {
            CoreError::Configuration(format!(
                "Malformed model configuration {}: {e}",
                config_path.display()
            ))
        })?;

        let mut config = Self::new(file.parameters, file.basic);
        for id in &config.basic {
            if !config.parameters.iter().any(|p| &p.id == id) {
                return Err(CoreError::Configuration(format!(
                    "Basic parameter '{id}' is not defined"
                )));
            }
        }

        if optimized_dir.is_dir() {
            for entry in std::fs::read_dir(optimized_dir)? {
                let path = entry?.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let Some(log_name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                match config.read_optimized(&path) {
                    Ok(params) => {
                        config.optimized.insert(log_name.to_string(), params);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping optimized parameter file");
                    }
                }
            }
        }

        tracing::info!(
            parameters = config.parameters.len(),
            optimized_logs = config.optimized.len(),
            "Model configuration loaded",
        );
        Ok(config)
    }

    /// Register optimized parameters for a log.
    pub fn with_optimized(mut self, log_name: impl Into<String>, params: Vec<ModelParameter>) -> Self {
        self.optimized.insert(log_name.into(), params);
        self
    }

    fn read_optimized(&self, path: &Path) -> Result<Vec<ModelParameter>, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&raw)?;
        self.parse_optimized(&json)
    }

    /// Parse one optimized-hyperparameter document.
    ///
    /// Shape: `{outcome: {"<encoding>_<bucketing>": {learner: {prop: value}}}}`.
    /// The learner's properties are replaced by the optimized values, with
    /// each property's control type taken from its definition.
    pub fn parse_optimized(&self, json: &serde_json::Value) -> Result<Vec<ModelParameter>, CoreError> {
        let malformed = |what: &str| CoreError::Validation(format!("Optimized parameters: {what}"));

        let (outcome, second) = first_entry(json).ok_or_else(|| malformed("missing outcome"))?;
        let (enc_bucket, third) =
            first_entry(second).ok_or_else(|| malformed("missing encoding/bucketing"))?;
        let (learner, values) = first_entry(third).ok_or_else(|| malformed("missing learner"))?;
        let values = values
            .as_object()
            .ok_or_else(|| malformed("learner values must be an object"))?;

        let (encoding, bucketing) = self
            .split_encoding_bucketing(enc_bucket)
            .ok_or_else(|| malformed(&format!("unknown encoding/bucketing '{enc_bucket}'")))?;

        let mut learner = self
            .by_parameter(learner, TYPE_LEARNER)
            .ok_or_else(|| malformed(&format!("unknown learner '{learner}'")))?;
        let defined = self.all_properties();
        learner.properties = values
            .iter()
            .map(|(id, value)| {
                let mut prop = Property::with_value(id.clone(), json_scalar(value));
                if let Some(def) = defined.iter().find(|d| &d.id == id) {
                    prop.kind = def.kind.clone();
                }
                prop
            })
            .collect();

        let outcome = self
            .by_parameter(outcome, TYPE_PREDICTION)
            .ok_or_else(|| malformed(&format!("unknown prediction type '{outcome}'")))?;

        Ok(vec![outcome, encoding, bucketing, learner])
    }

    fn by_parameter(&self, name: &str, kind: &str) -> Option<ModelParameter> {
        self.parameters
            .iter()
            .find(|p| p.kind == kind && (p.parameter == name || p.id == name))
            .cloned()
    }

    /// Bucketing names contain underscores, so the split point is found by
    /// matching a known encoding prefix against a known bucketing suffix.
    fn split_encoding_bucketing(&self, joined: &str) -> Option<(ModelParameter, ModelParameter)> {
        joined
            .match_indices('_')
            .map(|(idx, _)| (&joined[..idx], &joined[idx + 1..]))
            .find_map(|(enc, bucket)| {
                Some((
                    self.by_parameter(enc, TYPE_ENCODING)?,
                    self.by_parameter(bucket, TYPE_BUCKETING)?,
                ))
            })
    }
}

fn first_entry(value: &serde_json::Value) -> Option<(&str, &serde_json::Value)> {
    value
        .as_object()?
        .iter()
        .next()
        .map(|(k, v)| (k.as_str(), v))
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ModelParamProvider for ModelConfiguration {
    fn parameters(&self) -> &[ModelParameter] {
        &self.parameters
    }

    fn basic_parameters(&self) -> Vec<ModelParameter> {
        self.basic
            .iter()
            .filter_map(|id| self.parameters.iter().find(|p| &p.id == id).cloned())
            .collect()
    }

    fn optimized_parameters(&self, log_name: &str) -> Option<Vec<ModelParameter>> {
        self.optimized.get(log_name).cloned()
    }
}
