//! Param record - immutable key/value inputs of a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parameter value: text or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric parameter (hyperparameters, sizes)
    Number(f64),
    /// Textual parameter (dataset paths, model family names)
    Text(String),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One logged input parameter of a run.
///
/// Params are append-only: a key, once logged for a run, keeps its value
/// for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRecord {
    run_id: String,
    key: String,
    value: ParamValue,
    logged_at: DateTime<Utc>,
}

impl ParamRecord {
    /// Create a new param record with the current timestamp.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            key: key.into(),
            value: value.into(),
            logged_at: Utc::now(),
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the parameter key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the parameter value.
    #[must_use]
    pub const fn value(&self) -> &ParamValue {
        &self.value
    }

    /// Get the log timestamp.
    #[must_use]
    pub const fn logged_at(&self) -> DateTime<Utc> {
        self.logged_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_record_number() {
        let param = ParamRecord::new("run-1", "alpha", 0.75);
        assert_eq!(param.key(), "alpha");
        assert_eq!(param.value(), &ParamValue::Number(0.75));
    }

    #[test]
    fn test_param_record_text() {
        let param = ParamRecord::new("run-1", "dataset", "winequality-red");
        assert_eq!(param.value(), &ParamValue::Text("winequality-red".to_string()));
    }

    #[test]
    fn test_param_value_untagged_serde() {
        let json = serde_json::to_string(&ParamValue::Number(0.25)).unwrap();
        assert_eq!(json, "0.25");
        let back: ParamValue = serde_json::from_str("\"elasticnet\"").unwrap();
        assert_eq!(back, ParamValue::Text("elasticnet".to_string()));
    }
}
