//! Lifecycle stages for model versions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Lifecycle stage of a model version.
///
/// Transitions are caller-initiated and unvalidated beyond membership
/// in this set; any stage may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stage {
    /// Registered but not promoted anywhere.
    #[default]
    None,
    /// Candidate under evaluation.
    Staging,
    /// Serving live traffic.
    Production,
    /// Retired; deletable.
    Archived,
}

impl Stage {
    /// Staging and Production block model deletion.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Staging | Self::Production)
    }

    /// Canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Staging => "Staging",
            Self::Production => "Production",
            Self::Archived => "Archived",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Staging" => Ok(Self::Staging),
            "Production" => Ok(Self::Production),
            "Archived" => Ok(Self::Archived),
            other => Err(Error::InvalidStage(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_round_trip() {
        for stage in [Stage::None, Stage::Staging, Stage::Production, Stage::Archived] {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_invalid_stage_rejected() {
        let err = "Prod".parse::<Stage>().unwrap_err();
        assert!(matches!(err, Error::InvalidStage(_)));
    }

    #[test]
    fn test_active_stages() {
        assert!(Stage::Staging.is_active());
        assert!(Stage::Production.is_active());
        assert!(!Stage::None.is_active());
        assert!(!Stage::Archived.is_active());
    }
}
