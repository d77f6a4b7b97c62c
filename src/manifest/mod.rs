//! Packaging manifests: a YAML project file naming an environment spec
//! and command-line entry points with typed, defaultable parameters.
//!
//! ```yaml
//! name: wine-quality
//! environment: env.yaml
//! entry_points:
//!   main:
//!     command: "train --alpha {alpha} --l1-ratio {l1_ratio} {data}"
//!     parameters:
//!       alpha:    { type: float, default: 0.5 }
//!       l1_ratio: { type: float, default: 0.5 }
//!       data:     { type: path }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Declared type of an entry-point parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free-form string.
    String,
    /// Floating point number.
    Float,
    /// Filesystem path.
    Path,
}

/// One typed entry-point parameter, with an optional default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Declared parameter type.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Default value substituted when the caller passes nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,
}

/// A named command template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Command template with `{param}` placeholders.
    pub command: String,
    /// Parameter declarations keyed by name.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamSpec>,
}

/// The project packaging manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Project name.
    pub name: String,
    /// Path of the environment spec file, relative to the manifest.
    pub environment: String,
    /// Entry points keyed by name.
    pub entry_points: BTreeMap<String, EntryPoint>,
}

/// A named dependency list with version pins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Environment name.
    pub name: String,
    /// Dependencies as `name=version` pins.
    pub dependencies: Vec<String>,
}

impl ProjectManifest {
    /// Parse a manifest from YAML text.
    ///
    /// # Errors
    ///
    /// [`Error::Yaml`] on malformed YAML, [`Error::Manifest`] when the
    /// document is structurally invalid (no entry points, placeholder
    /// without a declared parameter).
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] plus everything [`from_yaml_str`](Self::from_yaml_str)
    /// returns.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize back to YAML.
    ///
    /// # Errors
    ///
    /// [`Error::Yaml`] on serialization failure.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Render an entry point's command, substituting `{param}`
    /// placeholders from `overrides` and falling back to declared
    /// defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Manifest`] for an unknown entry point, an undeclared
    /// override, or a parameter with neither override nor default.
    pub fn render_command(
        &self,
        entry_point: &str,
        overrides: &BTreeMap<String, String>,
    ) -> Result<String> {
        let entry = self.entry_points.get(entry_point).ok_or_else(|| {
            Error::Manifest(format!("unknown entry point {entry_point:?}"))
        })?;

        for key in overrides.keys() {
            if !entry.parameters.contains_key(key) {
                return Err(Error::Manifest(format!(
                    "override {key:?} is not a declared parameter of {entry_point:?}"
                )));
            }
        }

        let mut command = entry.command.clone();
        for (name, spec) in &entry.parameters {
            let placeholder = format!("{{{name}}}");
            let value = match overrides.get(name) {
                Some(v) => v.clone(),
                None => spec
                    .default
                    .as_ref()
                    .map(yaml_value_to_string)
                    .ok_or_else(|| {
                        Error::Manifest(format!(
                            "parameter {name:?} of {entry_point:?} has no value and no default"
                        ))
                    })?,
            };
            command = command.replace(&placeholder, &value);
        }
        Ok(command)
    }

    fn validate(&self) -> Result<()> {
        if self.entry_points.is_empty() {
            return Err(Error::Manifest("manifest declares no entry points".to_string()));
        }
        for (name, entry) in &self.entry_points {
            for param in placeholders(&entry.command) {
                if !entry.parameters.contains_key(&param) {
                    return Err(Error::Manifest(format!(
                        "entry point {name:?} references undeclared parameter {param:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl EnvironmentSpec {
    /// Parse an environment spec from YAML text.
    ///
    /// # Errors
    ///
    /// [`Error::Yaml`] on malformed YAML, [`Error::Manifest`] when a
    /// dependency is not a `name=version` pin.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let spec: Self = serde_yaml::from_str(text)?;
        for dep in &spec.dependencies {
            let mut parts = dep.splitn(2, '=');
            let name = parts.next().unwrap_or_default();
            let version = parts.next().unwrap_or_default();
            if name.is_empty() || version.is_empty() {
                return Err(Error::Manifest(format!(
                    "dependency {dep:?} is not a name=version pin"
                )));
            }
        }
        Ok(spec)
    }
}

fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn placeholders(command: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = command;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        found.push(rest[open + 1..open + close].to_string());
        rest = &rest[open + close + 1..];
    }
    found
}
