//! Conversion options.
//!
//! Options come from code, environment variables or a YAML file. YAML files
//! support `${VAR}` and `${VAR:-default}` substitution:
//!
//! ```yaml
//! processor:
//!   dimensionality:
//!     plane:
//!       axes: [x, y]
//!   interpolation: linear
//!   parallel: true
//! units:
//!   porosity: "1"
//! field_mapping:
//!   temperature: temp
//!   displacement: [ux, uy]
//! params:
//!   E: ${YOUNGS_MODULUS:-5.0e9}
//! spatial_unit: m
//! time_unit: s
//! ```

use std::path::Path;

use indexmap::IndexMap;
use mesh_common::UnitsCatalog;
use mesh_processor::ProcessorConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConversionError, Result};

/// How a source field is named in the structured file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldMapping {
    /// Store the field under a different name.
    Rename(String),
    /// Store each component of a vector field under its own name.
    Split(Vec<String>),
}

impl FieldMapping {
    /// Target names in component order.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Rename(name) => vec![name.as_str()],
            Self::Split(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Default source-to-target field names.
pub fn default_field_mapping() -> IndexMap<String, FieldMapping> {
    [
        ("temperature", FieldMapping::Rename("temp".to_string())),
        ("pressure", FieldMapping::Rename("press".to_string())),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Everything a conversion needs besides the mesh, the fields and the points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Neighbour search and interpolation settings.
    pub processor: ProcessorConfig,

    /// Unit entries added to (or replacing) the built-in catalog.
    pub units: UnitsCatalog,

    /// Source field name → target name(s).
    pub field_mapping: IndexMap<String, FieldMapping>,

    /// Supplemental scalar parameters stored with the results.
    pub params: IndexMap<String, f64>,

    /// Unit of the stored point coordinates.
    pub spatial_unit: String,

    /// Unit of the stored output times.
    pub time_unit: String,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            processor: ProcessorConfig::default(),
            units: UnitsCatalog::empty(),
            field_mapping: default_field_mapping(),
            params: IndexMap::new(),
            spatial_unit: "m".to_string(),
            time_unit: "s".to_string(),
        }
    }
}

impl ConversionOptions {
    /// Load options from environment variables.
    pub fn from_env() -> Self {
        let mut options = Self {
            processor: ProcessorConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("MESH2NC_SPATIAL_UNIT") {
            options.spatial_unit = val;
        }

        if let Ok(val) = std::env::var("MESH2NC_TIME_UNIT") {
            options.time_unit = val;
        }

        options
    }

    /// Load and validate options from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content)?;
        let options: Self = serde_yaml::from_str(&expanded)?;
        options.validate()?;

        debug!(
            path = %path.display(),
            mappings = options.field_mapping.len(),
            params = options.params.len(),
            "Loaded conversion options"
        );
        Ok(options)
    }

    /// Built-in units with the configured entries applied on top.
    pub fn units_catalog(&self) -> UnitsCatalog {
        UnitsCatalog::default().merged(&self.units)
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        self.processor
            .validate()
            .map_err(ConversionError::InvalidConfig)?;

        if self.spatial_unit.is_empty() || self.time_unit.is_empty() {
            return Err(ConversionError::InvalidConfig(
                "spatial_unit and time_unit must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for (source, mapping) in &self.field_mapping {
            let targets = mapping.targets();
            if targets.is_empty() || targets.iter().any(|t| t.is_empty()) {
                return Err(ConversionError::InvalidConfig(format!(
                    "field mapping for '{}' has an empty target",
                    source
                )));
            }
            for target in targets {
                if !seen.insert(target) {
                    return Err(ConversionError::InvalidConfig(format!(
                        "target field '{}' is mapped more than once",
                        target
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Expand `${VAR}` and `${VAR:-default}` in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(ConversionError::InvalidConfig(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).map_err(|_| {
            ConversionError::InvalidConfig(format!("environment variable {} not set", expr))
        })
    }
}
