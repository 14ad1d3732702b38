//! Configuration for the mesh processor.

use mesh_common::{DataType, Dimensionality};
use serde::{Deserialize, Serialize};

use crate::types::InterpolationMethod;

/// Configuration for neighbour search and interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Mesh dimensionality and active axes.
    pub dimensionality: Dimensionality,

    /// Interpolation method for 1D curves and scattered neighbourhoods.
    pub interpolation: InterpolationMethod,

    /// Whether fields are read from mesh points or cell centres.
    pub data_type: DataType,

    /// Neighbourhood size; `None` picks the method's default for the rank.
    pub neighbor_count: Option<usize>,

    /// Interpolate time steps in parallel.
    pub parallel: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            dimensionality: Dimensionality::Volume,
            interpolation: InterpolationMethod::Linear,
            data_type: DataType::Point,
            neighbor_count: None,
            parallel: false,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MESH_DIMENSIONALITY") {
            if let Ok(dim) = Dimensionality::parse(&val) {
                config.dimensionality = dim;
            }
        }

        if let Ok(val) = std::env::var("MESH_INTERPOLATION") {
            config.interpolation = InterpolationMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("MESH_DATA_TYPE") {
            config.data_type = DataType::from_str(&val);
        }

        if let Ok(val) = std::env::var("MESH_NEIGHBOR_COUNT") {
            if let Ok(count) = val.parse() {
                config.neighbor_count = Some(count);
            }
        }

        if let Ok(val) = std::env::var("MESH_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(count) = self.neighbor_count {
            if count == 0 {
                return Err("neighbor_count must be > 0".to_string());
            }

            let rank = self.dimensionality.rank();
            let min = self.interpolation.min_neighbor_count(rank);
            if rank > 1 && count < min {
                return Err(format!(
                    "{} interpolation in {}D needs neighbor_count >= {}, got {}",
                    self.interpolation, rank, min, count
                ));
            }
        }

        Ok(())
    }

    /// Neighbourhood size actually used for the search.
    pub fn effective_neighbor_count(&self) -> usize {
        self.neighbor_count.unwrap_or_else(|| {
            self.interpolation
                .default_neighbor_count(self.dimensionality.rank())
        })
    }

    pub fn with_dimensionality(mut self, dimensionality: Dimensionality) -> Self {
        self.dimensionality = dimensionality;
        self
    }

    pub fn with_interpolation(mut self, interpolation: InterpolationMethod) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_neighbor_count(mut self, count: usize) -> Self {
        self.neighbor_count = Some(count);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.dimensionality, Dimensionality::Volume);
        assert_eq!(config.interpolation, InterpolationMethod::Linear);
        assert_eq!(config.data_type, DataType::Point);
        assert_eq!(config.neighbor_count, None);
        assert!(!config.parallel);
        assert_eq!(config.effective_neighbor_count(), 20);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProcessorConfig::default();
        assert!(config.validate().is_ok());

        config.neighbor_count = Some(0);
        assert!(config.validate().is_err());

        // A tetrahedron needs four points
        config.neighbor_count = Some(3);
        assert!(config.validate().is_err());

        config.interpolation = InterpolationMethod::Nearest;
        assert!(config.validate().is_ok());

        // 1D ignores the neighbourhood entirely
        let config = ProcessorConfig::default()
            .with_dimensionality(Dimensionality::from_rank(1).unwrap())
            .with_neighbor_count(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_neighbor_count() {
        let config = ProcessorConfig::default()
            .with_dimensionality(Dimensionality::from_rank(2).unwrap());
        assert_eq!(config.effective_neighbor_count(), 10);

        let config = config.with_interpolation(InterpolationMethod::Nearest);
        assert_eq!(config.effective_neighbor_count(), 1);

        let config = config.with_neighbor_count(7);
        assert_eq!(config.effective_neighbor_count(), 7);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ProcessorConfig =
            serde_json::from_str(r#"{"interpolation":"nearest","neighbor_count":4}"#).unwrap();
        assert_eq!(config.interpolation, InterpolationMethod::Nearest);
        assert_eq!(config.neighbor_count, Some(4));
        assert_eq!(config.dimensionality, Dimensionality::Volume);
        assert_eq!(config.data_type, DataType::Point);
    }
}
