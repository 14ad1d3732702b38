//! Renaming and splitting of extracted fields.

use indexmap::IndexMap;
use mesh_common::FieldValue;
use mesh_processor::PointFieldSeries;
use netcdf_io::SeriesByPoint;

use crate::config::FieldMapping;
use crate::error::{ConversionError, Result};

/// Turn extracted series into per-component scalar series under their
/// target names.
///
/// Unmapped scalar fields keep their name; unmapped vector fields become
/// `{name}_{i}`. A renamed field must be scalar and a split field must have
/// exactly as many components as target names.
pub fn apply_field_mapping(
    series: PointFieldSeries,
    mapping: &IndexMap<String, FieldMapping>,
) -> Result<SeriesByPoint> {
    series
        .into_iter()
        .map(|(point, by_field)| {
            let mut mapped = IndexMap::new();
            for (field, values) in by_field {
                for (target, column) in split_field(&field, &values, mapping.get(&field))? {
                    if mapped.insert(target.clone(), column).is_some() {
                        return Err(ConversionError::Mapping(format!(
                            "more than one field maps to '{}'",
                            target
                        )));
                    }
                }
            }
            Ok((point, mapped))
        })
        .collect()
}

fn split_field(
    field: &str,
    values: &[FieldValue],
    mapping: Option<&FieldMapping>,
) -> Result<Vec<(String, Vec<f64>)>> {
    let components = values.first().map_or(1, FieldValue::components);
    if values.iter().any(|v| v.components() != components) {
        return Err(ConversionError::Mapping(format!(
            "field '{}' changes component count over time",
            field
        )));
    }

    let targets: Vec<String> = match mapping {
        Some(FieldMapping::Rename(name)) if components == 1 => vec![name.clone()],
        Some(FieldMapping::Split(names)) if names.len() == components => names.clone(),
        Some(other) => {
            return Err(ConversionError::Mapping(format!(
                "field '{}' has {} components, mapping names {}",
                field,
                components,
                other.targets().len()
            )))
        }
        None if components == 1 => vec![field.to_string()],
        None => (0..components).map(|i| format!("{}_{}", field, i)).collect(),
    };

    Ok(targets
        .into_iter()
        .enumerate()
        .map(|(i, target)| {
            let column = values
                .iter()
                .map(|v| v.component(i).unwrap_or(f64::NAN))
                .collect();
            (target, column)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_point(field: &str, values: Vec<FieldValue>) -> PointFieldSeries {
        let mut by_field = IndexMap::new();
        by_field.insert(field.to_string(), values);
        let mut series = PointFieldSeries::new();
        series.insert("pt0".to_string(), by_field);
        series
    }

    #[test]
    fn test_rename_scalar() {
        let mut mapping = IndexMap::new();
        mapping.insert(
            "temperature".to_string(),
            FieldMapping::Rename("temp".to_string()),
        );
        let series = one_point(
            "temperature",
            vec![FieldValue::Scalar(1.0), FieldValue::Scalar(2.0)],
        );

        let mapped = apply_field_mapping(series, &mapping).unwrap();
        assert_eq!(mapped["pt0"]["temp"], vec![1.0, 2.0]);
        assert!(!mapped["pt0"].contains_key("temperature"));
    }

    #[test]
    fn test_split_vector() {
        let mut mapping = IndexMap::new();
        mapping.insert(
            "displacement".to_string(),
            FieldMapping::Split(vec!["ux".to_string(), "uy".to_string()]),
        );
        let series = one_point(
            "displacement",
            vec![
                FieldValue::Vector(vec![0.1, 0.2]),
                FieldValue::Vector(vec![0.3, 0.4]),
            ],
        );

        let mapped = apply_field_mapping(series, &mapping).unwrap();
        assert_eq!(mapped["pt0"].keys().collect::<Vec<_>>(), vec!["ux", "uy"]);
        assert_eq!(mapped["pt0"]["ux"], vec![0.1, 0.3]);
        assert_eq!(mapped["pt0"]["uy"], vec![0.2, 0.4]);
    }

    #[test]
    fn test_unmapped_vector_gets_indexed_names() {
        let series = one_point(
            "flux",
            vec![FieldValue::Vector(vec![1.0, 2.0, 3.0])],
        );

        let mapped = apply_field_mapping(series, &IndexMap::new()).unwrap();
        assert_eq!(
            mapped["pt0"].keys().collect::<Vec<_>>(),
            vec!["flux_0", "flux_1", "flux_2"]
        );
        assert_eq!(mapped["pt0"]["flux_2"], vec![3.0]);
    }

    #[test]
    fn test_component_mismatch_rejected() {
        let mut mapping = IndexMap::new();
        mapping.insert(
            "displacement".to_string(),
            FieldMapping::Rename("u".to_string()),
        );
        let series = one_point("displacement", vec![FieldValue::Vector(vec![0.1, 0.2])]);
        assert!(matches!(
            apply_field_mapping(series, &mapping),
            Err(ConversionError::Mapping(_))
        ));
    }

    #[test]
    fn test_target_collision_rejected() {
        let mut mapping = IndexMap::new();
        mapping.insert("a".to_string(), FieldMapping::Rename("b".to_string()));

        let mut by_field = IndexMap::new();
        by_field.insert("a".to_string(), vec![FieldValue::Scalar(1.0)]);
        by_field.insert("b".to_string(), vec![FieldValue::Scalar(2.0)]);
        let mut series = PointFieldSeries::new();
        series.insert("pt0".to_string(), by_field);

        assert!(apply_field_mapping(series, &mapping).is_err());
    }
}
