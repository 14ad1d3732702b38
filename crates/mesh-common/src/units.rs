//! Physical unit lookup for parameters and response fields.
//!
//! The catalog is an explicit, immutable value passed to whoever needs it.
//! Unknown names are not an error: they resolve to [`UnitLookup::Unmapped`]
//! and are stored with an empty unit string.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Result of looking a name up in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitLookup<'a> {
    /// The name has a known unit.
    Mapped(&'a str),
    /// The name is not in the catalog; callers store an empty unit.
    Unmapped,
}

impl<'a> UnitLookup<'a> {
    /// The unit string, or `""` when unmapped.
    pub fn unit(&self) -> &'a str {
        match *self {
            Self::Mapped(unit) => unit,
            Self::Unmapped => "",
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }
}

/// Mapping of parameter / field name to unit string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitsCatalog {
    units: IndexMap<String, String>,
}

impl Default for UnitsCatalog {
    fn default() -> Self {
        Self::from_pairs([
            // Material and model parameters
            ("E", "Pa"),
            ("nu", "1"),
            ("a_s", "$K^{-1}$"),
            ("a_w", "$K^{-1}$"),
            ("Q", "W"),
            ("n", "1"),
            ("rho_w", "$kg m^{-3}$"),
            ("rho_s", "$kg m^{-3}$"),
            ("K_w", "$W m^{-1} K^{-1}$"),
            ("K_s", "$W m^{-1} K^{-1}$"),
            ("mu", "Pa s"),
            ("c_w", "$J kg^{-1} K^{-1}$"),
            ("c_s", "$J kg^{-1} K^{-1}$"),
            ("T0", "K"),
            ("k", "$m^2$"),
            ("dummy", "1"),
            // Response fields
            ("temp", "K"),
            ("press", "Pa"),
            ("ux", "m"),
            ("uy", "m"),
            ("sigmaxx", "Pa"),
            ("sigmayy", "Pa"),
        ])
    }
}

impl UnitsCatalog {
    /// A catalog with no entries; every lookup is unmapped.
    pub fn empty() -> Self {
        Self {
            units: IndexMap::new(),
        }
    }

    /// Build a catalog from `(name, unit)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            units: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Return a copy with one entry added or replaced.
    pub fn with_unit(mut self, name: impl Into<String>, unit: impl Into<String>) -> Self {
        self.units.insert(name.into(), unit.into());
        self
    }

    /// Return a copy with all entries of `overrides` added or replaced.
    pub fn merged(&self, overrides: &UnitsCatalog) -> Self {
        let mut units = self.units.clone();
        units.extend(overrides.units.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { units }
    }

    /// Look up the unit for `name`.
    pub fn lookup(&self, name: &str) -> UnitLookup<'_> {
        match self.units.get(name) {
            Some(unit) => UnitLookup::Mapped(unit.as_str()),
            None => UnitLookup::Unmapped,
        }
    }

    /// Unit for `name`, falling back to an empty string with a warning.
    pub fn unit_or_empty(&self, name: &str) -> &str {
        let lookup = self.lookup(name);
        if !lookup.is_mapped() {
            warn!(name = %name, "No unit mapped, storing empty unit string");
        }
        lookup.unit()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = UnitsCatalog::default();
        assert_eq!(catalog.lookup("E"), UnitLookup::Mapped("Pa"));
        assert_eq!(catalog.lookup("temp"), UnitLookup::Mapped("K"));
        assert_eq!(catalog.lookup("k"), UnitLookup::Mapped("$m^2$"));
        assert_eq!(catalog.len(), 22);
    }

    #[test]
    fn test_unknown_name_falls_back_to_empty() {
        let catalog = UnitsCatalog::default();
        assert_eq!(catalog.lookup("porosity"), UnitLookup::Unmapped);
        assert_eq!(catalog.unit_or_empty("porosity"), "");
    }

    #[test]
    fn test_merged_overrides() {
        let overrides = UnitsCatalog::empty()
            .with_unit("temp", "degC")
            .with_unit("saturation", "1");
        let catalog = UnitsCatalog::default().merged(&overrides);
        assert_eq!(catalog.unit_or_empty("temp"), "degC");
        assert_eq!(catalog.unit_or_empty("saturation"), "1");
        assert_eq!(catalog.unit_or_empty("E"), "Pa");
    }
}
