//! Multi-region warehouse connection catalog.
//!
//! Each deployment region runs its own warehouse environment with a distinct
//! connection id, compute warehouse, and analytics database name. The catalog
//! holds one [`RegionProfile`] per region and hands graph builders the
//! profiles they ask for, in catalog order, so multi-region graphs fan out
//! deterministically.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::VariableStore;

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid var regex"));

/// Connection parameters for one deployment region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionProfile {
    /// Short region name, e.g. `us`.
    pub region: String,
    pub connection_id: String,
    pub warehouse: String,
    /// The region's analytics database; differs per environment.
    pub analytics_database: String,
    /// Extra per-region values passed through to SQL templates.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// An ordered set of region profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCatalog {
    profiles: Vec<RegionProfile>,
}

impl RegionCatalog {
    #[must_use]
    pub fn new(profiles: Vec<RegionProfile>) -> Self {
        Self { profiles }
    }

    /// Parse a catalog from YAML, substituting `${VAR}` placeholders from
    /// the injected variable store first.
    ///
    /// # Errors
    ///
    /// Returns an error listing every unresolvable placeholder, or the YAML
    /// parse failure.
    pub fn from_yaml_str(yaml: &str, vars: &dyn VariableStore) -> Result<Self> {
        let substituted = substitute_vars(yaml, vars)?;
        let profiles: Vec<RegionProfile> =
            serde_yaml::from_str(&substituted).context("failed to parse region catalog YAML")?;
        let catalog = Self { profiles };
        tracing::info!(regions = catalog.profiles.len(), "loaded region catalog");
        Ok(catalog)
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path, vars: &dyn VariableStore) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read region catalog: {}", path.display()))?;
        Self::from_yaml_str(&content, vars)
    }

    #[must_use]
    pub fn profiles(&self) -> &[RegionProfile] {
        &self.profiles
    }

    /// The named profiles, in catalog order regardless of request order.
    ///
    /// # Errors
    ///
    /// Returns an error listing every unknown region name.
    pub fn select(&self, regions: &[&str]) -> Result<Vec<&RegionProfile>> {
        let missing: Vec<&str> = regions
            .iter()
            .filter(|name| !self.profiles.iter().any(|p| p.region == **name))
            .copied()
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("unknown region(s): {}", missing.join(", "));
        }
        Ok(self
            .profiles
            .iter()
            .filter(|p| regions.contains(&p.region.as_str()))
            .collect())
    }
}

/// Substitute `${VAR}` patterns from the variable store.
///
/// # Errors
///
/// Returns an error naming every variable the store could not resolve.
fn substitute_vars(input: &str, vars: &dyn VariableStore) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match vars.get(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("missing variable(s): {}", errors.join(", "));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StaticVariableStore;

    const CATALOG_YAML: &str = r"
- region: us
  connection_id: warehouse_us
  warehouse: ANALYTICS_ETL
  analytics_database: prod_analytics
  params:
    shard_count: '${US_SHARDS}'
- region: eu
  connection_id: warehouse_eu
  warehouse: ANALYTICS_ETL_0
  analytics_database: euprod_analytics
- region: au
  connection_id: warehouse_au
  warehouse: ANALYTICS_ETL_0
  analytics_database: auprod_analytics
";

    fn vars() -> StaticVariableStore {
        StaticVariableStore::new([("US_SHARDS".to_string(), "12".to_string())])
    }

    #[test]
    fn placeholders_resolve_through_the_store() {
        let catalog = RegionCatalog::from_yaml_str(CATALOG_YAML, &vars()).unwrap();
        let us = &catalog.profiles()[0];
        assert_eq!(us.params.get("shard_count").unwrap(), "12");
    }

    #[test]
    fn missing_variables_are_all_reported() {
        let yaml = "
- region: us
  connection_id: '${CONN}'
  warehouse: '${WH}'
  analytics_database: db
";
        let err = RegionCatalog::from_yaml_str(yaml, &StaticVariableStore::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CONN") && msg.contains("WH"), "got: {msg}");
    }

    #[test]
    fn select_preserves_catalog_order() {
        let catalog = RegionCatalog::from_yaml_str(CATALOG_YAML, &vars()).unwrap();
        let picked = catalog.select(&["au", "us"]).unwrap();
        let names: Vec<&str> = picked.iter().map(|p| p.region.as_str()).collect();
        assert_eq!(names, vec!["us", "au"]);
    }

    #[test]
    fn select_reports_every_unknown_region() {
        let catalog = RegionCatalog::from_yaml_str(CATALOG_YAML, &vars()).unwrap();
        let err = catalog.select(&["us", "mars", "moon"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("mars") && msg.contains("moon"), "got: {msg}");
    }

    #[test]
    fn load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG_YAML.as_bytes()).unwrap();
        let catalog = RegionCatalog::from_path(file.path(), &vars()).unwrap();
        assert_eq!(catalog.profiles().len(), 3);
    }

    #[test]
    fn serde_roundtrip() {
        let catalog = RegionCatalog::from_yaml_str(CATALOG_YAML, &vars()).unwrap();
        let json = serde_json::to_string(&catalog).unwrap();
        let back: RegionCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(catalog, back);
    }
}
