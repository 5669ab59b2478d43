//! ---
//! cep_section: "02-ingestion"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Equipment asset registry synthesised from staged projects."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};

use cep_sim::{Asset, AssetId, AssetSource};
use csv::{ReaderBuilder, Writer};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::Result;
use crate::staging::ProjectRecord;
use crate::IngestError;

pub const ASSET_TAG_PREFIX: &str = "MACH-";
pub const DEFAULT_ASSET_TYPE: &str = "Heavy Equipment";

/// Row of the asset dimension table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub asset_id: AssetId,
    pub asset_tag: String,
    pub nyc_project_id: String,
    pub asset_type: String,
}

impl AssetRecord {
    pub fn as_asset(&self) -> Asset {
        Asset::new(self.asset_id, self.asset_tag.clone())
    }
}

/// Tag assigned to the machine bridged to `project_id`.
pub fn asset_tag_for(project_id: &str) -> String {
    format!("{ASSET_TAG_PREFIX}{project_id}")
}

/// Asset dimension keyed by tag, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    records: IndexMap<String, AssetRecord>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry table; a missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let mut registry = Self::new();
        if !path.exists() {
            return Ok(registry);
        }
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        for row in reader.deserialize::<AssetRecord>() {
            let record = row?;
            if registry.records.contains_key(&record.asset_tag) {
                warn!(asset_tag = %record.asset_tag, "duplicate asset tag in registry file ignored");
                continue;
            }
            registry.records.insert(record.asset_tag.clone(), record);
        }
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = Writer::from_path(path)?;
        for record in self.records.values() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Bridge every staged project to a machine asset.
    ///
    /// Tags already present are left untouched; new assets get ids after the
    /// current maximum. Returns the number of assets inserted.
    pub fn synthesize(&mut self, projects: &[ProjectRecord]) -> usize {
        let mut next_id = self.next_id();
        let mut inserted = 0usize;
        for project in projects {
            let asset_tag = asset_tag_for(&project.project_id);
            if self.records.contains_key(&asset_tag) {
                continue;
            }
            self.records.insert(
                asset_tag.clone(),
                AssetRecord {
                    asset_id: next_id,
                    asset_tag,
                    nyc_project_id: project.project_id.clone(),
                    asset_type: DEFAULT_ASSET_TYPE.to_owned(),
                },
            );
            next_id += 1;
            inserted += 1;
        }
        info!(
            inserted,
            total = self.records.len(),
            "asset registry synthesised"
        );
        inserted
    }

    pub fn get(&self, asset_tag: &str) -> Option<&AssetRecord> {
        self.records.get(asset_tag)
    }

    pub fn records(&self) -> impl Iterator<Item = &AssetRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn next_id(&self) -> AssetId {
        self.records
            .values()
            .map(|record| record.asset_id)
            .max()
            .map_or(1, |max| max + 1)
    }
}

impl AssetSource for AssetRegistry {
    type Error = Infallible;

    fn assets(&self) -> std::result::Result<Vec<Asset>, Self::Error> {
        Ok(self.records.values().map(AssetRecord::as_asset).collect())
    }
}

/// Registry read from disk on every lookup.
#[derive(Debug, Clone)]
pub struct AssetRegistryFile {
    path: PathBuf,
}

impl AssetRegistryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AssetSource for AssetRegistryFile {
    type Error = IngestError;

    fn assets(&self) -> std::result::Result<Vec<Asset>, Self::Error> {
        let registry = AssetRegistry::load(&self.path)?;
        info!(path = %self.path.display(), assets = registry.len(), "asset registry loaded");
        Ok(registry
            .records()
            .map(AssetRecord::as_asset)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn project(id: &str) -> ProjectRecord {
        ProjectRecord {
            project_id: id.to_owned(),
            project_name: format!("Project {id}"),
            borough: "Brooklyn".to_owned(),
            target_date: None,
        }
    }

    #[test]
    fn tags_are_prefixed_project_ids() {
        assert_eq!(asset_tag_for("850-1001"), "MACH-850-1001");
    }

    #[test]
    fn synthesis_skips_existing_tags() {
        let mut registry = AssetRegistry::new();
        let inserted = registry.synthesize(&[project("A"), project("B"), project("A")]);
        assert_eq!(inserted, 2);
        let again = registry.synthesize(&[project("B"), project("C")]);
        assert_eq!(again, 1);

        let ids: Vec<_> = registry.records().map(|r| (r.asset_id, r.asset_tag.as_str())).collect();
        assert_eq!(ids, vec![(1, "MACH-A"), (2, "MACH-B"), (3, "MACH-C")]);
        assert_eq!(registry.get("MACH-C").unwrap().asset_type, DEFAULT_ASSET_TYPE);
        assert_eq!(registry.get("MACH-C").unwrap().nyc_project_id, "C");
    }

    #[test]
    fn registry_round_trips_through_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("asset_intelligence/dim_assets.csv");
        let mut registry = AssetRegistry::new();
        registry.synthesize(&[project("X"), project("Y")]);
        registry.save(&path)?;

        let mut reloaded = AssetRegistry::load(&path)?;
        assert_eq!(reloaded.len(), 2);
        reloaded.synthesize(&[project("Z")]);
        assert_eq!(reloaded.get("MACH-Z").unwrap().asset_id, 3);
        Ok(())
    }

    #[test]
    fn missing_registry_file_is_empty_source() -> Result<()> {
        let dir = tempdir()?;
        let source = AssetRegistryFile::new(dir.path().join("dim_assets.csv"));
        assert!(source.assets()?.is_empty());
        Ok(())
    }

    #[test]
    fn source_preserves_registry_order() {
        let mut registry = AssetRegistry::new();
        registry.synthesize(&[project("B"), project("A")]);
        let assets = registry.assets().unwrap();
        assert_eq!(assets[0], Asset::new(1, "MACH-B"));
        assert_eq!(assets[1], Asset::new(2, "MACH-A"));
    }
}
