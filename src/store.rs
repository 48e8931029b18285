// src/store.rs
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::config::{MainConfig, TransactionsDocument};
use crate::error::EpicError;

/// A JSON document persisted at the project root.
pub trait Document: Serialize + DeserializeOwned + Default {
  /// Logical name used in messages (`main`, `transactions`).
  const NAME: &'static str;
  /// File name relative to the project root.
  const FILE: &'static str;
  const SUPPORTED_VERSIONS: &'static [u32];
}

impl Document for MainConfig {
  const NAME: &'static str = "main";
  const FILE: &'static str = "epic.config.json";
  const SUPPORTED_VERSIONS: &'static [u32] = &[1, 2];
}

impl Document for TransactionsDocument {
  const NAME: &'static str = "transactions";
  const FILE: &'static str = "epic.transactions.json";
  const SUPPORTED_VERSIONS: &'static [u32] = &[1];
}

/// Reads and writes the project's documents. One instance per invocation.
#[derive(Debug, Clone)]
pub struct ConfigStore {
  root: PathBuf,
}

impl ConfigStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    ConfigStore { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn path_of<D: Document>(&self) -> PathBuf {
    self.root.join(D::FILE)
  }

  pub fn has<D: Document>(&self) -> bool {
    self.path_of::<D>().is_file()
  }

  /// Loads a document, substituting the default when the file is missing or unreadable.
  /// An unsupported version is still an error.
  pub fn load<D: Document>(&self) -> Result<D, EpicError> {
    match self.load_strict::<D>() {
      Ok(Some(doc)) => Ok(doc),
      Ok(None) => {
        warn!(
          "No '{}' document found at {}, using defaults.",
          D::NAME,
          self.path_of::<D>().display()
        );
        Ok(D::default())
      }
      Err(EpicError::DocumentParse { path, source }) => {
        warn!(
          "Could not parse '{}': {}. Using defaults.",
          path.display(),
          source
        );
        Ok(D::default())
      }
      Err(e) => Err(e),
    }
  }

  /// Loads a document, returning `None` if the file does not exist and an error if it cannot be parsed.
  pub fn load_strict<D: Document>(&self) -> Result<Option<D>, EpicError> {
    let path = self.path_of::<D>();
    let content = match fs::read_to_string(&path) {
      Ok(s) => s,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(EpicError::Io(e)),
    };
    trace!("Read {} bytes from {}", content.len(), path.display());

    let raw: Value = serde_json::from_str(&content).map_err(|e| EpicError::DocumentParse {
      path: path.clone(),
      source: e,
    })?;

    // Version gate runs before the typed parse so a newer schema is reported as such.
    if let Some(version) = raw.get("version").and_then(Value::as_u64) {
      let supported = D::SUPPORTED_VERSIONS
        .iter()
        .any(|v| u64::from(*v) == version);
      if !supported {
        return Err(EpicError::UnsupportedVersion {
          path,
          version,
          supported: D::SUPPORTED_VERSIONS,
        });
      }
    }

    let doc = serde_json::from_value(raw).map_err(|e| EpicError::DocumentParse {
      path: path.clone(),
      source: e,
    })?;
    debug!("Loaded '{}' from {}", D::NAME, path.display());
    Ok(Some(doc))
  }

  /// Writes the whole document, pretty-printed, replacing the file atomically.
  pub fn save<D: Document>(&self, doc: &D) -> Result<(), EpicError> {
    let path = self.path_of::<D>();
    let mut content = serde_json::to_string_pretty(doc)?;
    content.push('\n');

    let mut tmp = NamedTempFile::new_in(&self.root)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(&path).map_err(|e| EpicError::Io(e.error))?;
    debug!("Saved '{}' to {}", D::NAME, path.display());
    Ok(())
  }

  /// Load, apply `f`, save. Nothing is written if `f` fails.
  pub fn update<D, F>(&self, f: F) -> Result<&Self, EpicError>
  where
    D: Document,
    F: FnOnce(&mut D) -> Result<(), EpicError>,
  {
    let mut doc = self.load::<D>()?;
    f(&mut doc)?;
    self.save(&doc)?;
    Ok(self)
  }

  /// Like `update`, but a document that exists and cannot be parsed is an error
  /// instead of being replaced by the default.
  pub fn update_strict<D, F>(&self, f: F) -> Result<&Self, EpicError>
  where
    D: Document,
    F: FnOnce(&mut D) -> Result<(), EpicError>,
  {
    let mut doc = self.load_strict::<D>()?.unwrap_or_default();
    f(&mut doc)?;
    self.save(&doc)?;
    Ok(self)
  }

  pub fn delete<D: Document>(&self) -> Result<(), EpicError> {
    match fs::remove_file(self.path_of::<D>()) {
      Ok(()) => {
        debug!("Deleted '{}' document", D::NAME);
        Ok(())
      }
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(EpicError::Io(e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Brand, ProjectType, ResourceKind, Transaction};
  use serde_json::json;
  use tempfile::tempdir;

  #[test]
  fn test_load_missing_returns_default_without_creating_file() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());

    let config = store.load::<MainConfig>().unwrap();
    assert_eq!(config, MainConfig::default());
    assert!(!store.has::<MainConfig>());
    assert!(store.load_strict::<MainConfig>().unwrap().is_none());
  }

  #[test]
  fn test_round_trip_is_stable_for_supported_versions() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());

    for version in MainConfig::SUPPORTED_VERSIONS {
      let raw = json!({
        "version": version,
        "type": "plugin",
        "name": "demo",
        "description": "d",
        "brand": { "name": "Acme", "country": "US", "address": "N/A" },
        "lastAccess": { "controller": "users" },
        "extensions": { "theme": "dark" }
      });
      fs::write(store.path_of::<MainConfig>(), raw.to_string()).unwrap();

      let first = store.load::<MainConfig>().unwrap();
      store.save(&first).unwrap();
      let second = store.load::<MainConfig>().unwrap();

      assert_eq!(first, second);
      assert_eq!(second.version, *version);
      assert_eq!(second.extensions["theme"], "dark");
    }
  }

  #[test]
  fn test_unsupported_version_is_fatal_even_when_lenient() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());
    fs::write(
      store.path_of::<MainConfig>(),
      r#"{"version": 99, "type": "application", "name": "x"}"#,
    )
    .unwrap();

    let err = store.load::<MainConfig>().unwrap_err();
    assert!(matches!(err, EpicError::UnsupportedVersion { version: 99, .. }));
  }

  #[test]
  fn test_unparsable_file_falls_back_unless_strict() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());
    fs::write(store.path_of::<TransactionsDocument>(), "{ not json").unwrap();

    let doc = store.load::<TransactionsDocument>().unwrap();
    assert!(doc.transactions.is_empty());
    assert!(matches!(
      store.load_strict::<TransactionsDocument>(),
      Err(EpicError::DocumentParse { .. })
    ));
  }

  #[test]
  fn test_defaults_filled_on_load_but_not_persisted() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());
    let original = r#"{"version": 2, "type": "application", "name": "demo"}"#;
    fs::write(store.path_of::<MainConfig>(), original).unwrap();

    let config = store.load::<MainConfig>().unwrap();
    assert_eq!(config.paths.controllers, "src/controllers");
    let on_disk = fs::read_to_string(store.path_of::<MainConfig>()).unwrap();
    assert_eq!(on_disk, original);
  }

  #[test]
  fn test_update_writes_nothing_when_transform_fails() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());

    let result = store.update::<MainConfig, _>(|config| {
      config.name = "changed".to_string();
      Err(EpicError::Render("boom".to_string()))
    });
    assert!(result.is_err());
    assert!(!store.has::<MainConfig>());
  }

  #[test]
  fn test_update_chains_and_persists() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());

    store
      .update::<MainConfig, _>(|config| {
        config.project_type = ProjectType::Plugin;
        config.brand = Brand {
          name: "Acme".to_string(),
          country: "US".to_string(),
          address: "N/A".to_string(),
        };
        config.last_access.set(ResourceKind::Model, Some("user".to_string()));
        Ok(())
      })
      .unwrap()
      .update::<TransactionsDocument, _>(|doc| {
        doc.record(Transaction::new("create-model", serde_json::Map::new()));
        Ok(())
      })
      .unwrap();

    let config = store.load::<MainConfig>().unwrap();
    assert_eq!(config.brand.name, "Acme");
    assert_eq!(config.last_access.get(ResourceKind::Model), Some("user"));
    let content = fs::read_to_string(store.path_of::<MainConfig>()).unwrap();
    assert!(content.contains("\n  \"type\": \"plugin\""));
    assert_eq!(store.load::<TransactionsDocument>().unwrap().transactions.len(), 1);
  }

  #[test]
  fn test_update_strict_keeps_unparsable_file() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());
    fs::write(store.path_of::<TransactionsDocument>(), "{ not json").unwrap();

    let result = store.update_strict::<TransactionsDocument, _>(|doc| {
      doc.record(Transaction::new("create-model", serde_json::Map::new()));
      Ok(())
    });
    assert!(matches!(result, Err(EpicError::DocumentParse { .. })));
    let on_disk = fs::read_to_string(store.path_of::<TransactionsDocument>()).unwrap();
    assert_eq!(on_disk, "{ not json");

    store.delete::<TransactionsDocument>().unwrap();
    store
      .update_strict::<TransactionsDocument, _>(|doc| {
        doc.record(Transaction::new("create-model", serde_json::Map::new()));
        Ok(())
      })
      .unwrap();
    assert_eq!(store.load::<TransactionsDocument>().unwrap().transactions.len(), 1);
  }

  #[test]
  fn test_delete_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());
    store.save(&MainConfig::default()).unwrap();
    assert!(store.has::<MainConfig>());

    store.delete::<MainConfig>().unwrap();
    store.delete::<MainConfig>().unwrap();
    assert!(!store.has::<MainConfig>());
  }
}
