// src/manifest.rs
use std::fs;
use std::path::{Path, PathBuf};

use heck::ToKebabCase;
use log::{debug, info};
use serde_json::{Map, Value};

use crate::config::{MainConfig, ProjectType};
use crate::error::EpicError;
use crate::utils;

pub const MANIFEST_FILE: &str = "package.json";
pub const ENV_DIR: &str = "env";
pub const ENVIRONMENTS: [&str; 2] = ["development", "production"];
pub const ENCRYPTION_KEY_LENGTH: usize = 32;

/// Fields inherited from the template repository that do not describe the new project.
const TEMPLATE_ONLY_FIELDS: [&str; 3] = ["homepage", "repository", "bugs"];

pub fn manifest_path(root: &Path) -> PathBuf {
  root.join(MANIFEST_FILE)
}

pub fn has_manifest(root: &Path) -> bool {
  manifest_path(root).is_file()
}

/// Re-derives the consumer's package.json from the project configuration.
pub fn rewrite_manifest(root: &Path, config: &MainConfig) -> Result<(), EpicError> {
  let path = manifest_path(root);
  let content = fs::read_to_string(&path)?;
  let mut manifest: Value =
    serde_json::from_str(&content).map_err(|e| EpicError::DocumentParse {
      path: path.clone(),
      source: e,
    })?;
  let Value::Object(fields) = &mut manifest else {
    return Err(EpicError::Render(format!(
      "'{}' is not a JSON object",
      path.display()
    )));
  };

  apply_config(fields, config);

  let mut output = serde_json::to_string_pretty(&manifest)?;
  output.push('\n');
  fs::write(&path, output)?;
  info!("Updated {}", path.display());
  Ok(())
}

fn apply_config(fields: &mut Map<String, Value>, config: &MainConfig) {
  fields.insert("name".to_string(), Value::String(config.name.to_kebab_case()));
  fields.insert(
    "description".to_string(),
    Value::String(config.description.clone()),
  );
  fields.insert(
    "private".to_string(),
    Value::Bool(config.project_type == ProjectType::Application),
  );

  // Plugins must not drag their runtime dependencies into the host application.
  if config.project_type == ProjectType::Plugin {
    let moved = match fields.get_mut("dependencies") {
      Some(Value::Object(deps)) => std::mem::take(deps),
      _ => Map::new(),
    };
    if !moved.is_empty() {
      let dev = fields
        .entry("devDependencies")
        .or_insert_with(|| Value::Object(Map::new()));
      if !dev.is_object() {
        *dev = Value::Object(Map::new());
      }
      if let Value::Object(dev) = dev {
        for (package, version) in moved {
          debug!("Moving '{}' to devDependencies", package);
          dev.entry(package).or_insert(version);
        }
      }
    }
  }

  let type_tag = format!("epic-{}", config.project_type.as_str());
  let other_tag = match config.project_type {
    ProjectType::Application => "epic-plugin",
    ProjectType::Plugin => "epic-application",
  };
  let mut keywords: Vec<Value> = match fields.get_mut("keywords") {
    Some(Value::Array(items)) => std::mem::take(items),
    _ => Vec::new(),
  };
  keywords.retain(|k| k.as_str() != Some(other_tag));
  for tag in ["epic", type_tag.as_str()] {
    if !keywords.iter().any(|k| k.as_str() == Some(tag)) {
      keywords.push(Value::String(tag.to_string()));
    }
  }
  fields.insert("keywords".to_string(), Value::Array(keywords));

  fields.retain(|key, _| !TEMPLATE_ONLY_FIELDS.contains(&key.as_str()));
}

/// Writes `env/.<environment>.env` with a fresh encryption key for every environment.
pub fn write_env_files(root: &Path) -> Result<Vec<PathBuf>, EpicError> {
  let env_dir = root.join(ENV_DIR);
  fs::create_dir_all(&env_dir)?;

  let mut written = Vec::with_capacity(ENVIRONMENTS.len());
  for environment in ENVIRONMENTS {
    let path = env_dir.join(format!(".{}.env", environment));
    let key = utils::generate_random_key(ENCRYPTION_KEY_LENGTH);
    fs::write(&path, format!("ENCRYPTION_KEY={}\n", key))?;
    debug!("Wrote {}", path.display());
    written.push(path);
  }
  Ok(written)
}
