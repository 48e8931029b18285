// src/operations/mod.rs
//! Named operations and the registry that maps command names onto them.

pub mod install;
pub mod plugin;
pub mod project;
pub mod resource;

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{MainConfig, Transaction, TransactionsDocument};
use crate::error::EpicError;
use crate::process::CommandRunner;
use crate::store::{ConfigStore, Document};

/// Template repository cloned by `create-project` unless overridden.
pub const DEFAULT_TEMPLATE_REPO: &str = "https://github.com/epic-api/template.git";
pub const PRIMARY_PACKAGE_MANAGER: &str = "yarn";
pub const FALLBACK_PACKAGE_MANAGER: &str = "npm";

/// Parameters as recorded in the transaction log.
pub type Params = Map<String, Value>;

/// Handler invoked for a command name, with the parameters it was given.
pub type Handler = fn(&mut Context<'_>, &Params) -> Result<(), EpicError>;

/// Identity of the command being executed; its name is what gets recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMeta {
  pub name: &'static str,
}

#[derive(Debug, Clone)]
pub struct Settings {
  pub template_repo: String,
}

impl Default for Settings {
  fn default() -> Self {
    Settings {
      template_repo: DEFAULT_TEMPLATE_REPO.to_string(),
    }
  }
}

/// Everything an operation needs, built once per invocation.
pub struct Context<'a> {
  pub store: ConfigStore,
  pub runner: &'a dyn CommandRunner,
  pub settings: Settings,
  pub registry: Registry,
  /// Set while the log is being replayed; the log is then read-only.
  pub replaying: bool,
}

impl<'a> Context<'a> {
  pub fn new(store: ConfigStore, runner: &'a dyn CommandRunner, settings: Settings) -> Self {
    Context {
      store,
      runner,
      settings,
      registry: Registry::builtin(),
      replaying: false,
    }
  }

  pub fn root(&self) -> &Path {
    self.store.root()
  }

  /// Looks up `command` and runs it. Unknown commands are an error.
  pub fn dispatch(&mut self, command: &str, params: &Params) -> Result<(), EpicError> {
    let handler = self
      .registry
      .get(command)
      .ok_or_else(|| EpicError::UnknownCommand(command.to_string()))?;
    debug!("Dispatching '{}' with {:?}", command, params);
    handler(self, params)
  }

  /// The `main` document, which must already exist.
  pub fn require_main(&self) -> Result<MainConfig, EpicError> {
    self
      .store
      .load_strict::<MainConfig>()?
      .ok_or(EpicError::MissingDocument(<MainConfig as Document>::FILE))
  }

  /// Appends `{command, params}` to the log, replacing an entry with the same name.
  pub fn record<T: Serialize>(&self, meta: CommandMeta, options: &T) -> Result<(), EpicError> {
    if self.replaying {
      trace!("Replaying, not recording '{}'", meta.name);
      return Ok(());
    }
    let params = to_params(options)?;
    self.store.update_strict::<TransactionsDocument, _>(|doc| {
      doc.record(Transaction::new(meta.name, params));
      Ok(())
    })?;
    Ok(())
  }

  /// Drops the log entry for `command` + `name`, if present.
  pub fn forget(&self, command: &str, name: &str) -> Result<bool, EpicError> {
    if self.replaying || !self.store.has::<TransactionsDocument>() {
      return Ok(false);
    }
    let mut removed = false;
    self.store.update_strict::<TransactionsDocument, _>(|doc| {
      removed = doc.remove(command, name);
      Ok(())
    })?;
    Ok(removed)
  }
}

/// Command name -> handler, populated at startup.
#[derive(Clone)]
pub struct Registry {
  handlers: BTreeMap<&'static str, Handler>,
}

impl Registry {
  pub fn empty() -> Self {
    Registry {
      handlers: BTreeMap::new(),
    }
  }

  pub fn builtin() -> Self {
    Registry::empty()
      .register(project::INITIALIZE.name, project::initialize_handler)
      .register(project::CREATE_PROJECT.name, project::create_handler)
      .register(resource::CREATE_CONTROLLER.name, resource::create_controller_handler)
      .register(resource::CREATE_MODEL.name, resource::create_model_handler)
      .register(resource::CREATE_MIDDLEWARE.name, resource::create_middleware_handler)
      .register(resource::DELETE_CONTROLLER.name, resource::delete_controller_handler)
      .register(resource::DELETE_MODEL.name, resource::delete_model_handler)
      .register(resource::DELETE_MIDDLEWARE.name, resource::delete_middleware_handler)
      .register(plugin::ADD_PLUGIN.name, plugin::add_plugin_handler)
      .register(plugin::REMOVE_PLUGIN.name, plugin::remove_plugin_handler)
      .register(install::INSTALL.name, install::install_handler)
  }

  pub fn register(mut self, name: &'static str, handler: Handler) -> Self {
    self.handlers.insert(name, handler);
    self
  }

  pub fn get(&self, name: &str) -> Option<Handler> {
    self.handlers.get(name).copied()
  }

  pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.handlers.keys().copied()
  }
}

pub fn to_params<T: Serialize>(options: &T) -> Result<Params, EpicError> {
  match serde_json::to_value(options)? {
    Value::Object(map) => Ok(map),
    Value::Null => Ok(Params::new()),
    other => Err(EpicError::Render(format!(
      "parameters must serialize to an object, got {}",
      other
    ))),
  }
}

pub fn from_params<T: DeserializeOwned>(command: &str, params: &Params) -> Result<T, EpicError> {
  serde_json::from_value(Value::Object(params.clone())).map_err(|e| EpicError::InvalidParams {
    command: command.to_string(),
    source: e,
  })
}

/// Picks the primary package manager, or the fallback when the primary cannot be started.
pub fn package_manager(runner: &dyn CommandRunner) -> &'static str {
  if runner.is_available(PRIMARY_PACKAGE_MANAGER) {
    PRIMARY_PACKAGE_MANAGER
  } else {
    FALLBACK_PACKAGE_MANAGER
  }
}


#[cfg(test)]
mod tests {
  use super::test_support::*;
  use super::*;
  use crate::process::testing::FakeRunner;
  use serde_json::json;
  use tempfile::tempdir;

  #[test]
  fn test_builtin_registry_knows_every_command() {
    let names: Vec<_> = Registry::builtin().names().collect();
    for expected in [
      "initialize",
      "create-project",
      "create-controller",
      "create-model",
      "create-middleware",
      "delete-controller",
      "delete-model",
      "delete-middleware",
      "add-plugin",
      "remove-plugin",
      "install",
    ] {
      assert!(names.contains(&expected), "missing {}", expected);
    }
  }

  #[test]
  fn test_dispatch_unknown_command_is_an_error() {
    let dir = tempdir().unwrap();
    let runner = FakeRunner::default();
    let mut ctx = context(dir.path(), &runner);
    let err = ctx.dispatch("create-view", &Params::new()).unwrap_err();
    assert!(matches!(err, EpicError::UnknownCommand(name) if name == "create-view"));
  }

  #[test]
  fn test_record_refuses_to_overwrite_corrupt_log() {
    let dir = tempdir().unwrap();
    let runner = FakeRunner::default();
    let ctx = context(dir.path(), &runner);
    let log_path = ctx.store.path_of::<TransactionsDocument>();
    std::fs::write(&log_path, "[{ \"command\": ").unwrap();

    let meta = CommandMeta { name: "add-plugin" };
    let err = ctx.record(meta, &params(json!({ "name": "epic-auth" }))).unwrap_err();
    assert!(matches!(err, EpicError::DocumentParse { .. }));
    assert!(matches!(
      ctx.forget("add-plugin", "epic-auth"),
      Err(EpicError::DocumentParse { .. })
    ));
    assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "[{ \"command\": ");
  }

  #[test]
  fn test_log_is_read_only_while_replaying() {
    let dir = tempdir().unwrap();
    let runner = FakeRunner::default();
    let mut ctx = context(dir.path(), &runner);
    let meta = CommandMeta { name: "add-plugin" };
    ctx.record(meta, &params(json!({ "name": "a" }))).unwrap();
    ctx.record(meta, &params(json!({ "name": "b" }))).unwrap();
    let before = ctx.store.load::<TransactionsDocument>().unwrap();

    ctx.replaying = true;
    ctx.record(meta, &params(json!({ "name": "a" }))).unwrap();
    assert!(!ctx.forget("add-plugin", "b").unwrap());
    assert_eq!(ctx.store.load::<TransactionsDocument>().unwrap(), before);
  }

  #[test]
  fn test_package_manager_falls_back() {
    let mut runner = FakeRunner::default();
    assert_eq!(package_manager(&runner), "yarn");
    runner.unavailable.insert("yarn".to_string());
    assert_eq!(package_manager(&runner), "npm");
  }
}
