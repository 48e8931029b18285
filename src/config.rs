// src/config.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EpicError;

/// Version written into newly created `epic.config.json` documents.
/// Version 1 documents predate `lastAccess` and `extensions`, both of which default on load.
pub const CONFIG_VERSION: u32 = 2;
pub const TRANSACTIONS_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum ProjectType {
  #[default]
  Application,
  Plugin,
}

impl ProjectType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProjectType::Application => "application",
      ProjectType::Plugin => "plugin",
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Brand {
  pub name: String,
  pub country: String,
  pub address: String,
}

/// Relative directories per resource kind. Every field defaults on load.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Paths {
  #[serde(default = "default_controllers_path")]
  pub controllers: String,
  #[serde(default = "default_models_path")]
  pub models: String,
  #[serde(default = "default_middlewares_path")]
  pub middlewares: String,
  #[serde(default = "default_templates_path")]
  pub templates: String,
}

fn default_controllers_path() -> String {
  "src/controllers".to_string()
}
fn default_models_path() -> String {
  "src/models".to_string()
}
fn default_middlewares_path() -> String {
  "src/middlewares".to_string()
}
fn default_templates_path() -> String {
  "templates".to_string()
}

impl Default for Paths {
  fn default() -> Self {
    Paths {
      controllers: default_controllers_path(),
      models: default_models_path(),
      middlewares: default_middlewares_path(),
      templates: default_templates_path(),
    }
  }
}

impl Paths {
  pub fn for_kind(&self, kind: ResourceKind) -> &str {
    match kind {
      ResourceKind::Controller => &self.controllers,
      ResourceKind::Model => &self.models,
      ResourceKind::Middleware => &self.middlewares,
    }
  }
}

/// Name of the last resource created per kind, offered as the default parent next time.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LastAccess {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub controller: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub middleware: Option<String>,
}

impl LastAccess {
  pub fn get(&self, kind: ResourceKind) -> Option<&str> {
    match kind {
      ResourceKind::Controller => self.controller.as_deref(),
      ResourceKind::Model => self.model.as_deref(),
      ResourceKind::Middleware => self.middleware.as_deref(),
    }
  }

  pub fn set(&mut self, kind: ResourceKind, value: Option<String>) {
    let slot = match kind {
      ResourceKind::Controller => &mut self.controller,
      ResourceKind::Model => &mut self.model,
      ResourceKind::Middleware => &mut self.middleware,
    };
    *slot = value;
  }
}

/// The `main` document, persisted as `epic.config.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)] // Only `extensions` may carry free-form data
#[serde(rename_all = "camelCase")]
pub struct MainConfig {
  pub version: u32,
  #[serde(rename = "type")]
  pub project_type: ProjectType,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub brand: Brand,
  #[serde(default)]
  pub paths: Paths,
  #[serde(default)]
  pub last_access: LastAccess,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub extensions: Map<String, Value>,
}

impl Default for MainConfig {
  fn default() -> Self {
    MainConfig {
      version: CONFIG_VERSION,
      project_type: ProjectType::Application,
      name: String::new(),
      description: String::new(),
      brand: Brand::default(),
      paths: Paths::default(),
      last_access: LastAccess::default(),
      extensions: Map::new(),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
  Controller,
  Model,
  Middleware,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 3] = [
    ResourceKind::Controller,
    ResourceKind::Model,
    ResourceKind::Middleware,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceKind::Controller => "controller",
      ResourceKind::Model => "model",
      ResourceKind::Middleware => "middleware",
    }
  }

  pub fn create_command(&self) -> &'static str {
    match self {
      ResourceKind::Controller => "create-controller",
      ResourceKind::Model => "create-model",
      ResourceKind::Middleware => "create-middleware",
    }
  }

  pub fn delete_command(&self) -> &'static str {
    match self {
      ResourceKind::Controller => "delete-controller",
      ResourceKind::Model => "delete-model",
      ResourceKind::Middleware => "delete-middleware",
    }
  }

  /// Suffix appended to the PascalCase name to form the exported identifier.
  pub fn identifier_suffix(&self) -> &'static str {
    match self {
      ResourceKind::Controller => "Controller",
      ResourceKind::Model => "Model",
      ResourceKind::Middleware => "Middleware",
    }
  }

  /// Injection point in the parent file that lists registered children.
  pub fn registration_point(&self) -> &'static str {
    match self {
      ResourceKind::Controller => "children",
      ResourceKind::Model | ResourceKind::Middleware => "registry",
    }
  }

  pub fn from_create_command(command: &str) -> Option<ResourceKind> {
    ResourceKind::ALL
      .into_iter()
      .find(|kind| kind.create_command() == command)
  }
}

/// A recorded `(command, params)` pair.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
  pub command: String,
  #[serde(default)]
  pub params: Map<String, Value>,
}

impl Transaction {
  pub fn new(command: impl Into<String>, params: Map<String, Value>) -> Self {
    Transaction {
      command: command.into(),
      params,
    }
  }

  /// The `name` parameter that distinguishes entries of the same command.
  pub fn name(&self) -> Option<&str> {
    self.params.get("name").and_then(Value::as_str)
  }
}

/// The `transactions` document, persisted as `epic.transactions.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TransactionsDocument {
  pub version: u32,
  #[serde(default)]
  pub transactions: Vec<Transaction>,
}

impl Default for TransactionsDocument {
  fn default() -> Self {
    TransactionsDocument {
      version: TRANSACTIONS_VERSION,
      transactions: Vec::new(),
    }
  }
}

impl TransactionsDocument {
  /// Appends a transaction, first dropping any entry with the same command and name.
  pub fn record(&mut self, transaction: Transaction) {
    if let Some(name) = transaction.name() {
      let name = name.to_string();
      self.remove(&transaction.command, &name);
    }
    self.transactions.push(transaction);
  }

  /// Removes entries for `command` whose `name` param equals `name`. Returns whether any matched.
  pub fn remove(&mut self, command: &str, name: &str) -> bool {
    let before = self.transactions.len();
    self
      .transactions
      .retain(|t| !(t.command == command && t.name() == Some(name)));
    before != self.transactions.len()
  }

  /// Resources implied by the create-* entries, in log order.
  pub fn resources(&self) -> Vec<Resource> {
    self
      .transactions
      .iter()
      .filter_map(Resource::from_transaction)
      .collect()
  }
}

/// A generated artifact, derived from its create-* transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
  pub kind: ResourceKind,
  pub name: String,
  pub parent: Option<String>,
}

impl Resource {
  pub fn from_transaction(transaction: &Transaction) -> Option<Resource> {
    let kind = ResourceKind::from_create_command(&transaction.command)?;
    let name = transaction.name()?.to_string();
    let parent = transaction
      .params
      .get("parent")
      .and_then(Value::as_str)
      .map(str::to_string);
    Some(Resource { kind, name, parent })
  }
}

/// Resource names become file names and identifiers, so keep them plain.
pub fn validate_resource_name(name: &str) -> Result<(), EpicError> {
  let invalid = |reason: &str| EpicError::InvalidName {
    name: name.to_string(),
    reason: reason.to_string(),
  };

  let mut chars = name.chars();
  match chars.next() {
    None => return Err(invalid("name must not be empty")),
    Some(first) if !first.is_ascii_alphabetic() => {
      return Err(invalid("name must start with a letter"))
    }
    Some(_) => {}
  }
  if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
    return Err(invalid(
      "only letters, digits, '-' and '_' are allowed",
    ));
  }
  if name.eq_ignore_ascii_case("index") || name.eq_ignore_ascii_case("none") {
    return Err(invalid("this name is reserved"));
  }
  Ok(())
}
