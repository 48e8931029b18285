// src/operations/resource.rs
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use heck::ToUpperCamelCase;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{
  validate_resource_name, MainConfig, Resource, ResourceKind, TransactionsDocument,
};
use crate::error::EpicError;
use crate::operations::{from_params, CommandMeta, Context, Params};
use crate::render::{self, Injection, Substitutions};
use crate::tasks::{Task, TaskList};
use crate::utils;

pub const CREATE_CONTROLLER: CommandMeta = CommandMeta {
  name: "create-controller",
};
pub const CREATE_MODEL: CommandMeta = CommandMeta {
  name: "create-model",
};
pub const CREATE_MIDDLEWARE: CommandMeta = CommandMeta {
  name: "create-middleware",
};
pub const DELETE_CONTROLLER: CommandMeta = CommandMeta {
  name: "delete-controller",
};
pub const DELETE_MODEL: CommandMeta = CommandMeta {
  name: "delete-model",
};
pub const DELETE_MIDDLEWARE: CommandMeta = CommandMeta {
  name: "delete-middleware",
};

/// Parent value meaning "register under the root controller".
pub const NO_PARENT: &str = "None";
pub const DEFAULT_TEMPLATE: &str = "blank";
const INDEX_FILE: &str = "index.ts";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOptions {
  pub name: String,
  #[serde(default = "default_template")]
  pub template: String,
  /// Controllers only.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent: Option<String>,
}

fn default_template() -> String {
  DEFAULT_TEMPLATE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteOptions {
  pub name: String,
}

pub fn create_controller_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options = from_params(CREATE_CONTROLLER.name, params)?;
  create_resource(ctx, ResourceKind::Controller, &options, CREATE_CONTROLLER)
}

pub fn create_model_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options = from_params(CREATE_MODEL.name, params)?;
  create_resource(ctx, ResourceKind::Model, &options, CREATE_MODEL)
}

pub fn create_middleware_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options = from_params(CREATE_MIDDLEWARE.name, params)?;
  create_resource(ctx, ResourceKind::Middleware, &options, CREATE_MIDDLEWARE)
}

pub fn delete_controller_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options = from_params(DELETE_CONTROLLER.name, params)?;
  delete_resource(ctx, ResourceKind::Controller, &options)
}

pub fn delete_model_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options = from_params(DELETE_MODEL.name, params)?;
  delete_resource(ctx, ResourceKind::Model, &options)
}

pub fn delete_middleware_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options = from_params(DELETE_MIDDLEWARE.name, params)?;
  delete_resource(ctx, ResourceKind::Middleware, &options)
}

/// Exported identifier of a generated resource, e.g. `users` -> `UsersController`.
pub fn identifier(kind: ResourceKind, name: &str) -> String {
  format!("{}{}", name.to_upper_camel_case(), kind.identifier_suffix())
}

fn resource_file(root: &Path, config: &MainConfig, kind: ResourceKind, name: &str) -> PathBuf {
  root
    .join(config.paths.for_kind(kind))
    .join(format!("{}.ts", name))
}

/// File that imports and registers the resource.
fn parent_file(
  root: &Path,
  config: &MainConfig,
  kind: ResourceKind,
  parent: Option<&str>,
) -> PathBuf {
  let dir = root.join(config.paths.for_kind(kind));
  match (kind, parent) {
    (ResourceKind::Controller, Some(parent)) if parent != NO_PARENT => {
      dir.join(format!("{}.ts", parent))
    }
    _ => dir.join(INDEX_FILE),
  }
}

fn import_line(ident: &str, name: &str) -> String {
  format!("import {} from \"./{}.ts\";", ident, name)
}

fn registration_line(ident: &str) -> String {
  format!("{},", ident)
}

struct ResourceState<'c, 'a> {
  ctx: &'c mut Context<'a>,
  config: MainConfig,
}

/// Renders a new controller/model/middleware, registers it with its parent, and records it.
pub fn create_resource(
  ctx: &mut Context<'_>,
  kind: ResourceKind,
  options: &ResourceOptions,
  meta: CommandMeta,
) -> Result<(), EpicError> {
  let config = ctx.require_main()?;
  validate_resource_name(&options.name)?;
  // The parent names a file next to the new controller.
  if let Some(parent) = options.parent.as_deref().filter(|p| *p != NO_PARENT) {
    validate_resource_name(parent)?;
  }
  let ident = identifier(kind, &options.name);
  let mut state = ResourceState { ctx, config };

  TaskList::new(meta.name)
    .add(Task::new(
      format!("Creating {} '{}'", kind.as_str(), options.name),
      |s: &mut ResourceState<'_, '_>| {
        let root = s.ctx.root();
        let template = render::load_template(
          &root.join(&s.config.paths.templates),
          kind,
          &options.template,
        )?;
        let out_dir = s.config.paths.for_kind(kind);
        let mut substitutions = Substitutions::new();
        substitutions.insert(
          "__ROOT_PATH__".to_string(),
          utils::relative_root_path(root, Path::new(out_dir)),
        );
        substitutions.insert("__NAME__".to_string(), options.name.clone());
        substitutions.insert(
          "__PASCAL_NAME__".to_string(),
          options.name.to_upper_camel_case(),
        );

        let output = resource_file(root, &s.config, kind, &options.name);
        if output.exists() {
          warn!("'{}' already exists and will be overwritten.", output.display());
        }
        render::render_to_file(&template, &output, &substitutions, &[])?;
        info!("Created {}", output.display());
        Ok(())
      },
    ))
    .add(Task::new(
      format!("Registering {} '{}'", kind.as_str(), ident),
      |s: &mut ResourceState<'_, '_>| {
        let parent = parent_file(s.ctx.root(), &s.config, kind, options.parent.as_deref());
        // Re-created under a different parent: drop the old registration first.
        let previous = recorded_parent_file(s, kind, &options.name)?;
        if let Some(previous) = previous.filter(|p| *p != parent) {
          if let Err(e) = unregister(&previous, &ident, &options.name) {
            warn!(
              "Could not unregister '{}' from previous parent {}: {}",
              ident,
              previous.display(),
              e
            );
          }
        }
        let injections = [
          Injection::new("imports", import_line(&ident, &options.name)),
          Injection::new(kind.registration_point(), registration_line(&ident)),
        ];
        // The new file already exists; a parent that cannot be updated is only worth a warning.
        match render::inject_file(&parent, &injections) {
          Ok(()) => debug!("Registered '{}' in {}", ident, parent.display()),
          Err(e) => warn!(
            "Could not register '{}' in {}: {}. Add it manually.",
            ident,
            parent.display(),
            e
          ),
        }
        Ok(())
      },
    ))
    .add(Task::new(
      "Recording transaction",
      |s: &mut ResourceState<'_, '_>| {
        s.ctx.store.update::<MainConfig, _>(|config| {
          config
            .last_access
            .set(kind, Some(options.name.clone()));
          Ok(())
        })?;
        s.ctx.record(meta, options)
      },
    ))
    .run(&mut state)
}

/// Undoes a create: removes the file, its registration, and its log entry.
pub fn delete_resource(
  ctx: &mut Context<'_>,
  kind: ResourceKind,
  options: &DeleteOptions,
) -> Result<(), EpicError> {
  let config = ctx.require_main()?;
  validate_resource_name(&options.name)?;
  let ident = identifier(kind, &options.name);
  let mut state = ResourceState { ctx, config };

  TaskList::new(kind.delete_command())
    .add(Task::new(
      format!("Removing {} '{}'", kind.as_str(), options.name),
      |s: &mut ResourceState<'_, '_>| {
        let file = resource_file(s.ctx.root(), &s.config, kind, &options.name);
        match fs::remove_file(&file) {
          Ok(()) => info!("Removed {}", file.display()),
          Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("'{}' does not exist, nothing to remove.", file.display())
          }
          Err(e) => return Err(EpicError::Io(e)),
        }
        Ok(())
      },
    ))
    .add(Task::new(
      format!("Unregistering {} '{}'", kind.as_str(), ident),
      |s: &mut ResourceState<'_, '_>| {
        let parent = recorded_parent_file(s, kind, &options.name)?
          .unwrap_or_else(|| parent_file(s.ctx.root(), &s.config, kind, None));
        if let Err(e) = unregister(&parent, &ident, &options.name) {
          warn!(
            "Could not unregister '{}' from {}: {}",
            ident,
            parent.display(),
            e
          );
        }
        Ok(())
      },
    ))
    .add(Task::new(
      "Updating transaction log",
      |s: &mut ResourceState<'_, '_>| {
        if s.config.last_access.get(kind) == Some(options.name.as_str()) {
          s.ctx.store.update::<MainConfig, _>(|config| {
            config.last_access.set(kind, None);
            Ok(())
          })?;
        }
        if !s.ctx.forget(kind.create_command(), &options.name)? {
          warn!(
            "No '{}' transaction recorded for '{}'.",
            kind.create_command(),
            options.name
          );
        }
        Ok(())
      },
    ))
    .run(&mut state)
}

/// Parent file of the resource as recorded by its create transaction, if any.
fn recorded_parent_file(
  s: &ResourceState<'_, '_>,
  kind: ResourceKind,
  name: &str,
) -> Result<Option<PathBuf>, EpicError> {
  let recorded = s
    .ctx
    .store
    .load::<TransactionsDocument>()?
    .resources()
    .into_iter()
    .find(|r: &Resource| r.kind == kind && r.name == name);
  Ok(recorded.map(|r| parent_file(s.ctx.root(), &s.config, kind, r.parent.as_deref())))
}

fn unregister(parent: &Path, ident: &str, name: &str) -> Result<(), EpicError> {
  let content = fs::read_to_string(parent)?;
  let (content, imports) = render::remove_injected(&content, &import_line(ident, name));
  let (content, registrations) = render::remove_injected(&content, &registration_line(ident));
  if imports + registrations == 0 {
    return Err(EpicError::Render(format!("'{}' is not registered there", ident)));
  }
  fs::write(parent, content)?;
  debug!("Unregistered '{}' from {}", ident, parent.display());
  Ok(())
}
