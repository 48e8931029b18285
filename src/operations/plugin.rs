// src/operations/plugin.rs
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::EpicError;
use crate::operations::{
  from_params, package_manager, CommandMeta, Context, Params, PRIMARY_PACKAGE_MANAGER,
};
use crate::tasks::{Task, TaskList};

pub const ADD_PLUGIN: CommandMeta = CommandMeta { name: "add-plugin" };
pub const REMOVE_PLUGIN: CommandMeta = CommandMeta {
  name: "remove-plugin",
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginOptions {
  /// Package name, optionally with a version (`epic-auth@^1`).
  pub name: String,
}

impl PluginOptions {
  fn validate(&self) -> Result<(), EpicError> {
    let name = self.name.trim();
    if name.is_empty() || name.chars().any(char::is_whitespace) || name.starts_with('-') {
      return Err(EpicError::InvalidName {
        name: self.name.clone(),
        reason: "expected a single package name".to_string(),
      });
    }
    Ok(())
  }
}

pub fn add_plugin_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options: PluginOptions = from_params(ADD_PLUGIN.name, params)?;
  add_plugin(ctx, &options)
}

pub fn remove_plugin_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options: PluginOptions = from_params(REMOVE_PLUGIN.name, params)?;
  remove_plugin(ctx, &options)
}

struct PluginState<'c, 'a> {
  ctx: &'c mut Context<'a>,
  package_manager: &'static str,
}

fn add_verb(package_manager: &str) -> &'static str {
  if package_manager == PRIMARY_PACKAGE_MANAGER {
    "add"
  } else {
    "install"
  }
}

fn remove_verb(package_manager: &str) -> &'static str {
  if package_manager == PRIMARY_PACKAGE_MANAGER {
    "remove"
  } else {
    "uninstall"
  }
}

pub fn add_plugin(ctx: &mut Context<'_>, options: &PluginOptions) -> Result<(), EpicError> {
  ctx.require_main()?;
  options.validate()?;
  let mut state = PluginState {
    ctx,
    package_manager: PRIMARY_PACKAGE_MANAGER,
  };

  TaskList::new(ADD_PLUGIN.name)
    .add(Task::new(
      "Checking package manager",
      |s: &mut PluginState<'_, '_>| {
        s.package_manager = package_manager(s.ctx.runner);
        Ok(())
      },
    ))
    .add(Task::new(
      format!("Installing plugin '{}'", options.name),
      |s: &mut PluginState<'_, '_>| {
        s.ctx.runner.run(
          "Install plugin",
          s.package_manager,
          &[add_verb(s.package_manager), options.name.as_str()],
          s.ctx.root(),
        )?;
        info!("Installed '{}' with {}", options.name, s.package_manager);
        Ok(())
      },
    ))
    .add(Task::new(
      "Recording transaction",
      |s: &mut PluginState<'_, '_>| s.ctx.record(ADD_PLUGIN, options),
    ))
    .run(&mut state)
}

pub fn remove_plugin(ctx: &mut Context<'_>, options: &PluginOptions) -> Result<(), EpicError> {
  ctx.require_main()?;
  options.validate()?;
  let mut state = PluginState {
    ctx,
    package_manager: PRIMARY_PACKAGE_MANAGER,
  };

  TaskList::new(REMOVE_PLUGIN.name)
    .add(Task::new(
      "Checking package manager",
      |s: &mut PluginState<'_, '_>| {
        s.package_manager = package_manager(s.ctx.runner);
        Ok(())
      },
    ))
    .add(Task::new(
      format!("Uninstalling plugin '{}'", options.name),
      |s: &mut PluginState<'_, '_>| {
        s.ctx.runner.run(
          "Uninstall plugin",
          s.package_manager,
          &[remove_verb(s.package_manager), options.name.as_str()],
          s.ctx.root(),
        )?;
        Ok(())
      },
    ))
    .add(Task::new(
      "Updating transaction log",
      |s: &mut PluginState<'_, '_>| {
        if !s.ctx.forget(ADD_PLUGIN.name, &options.name)? {
          warn!("No '{}' transaction recorded for '{}'.", ADD_PLUGIN.name, options.name);
        }
        Ok(())
      },
    ))
    .run(&mut state)
}
