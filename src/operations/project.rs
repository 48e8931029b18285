// src/operations/project.rs
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::config::{Brand, MainConfig, ProjectType, TransactionsDocument, CONFIG_VERSION};
use crate::error::EpicError;
use crate::manifest;
use crate::operations::{
  from_params, to_params, CommandMeta, Context, Params, FALLBACK_PACKAGE_MANAGER,
  PRIMARY_PACKAGE_MANAGER,
};
use crate::store::Document;
use crate::tasks::{Task, TaskList};
use crate::utils;

pub const INITIALIZE: CommandMeta = CommandMeta { name: "initialize" };
pub const CREATE_PROJECT: CommandMeta = CommandMeta {
  name: "create-project",
};

const DEFAULT_PROJECT_NAME: &str = "epic-project";
const UNSET_BRAND_FIELD: &str = "N/A";

/// Project identity. Unset fields are defaulted when the configuration is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOptions {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub project_type: Option<ProjectType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brand_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brand_country: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brand_address: Option<String>,
}

impl ProjectOptions {
  /// Overwrites the identity fields of `config`. The brand is replaced as a whole.
  fn apply(&self, config: &mut MainConfig, fallback_name: &str) {
    let name = self
      .name
      .clone()
      .filter(|n| !n.trim().is_empty())
      .unwrap_or_else(|| fallback_name.to_string());

    config.version = CONFIG_VERSION;
    config.project_type = self.project_type.unwrap_or_default();
    config.description = self.description.clone().unwrap_or_default();
    config.brand = Brand {
      name: self.brand_name.clone().unwrap_or_else(|| name.clone()),
      country: self
        .brand_country
        .clone()
        .unwrap_or_else(|| UNSET_BRAND_FIELD.to_string()),
      address: self
        .brand_address
        .clone()
        .unwrap_or_else(|| UNSET_BRAND_FIELD.to_string()),
    };
    config.name = name;
  }
}

pub fn initialize_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options: ProjectOptions = from_params(INITIALIZE.name, params)?;
  initialize(ctx, &options)
}

pub fn create_handler(ctx: &mut Context<'_>, params: &Params) -> Result<(), EpicError> {
  let options: ProjectOptions = from_params(CREATE_PROJECT.name, params)?;
  create(ctx, options)
}

/// Writes the `main` configuration and, when a package.json is present, re-derives it.
pub fn initialize(ctx: &mut Context<'_>, options: &ProjectOptions) -> Result<(), EpicError> {
  let fallback_name =
    utils::dir_name(ctx.root()).unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

  TaskList::new("initialize")
    .add(Task::new(
      "Writing project configuration",
      |ctx: &mut Context<'_>| {
        ctx.store.update::<MainConfig, _>(|config| {
          options.apply(config, &fallback_name);
          Ok(())
        })?;
        Ok(())
      },
    ))
    .add(
      Task::new("Configuring package manifest", |ctx: &mut Context<'_>| {
        configure_manifest(ctx)
      })
      .enabled(|ctx: &Context<'_>| manifest::has_manifest(ctx.root())),
    )
    .run(ctx)
}

fn configure_manifest(ctx: &Context<'_>) -> Result<(), EpicError> {
  let config = ctx.require_main()?;
  manifest::rewrite_manifest(ctx.root(), &config)?;
  manifest::write_env_files(ctx.root())?;
  Ok(())
}

struct CreateState<'c, 'a> {
  ctx: &'c mut Context<'a>,
  options: ProjectOptions,
  config: Option<MainConfig>,
  primary_unavailable: bool,
}

impl CreateState<'_, '_> {
  /// Puts the captured configuration back on disk.
  fn restore_config(&self) -> Result<(), EpicError> {
    match &self.config {
      Some(config) => self.ctx.store.save(config),
      None => Ok(()),
    }
  }
}

/// Clones the template into the project root and installs its dependencies.
pub fn create(ctx: &mut Context<'_>, options: ProjectOptions) -> Result<(), EpicError> {
  let mut state = CreateState {
    ctx,
    options,
    config: None,
    primary_unavailable: false,
  };

  TaskList::new("create-project")
    .add(Task::new(
      "Preparing project configuration",
      |s: &mut CreateState<'_, '_>| {
        if !s.ctx.store.has::<MainConfig>() {
          info!("No project configuration found, initializing first.");
          let params = to_params(&s.options)?;
          s.ctx.dispatch(INITIALIZE.name, &params)?;
        }
        s.config = Some(s.ctx.require_main()?);
        // Cloning replaces the working tree; the configuration is written back afterwards.
        s.ctx.store.delete::<MainConfig>()
      },
    ))
    .add(Task::new(
      "Cloning template repository",
      |s: &mut CreateState<'_, '_>| {
        if let Err(e) = clone_template(s.ctx) {
          warn!("Cloning failed, restoring project configuration before aborting.");
          if let Err(restore_err) = s.restore_config() {
            warn!("Could not restore project configuration: {}", restore_err);
          }
          return Err(e);
        }
        Ok(())
      },
    ))
    .add(Task::new(
      "Restoring project configuration",
      |s: &mut CreateState<'_, '_>| s.restore_config(),
    ))
    .add(Task::new(
      "Configuring package manifest",
      |s: &mut CreateState<'_, '_>| {
        if !manifest::has_manifest(s.ctx.root()) {
          return Err(EpicError::ManifestNotFound(s.ctx.root().to_path_buf()));
        }
        configure_manifest(s.ctx)
      },
    ))
    .add(Task::new(
      "Checking package manager",
      |s: &mut CreateState<'_, '_>| {
        s.primary_unavailable = !s.ctx.runner.is_available(PRIMARY_PACKAGE_MANAGER);
        if s.primary_unavailable {
          warn!(
            "'{}' is not available, falling back to '{}'.",
            PRIMARY_PACKAGE_MANAGER, FALLBACK_PACKAGE_MANAGER
          );
        }
        Ok(())
      },
    ))
    .add(
      Task::new(
        format!("Installing dependencies with {}", PRIMARY_PACKAGE_MANAGER),
        |s: &mut CreateState<'_, '_>| install_dependencies(s.ctx, PRIMARY_PACKAGE_MANAGER),
      )
      .skip(|s: &CreateState<'_, '_>| {
        s.primary_unavailable
          .then(|| format!("{} is not available", PRIMARY_PACKAGE_MANAGER))
      }),
    )
    .add(
      Task::new(
        format!("Installing dependencies with {}", FALLBACK_PACKAGE_MANAGER),
        |s: &mut CreateState<'_, '_>| install_dependencies(s.ctx, FALLBACK_PACKAGE_MANAGER),
      )
      .enabled(|s: &CreateState<'_, '_>| s.primary_unavailable),
    )
    .run(&mut state)
}

fn clone_template(ctx: &Context<'_>) -> Result<(), EpicError> {
  let temp_dir = Builder::new().prefix("epic_template_").tempdir()?;
  let checkout = temp_dir.path().join("template");
  let checkout_str = checkout.to_string_lossy().to_string();

  ctx.runner.run(
    "Clone template",
    "git",
    &[
      "clone",
      "--depth",
      "1",
      ctx.settings.template_repo.as_str(),
      checkout_str.as_str(),
    ],
    ctx.root(),
  )?;

  utils::remove_dir(&checkout.join(".git"))?;
  // The project's own documents survive the copy.
  let copied = utils::copy_dir(
    &checkout,
    ctx.root(),
    &[<MainConfig as Document>::FILE, <TransactionsDocument as Document>::FILE],
  )?;
  info!("Copied {} template files", copied);

  ctx
    .runner
    .run("Initialize git repository", "git", &["init"], ctx.root())?;
  Ok(())
}

fn install_dependencies(ctx: &Context<'_>, package_manager: &str) -> Result<(), EpicError> {
  ctx
    .runner
    .run("Install dependencies", package_manager, &["install"], ctx.root())?;
  Ok(())
}
