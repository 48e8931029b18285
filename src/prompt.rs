// src/prompt.rs
//! Turns parsed command-line arguments into operation parameters, asking for
//! whatever is missing unless running non-interactively.

use dialoguer::{theme::ColorfulTheme, Input, Select};
use log::debug;

use crate::cli::{ControllerArgs, NameArgs, ProjectArgs, ResourceArgs};
use crate::config::{
  validate_resource_name, MainConfig, ProjectType, ResourceKind, TransactionsDocument,
};
use crate::error::EpicError;
use crate::operations::plugin::PluginOptions;
use crate::operations::project::ProjectOptions;
use crate::operations::resource::{DeleteOptions, ResourceOptions, DEFAULT_TEMPLATE, NO_PARENT};
use crate::operations::{to_params, Context, Params};
use crate::utils;

pub struct Prompter {
  interactive: bool,
  theme: ColorfulTheme,
}

impl Prompter {
  pub fn new(interactive: bool) -> Self {
    Prompter {
      interactive,
      theme: ColorfulTheme::default(),
    }
  }

  fn text(&self, prompt: &str, default: Option<String>) -> Result<String, EpicError> {
    let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
    if let Some(default_val) = default {
      input = input.default(default_val);
    }
    Ok(input.interact_text()?)
  }

  fn resource_name(&self, prompt: &str) -> Result<String, EpicError> {
    Ok(
      Input::<String>::with_theme(&self.theme)
        .with_prompt(prompt)
        .validate_with(|input: &String| -> Result<(), String> {
          validate_resource_name(input).map_err(|e| e.to_string())
        })
        .interact_text()?,
    )
  }

  /// A value that has no default: asked for when interactive, an error otherwise.
  fn required_name(&self, given: Option<String>, kind: &str) -> Result<String, EpicError> {
    match given {
      Some(name) => Ok(name),
      None if self.interactive => self.resource_name(&format!("Name of the {}", kind)),
      None => Err(EpicError::InvalidName {
        name: String::new(),
        reason: format!("a {} name is required when running with --yes", kind),
      }),
    }
  }

  pub fn project(&self, args: ProjectArgs, ctx: &Context<'_>) -> Result<Params, EpicError> {
    let mut options = ProjectOptions {
      name: args.name,
      description: args.description,
      project_type: args.project_type,
      brand_name: args.brand_name,
      brand_country: args.brand_country,
      brand_address: args.brand_address,
    };

    if self.interactive {
      println!("Please provide the project details:");
      let current = ctx.store.load::<MainConfig>().ok();
      let current_name = current
        .as_ref()
        .map(|c| c.name.clone())
        .filter(|n| !n.is_empty())
        .or_else(|| utils::dir_name(ctx.root()));

      if options.name.is_none() {
        options.name = Some(self.text("Project name", current_name)?);
      }
      if options.description.is_none() {
        let default = current.as_ref().map(|c| c.description.clone());
        options.description = Some(self.text("Description", default)?);
      }
      if options.project_type.is_none() {
        let types = [ProjectType::Application, ProjectType::Plugin];
        let names: Vec<&str> = types.iter().map(ProjectType::as_str).collect();
        let selection = Select::with_theme(&self.theme)
          .with_prompt("Project type")
          .items(&names)
          .default(0)
          .interact()?;
        options.project_type = Some(types[selection]);
      }
      if options.brand_name.is_none() {
        options.brand_name = Some(self.text("Brand name", options.name.clone())?);
      }
      if options.brand_country.is_none() {
        options.brand_country = Some(self.text("Brand country", Some("N/A".to_string()))?);
      }
      if options.brand_address.is_none() {
        options.brand_address = Some(self.text("Brand address", Some("N/A".to_string()))?);
      }
    }

    to_params(&options)
  }

  pub fn resource(
    &self,
    kind: ResourceKind,
    args: ResourceArgs,
    parent: Option<String>,
    ctx: &Context<'_>,
  ) -> Result<Params, EpicError> {
    let name = self.required_name(args.name, kind.as_str())?;
    let template = match args.template {
      Some(template) => template,
      None if self.interactive => self.text("Template", Some(DEFAULT_TEMPLATE.to_string()))?,
      None => DEFAULT_TEMPLATE.to_string(),
    };

    let parent = match (kind, parent) {
      (ResourceKind::Controller, Some(parent)) => Some(parent),
      (ResourceKind::Controller, None) => {
        let last = ctx
          .store
          .load::<MainConfig>()
          .ok()
          .and_then(|c| c.last_access.controller)
          .unwrap_or_else(|| NO_PARENT.to_string());
        if self.interactive {
          Some(self.text("Parent controller", Some(last))?)
        } else {
          Some(last)
        }
      }
      _ => None,
    };

    to_params(&ResourceOptions {
      name,
      template,
      parent,
    })
  }

  pub fn controller(&self, args: ControllerArgs, ctx: &Context<'_>) -> Result<Params, EpicError> {
    self.resource(ResourceKind::Controller, args.resource, args.parent, ctx)
  }

  /// Offers the recorded resources of `kind` when no name was given.
  pub fn delete(
    &self,
    kind: ResourceKind,
    args: NameArgs,
    ctx: &Context<'_>,
  ) -> Result<Params, EpicError> {
    let name = match args.name {
      Some(name) => name,
      None if self.interactive => {
        let names: Vec<String> = ctx
          .store
          .load::<TransactionsDocument>()
          .map(|log| log.resources())
          .unwrap_or_default()
          .into_iter()
          .filter(|r| r.kind == kind)
          .map(|r| r.name)
          .collect();
        debug!("Recorded {}s: {:?}", kind.as_str(), names);
        if names.is_empty() {
          self.resource_name(&format!("Name of the {} to delete", kind.as_str()))?
        } else {
          let selection = Select::with_theme(&self.theme)
            .with_prompt(format!("Select a {} to delete", kind.as_str()))
            .items(&names)
            .default(0)
            .interact()?;
          names[selection].clone()
        }
      }
      None => self.required_name(None, kind.as_str())?,
    };
    to_params(&DeleteOptions { name })
  }

  pub fn plugin(&self, args: NameArgs) -> Result<Params, EpicError> {
    let name = match args.name {
      Some(name) => name,
      None if self.interactive => self.text("Plugin package", None)?,
      None => self.required_name(None, "plugin")?,
    };
    to_params(&PluginOptions { name })
  }
}
