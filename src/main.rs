// src/main.rs
mod cli;
mod config;
mod error;
mod list;
mod manifest;
mod operations;
mod process;
mod prompt;
mod render;
mod store;
mod tasks;
mod utils;

use clap::Parser;
use cli::{Cli, Commands};
use config::ResourceKind;
use error::EpicError;
use log::LevelFilter;
use operations::{install, plugin, project, resource, Context, Params, Settings};
use process::DuctRunner;
use prompt::Prompter;
use store::ConfigStore;

fn main() -> Result<(), EpicError> {
  let cli = Cli::parse();

  // Setup logging based on verbosity
  let log_level = match cli.verbose {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  env_logger::Builder::new().filter_level(log_level).init();

  log::debug!("CLI args: {:?}", cli);

  let mut settings = Settings::default();
  if let Some(repo) = cli.template_repo {
    settings.template_repo = repo;
  }
  log::debug!("Project root: {}", cli.root.display());

  let runner = DuctRunner;
  let mut ctx = Context::new(ConfigStore::new(cli.root), &runner, settings);
  log::trace!(
    "Registered commands: {}",
    ctx.registry.names().collect::<Vec<_>>().join(", ")
  );

  let prompter = Prompter::new(!cli.yes);
  let (command, params): (&str, Params) = match cli.command {
    Commands::List => return list::run_list(&ctx.store),
    Commands::Install => (install::INSTALL.name, Params::new()),
    Commands::Initialize(args) => (project::INITIALIZE.name, prompter.project(args, &ctx)?),
    Commands::CreateProject(args) => (project::CREATE_PROJECT.name, prompter.project(args, &ctx)?),
    Commands::CreateController(args) => {
      (resource::CREATE_CONTROLLER.name, prompter.controller(args, &ctx)?)
    }
    Commands::CreateModel(args) => (
      resource::CREATE_MODEL.name,
      prompter.resource(ResourceKind::Model, args, None, &ctx)?,
    ),
    Commands::CreateMiddleware(args) => (
      resource::CREATE_MIDDLEWARE.name,
      prompter.resource(ResourceKind::Middleware, args, None, &ctx)?,
    ),
    Commands::DeleteController(args) => (
      resource::DELETE_CONTROLLER.name,
      prompter.delete(ResourceKind::Controller, args, &ctx)?,
    ),
    Commands::DeleteModel(args) => (
      resource::DELETE_MODEL.name,
      prompter.delete(ResourceKind::Model, args, &ctx)?,
    ),
    Commands::DeleteMiddleware(args) => (
      resource::DELETE_MIDDLEWARE.name,
      prompter.delete(ResourceKind::Middleware, args, &ctx)?,
    ),
    Commands::AddPlugin(args) => (plugin::ADD_PLUGIN.name, prompter.plugin(args)?),
    Commands::RemovePlugin(args) => (plugin::REMOVE_PLUGIN.name, prompter.plugin(args)?),
  };

  if let Err(e) = ctx.dispatch(command, &params) {
    log::debug!("Root cause: {:?}", e.root());
    return Err(e);
  }
  log::info!("'{}' completed.", command);
  Ok(())
}
