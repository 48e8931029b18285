// src/cli.rs
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ProjectType;

#[derive(Parser, Debug)]
#[command(
    name = "epic",
    author,
    version,
    about = "Scaffolds web-application projects and replays their recorded operations.",
    long_about = None
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  /// Increase verbosity level (e.g., -v, -vv)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  pub verbose: u8,

  /// Project root holding epic.config.json
  #[arg(long, global = true, default_value = ".")]
  #[clap(env = "EPIC_PROJECT_ROOT")]
  pub root: PathBuf,

  /// Git repository cloned by create-project
  #[arg(long, global = true)]
  #[clap(env = "EPIC_TEMPLATE_REPO")]
  pub template_repo: Option<String>,

  /// Never prompt; missing values fall back to their defaults
  #[arg(short = 'y', long, global = true)]
  pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Write or update the project configuration in the current project
  Initialize(ProjectArgs),
  /// Create a new project from the template repository
  #[command(name = "create-project", long_flag = "init")]
  CreateProject(ProjectArgs),
  /// Generate a controller and register it with its parent
  CreateController(ControllerArgs),
  /// Generate a model and add it to the model registry
  CreateModel(ResourceArgs),
  /// Generate a middleware and add it to the middleware registry
  CreateMiddleware(ResourceArgs),
  /// Delete a generated controller
  DeleteController(NameArgs),
  /// Delete a generated model
  DeleteModel(NameArgs),
  /// Delete a generated middleware
  DeleteMiddleware(NameArgs),
  /// Install a plugin package
  AddPlugin(NameArgs),
  /// Uninstall a plugin package
  RemovePlugin(NameArgs),
  /// Replay every recorded transaction
  Install,
  /// List generated resources
  List,
}

#[derive(Args, Debug, Default)]
pub struct ProjectArgs {
  /// Project name
  #[arg(short, long)]
  pub name: Option<String>,

  #[arg(short, long)]
  pub description: Option<String>,

  #[arg(short = 't', long = "type", value_enum)]
  pub project_type: Option<ProjectType>,

  #[arg(long)]
  pub brand_name: Option<String>,

  #[arg(long)]
  pub brand_country: Option<String>,

  #[arg(long)]
  pub brand_address: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ResourceArgs {
  /// Resource name (e.g., users)
  pub name: Option<String>,

  /// Template to render (e.g., blank, crud)
  #[arg(short, long)]
  pub template: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ControllerArgs {
  #[command(flatten)]
  pub resource: ResourceArgs,

  /// Parent controller, or "None" for the root
  #[arg(short, long)]
  pub parent: Option<String>,
}

#[derive(Args, Debug)]
pub struct NameArgs {
  pub name: Option<String>,
}
