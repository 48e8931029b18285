// src/render.rs
//! Literal placeholder substitution plus named injection points.
//!
//! An injection point is a line whose trimmed text is `// @epic:<point>`. Content injected
//! into a point lands on its own line just above the marker, so the marker stays available
//! for later operations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, trace};

use crate::config::ResourceKind;
use crate::error::EpicError;

const MARKER_PREFIX: &str = "// @epic:";

/// Placeholder string -> replacement.
pub type Substitutions = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
  pub point: String,
  pub content: String,
}

impl Injection {
  pub fn new(point: impl Into<String>, content: impl Into<String>) -> Self {
    Injection {
      point: point.into(),
      content: content.into(),
    }
  }
}

/// Built-in templates, used when the project does not ship its own.
fn builtin_template(kind: ResourceKind, template: &str) -> Option<&'static str> {
  match (kind, template) {
    (ResourceKind::Controller, "blank") => Some(include_str!("../templates/controller/blank.ts")),
    (ResourceKind::Controller, "crud") => Some(include_str!("../templates/controller/crud.ts")),
    (ResourceKind::Model, "blank") => Some(include_str!("../templates/model/blank.ts")),
    (ResourceKind::Middleware, "blank") => Some(include_str!("../templates/middleware/blank.ts")),
    _ => None,
  }
}

/// Reads `<templates_dir>/<kind>/<template>.ts`, falling back to the built-in copy.
pub fn load_template(
  templates_dir: &Path,
  kind: ResourceKind,
  template: &str,
) -> Result<String, EpicError> {
  let path = templates_dir
    .join(kind.as_str())
    .join(format!("{}.ts", template));
  if path.is_file() {
    debug!("Using project template {}", path.display());
    return Ok(fs::read_to_string(&path)?);
  }
  builtin_template(kind, template)
    .map(str::to_string)
    .ok_or_else(|| {
      EpicError::Render(format!(
        "No '{}' template named '{}' (looked in {})",
        kind.as_str(),
        template,
        path.display()
      ))
    })
}

/// Applies substitutions, then injections.
pub fn render(
  template: &str,
  substitutions: &Substitutions,
  injections: &[Injection],
) -> Result<String, EpicError> {
  let mut content = substitute_content(template, substitutions);
  for injection in injections {
    content = inject(&content, injection)?;
  }
  Ok(content)
}

pub fn substitute_content(content: &str, substitutions: &Substitutions) -> String {
  let mut current_content = content.to_string();
  for (placeholder, value) in substitutions {
    current_content = current_content.replace(placeholder, value);
  }
  current_content
}

/// Inserts `injection.content` above its marker. Already-present content is left alone.
pub fn inject(content: &str, injection: &Injection) -> Result<String, EpicError> {
  let marker = format!("{}{}", MARKER_PREFIX, injection.point);
  let lines: Vec<&str> = content.lines().collect();
  let marker_index = lines
    .iter()
    .position(|line| line.trim() == marker)
    .ok_or_else(|| {
      EpicError::Render(format!("injection point '{}' not found", injection.point))
    })?;

  let indent: String = lines[marker_index]
    .chars()
    .take_while(|c| c.is_whitespace())
    .collect();
  let wanted = injection.content.trim();

  // Already injected somewhere in the block directly above the marker.
  let already_present = lines[..marker_index]
    .iter()
    .rev()
    .take_while(|line| !line.trim().is_empty() && !line.trim().starts_with(MARKER_PREFIX))
    .any(|line| line.trim() == wanted);
  if already_present {
    trace!("Injection into '{}' already present", injection.point);
    return Ok(content.to_string());
  }

  let mut output = Vec::with_capacity(lines.len() + 1);
  output.extend(lines[..marker_index].iter().map(|l| l.to_string()));
  output.push(format!("{}{}", indent, wanted));
  output.extend(lines[marker_index..].iter().map(|l| l.to_string()));

  let mut rendered = output.join("\n");
  if content.ends_with('\n') {
    rendered.push('\n');
  }
  Ok(rendered)
}

/// Drops every line that is exactly `injected` (ignoring indentation), returning the new
/// text and the number of lines removed.
pub fn remove_injected(content: &str, injected: &str) -> (String, usize) {
  let wanted = injected.trim();
  let mut removed = 0;
  let kept: Vec<&str> = content
    .lines()
    .filter(|line| {
      let hit = line.trim() == wanted;
      if hit {
        removed += 1;
      }
      !hit
    })
    .collect();
  let mut rendered = kept.join("\n");
  if content.ends_with('\n') && !rendered.is_empty() {
    rendered.push('\n');
  }
  (rendered, removed)
}

/// Renders a template file to `output`, creating parent directories.
pub fn render_to_file(
  template: &str,
  output: &Path,
  substitutions: &Substitutions,
  injections: &[Injection],
) -> Result<(), EpicError> {
  let rendered = render(template, substitutions, injections)?;
  if let Some(parent) = output.parent() {
    fs::create_dir_all(parent)?;
  }
  trace!("Writing rendered file to: {}", output.display());
  fs::write(output, rendered)?;
  Ok(())
}

/// Injects into an existing file in place.
pub fn inject_file(path: &Path, injections: &[Injection]) -> Result<(), EpicError> {
  let content = fs::read_to_string(path).map_err(|e| {
    EpicError::Render(format!("cannot read '{}': {}", path.display(), e))
  })?;
  let rendered = render(&content, &Substitutions::new(), injections)?;
  if rendered != content {
    fs::write(path, rendered)?;
    debug!("Updated injection points in {}", path.display());
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const PARENT: &str = "import { Controller } from \"../core.ts\";\n// @epic:imports\n\nexport default {\n  childs: [\n    // @epic:children\n  ],\n};\n";

  #[test]
  fn test_substitute_content_replaces_every_occurrence() {
    let mut subs = Substitutions::new();
    subs.insert("__NAME__".to_string(), "users".to_string());
    subs.insert("__PASCAL_NAME__".to_string(), "Users".to_string());
    let out = substitute_content("__PASCAL_NAME__ at /__NAME__/ (__NAME__)", &subs);
    assert_eq!(out, "Users at /users/ (users)");
  }

  #[test]
  fn test_inject_keeps_indentation_and_marker() {
    let out = inject(PARENT, &Injection::new("children", "UsersController,")).unwrap();
    assert!(out.contains("    UsersController,\n    // @epic:children\n"));
    assert!(out.ends_with("};\n"));
  }

  #[test]
  fn test_inject_is_idempotent() {
    let injection = Injection::new("imports", "import UsersController from \"./users.ts\";");
    let once = inject(PARENT, &injection).unwrap();
    let twice = inject(&once, &injection).unwrap();
    assert_eq!(once, twice);
  }

  #[test]
  fn test_inject_appends_in_call_order() {
    let first = inject(PARENT, &Injection::new("children", "AController,")).unwrap();
    let second = inject(&first, &Injection::new("children", "BController,")).unwrap();
    let a = second.find("AController").unwrap();
    let b = second.find("BController").unwrap();
    assert!(a < b);
  }

  #[test]
  fn test_inject_missing_point_is_an_error() {
    let err = inject("no markers here", &Injection::new("imports", "x")).unwrap_err();
    assert!(matches!(err, EpicError::Render(_)));
  }

  #[test]
  fn test_remove_injected() {
    let injected = inject(PARENT, &Injection::new("children", "UsersController,")).unwrap();
    let (out, removed) = remove_injected(&injected, "UsersController,");
    assert_eq!(removed, 1);
    assert_eq!(out, PARENT);

    let (untouched, removed) = remove_injected(&injected, "Users,");
    assert_eq!(removed, 0);
    assert_eq!(untouched, injected);
  }

  #[test]
  fn test_load_template_falls_back_to_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let builtin = load_template(dir.path(), ResourceKind::Controller, "blank").unwrap();
    assert!(builtin.contains("__PASCAL_NAME__"));

    fs::create_dir_all(dir.path().join("controller")).unwrap();
    fs::write(dir.path().join("controller/blank.ts"), "custom __NAME__").unwrap();
    let custom = load_template(dir.path(), ResourceKind::Controller, "blank").unwrap();
    assert_eq!(custom, "custom __NAME__");

    assert!(load_template(dir.path(), ResourceKind::Model, "missing").is_err());
  }
}
