// src/utils.rs
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use log::{debug, trace, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use walkdir::WalkDir;

use crate::error::EpicError;

/// Recursively copies `source` into `target`, skipping any entry whose file name is in `exclude`.
/// Existing files in `target` are overwritten. Returns the number of files copied.
pub fn copy_dir(source: &Path, target: &Path, exclude: &[&str]) -> Result<u64, EpicError> {
  debug!("Copying {} to {}", source.display(), target.display());
  fs::create_dir_all(target)?;

  let mut copied: u64 = 0;
  let mut walker = WalkDir::new(source).into_iter();
  loop {
    let entry = match walker.next() {
      Some(Ok(e)) => e,
      Some(Err(walk_err)) => {
        return Err(EpicError::WalkDirError {
          path: source.to_path_buf(),
          source: walk_err,
        })
      }
      None => break,
    };

    let current_path = entry.path();
    if current_path == source {
      continue;
    }

    if let Some(entry_name) = current_path.file_name().and_then(|n| n.to_str()) {
      if exclude.contains(&entry_name) {
        trace!("Excluding '{}'", current_path.display());
        if entry.file_type().is_dir() {
          walker.skip_current_dir();
        }
        continue;
      }
    }

    let relative_path = match current_path.strip_prefix(source) {
      Ok(p) => p,
      Err(e) => {
        warn!(
          "Failed to strip prefix {} from {}: {}. Skipping.",
          source.display(),
          current_path.display(),
          e
        );
        continue;
      }
    };
    let output_path = target.join(relative_path);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&output_path)?;
    } else if entry.file_type().is_file() {
      if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
      }
      trace!("Copying file to: {}", output_path.display());
      fs::copy(current_path, &output_path)?;
      copied += 1;
    } else {
      debug!(
        "Skipping non-file/non-directory entry: {}",
        current_path.display()
      );
    }
  }

  debug!("Copied {} files", copied);
  Ok(copied)
}

/// Recursively deletes a directory. A missing directory is not an error.
pub fn remove_dir(path: &Path) -> Result<(), EpicError> {
  match fs::remove_dir_all(path) {
    Ok(()) => {
      debug!("Removed {}", path.display());
      Ok(())
    }
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
    Err(e) => Err(EpicError::Io(e)),
  }
}

/// Random alphanumeric string, used for encryption keys.
pub fn generate_random_key(length: usize) -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(length)
    .map(char::from)
    .collect()
}

/// Path from `dir` back up to `root`, e.g. `src/controllers` -> `../..`.
/// `dir` is taken relative to `root` and may leave it (`../shared/controllers`).
pub fn relative_root_path(root: &Path, dir: &Path) -> String {
  let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
  let base = normalized_components(&root);
  let target = normalized_components(&root.join(dir));

  let common = base
    .iter()
    .zip(&target)
    .take_while(|(a, b)| a == b)
    .count();
  let mut parts = vec!["..".to_string(); target.len() - common];
  parts.extend(base[common..].iter().cloned());
  if parts.is_empty() {
    return ".".to_string();
  }
  parts.join("/")
}

/// Lexically resolves `.` and `..`.
fn normalized_components(path: &Path) -> Vec<String> {
  let mut parts: Vec<String> = Vec::new();
  for component in path.components() {
    match component {
      Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
      Component::ParentDir => {
        parts.pop();
      }
      Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
    }
  }
  parts
}

/// Name of the directory itself, falling back to the canonical path when `path` is `.`.
pub fn dir_name(path: &Path) -> Option<String> {
  let resolved: PathBuf = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
  resolved
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn test_copy_dir_skips_excluded_entries() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    fs::create_dir_all(src.path().join(".git/objects")).unwrap();
    fs::write(src.path().join(".git/HEAD"), "ref").unwrap();
    fs::create_dir_all(src.path().join("src/controllers")).unwrap();
    fs::write(src.path().join("src/controllers/index.ts"), "root").unwrap();
    fs::write(src.path().join("package.json"), "{}").unwrap();

    let copied = copy_dir(src.path(), dst.path(), &[".git"]).unwrap();

    assert_eq!(copied, 2);
    assert!(dst.path().join("src/controllers/index.ts").is_file());
    assert!(dst.path().join("package.json").is_file());
    assert!(!dst.path().join(".git").exists());
  }

  #[test]
  fn test_copy_dir_overwrites_existing_files() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), "new").unwrap();
    fs::write(dst.path().join("a.txt"), "old").unwrap();
    fs::write(dst.path().join("keep.txt"), "kept").unwrap();

    copy_dir(src.path(), dst.path(), &[]).unwrap();

    assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "new");
    assert!(dst.path().join("keep.txt").is_file());
  }

  #[test]
  fn test_remove_dir_tolerates_missing() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("nested");
    fs::create_dir_all(target.join("deeper")).unwrap();
    remove_dir(&target).unwrap();
    assert!(!target.exists());
    remove_dir(&target).unwrap();
  }

  #[test]
  fn test_generate_random_key() {
    let key = generate_random_key(32);
    assert_eq!(key.len(), 32);
    assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(key, generate_random_key(32));
  }

  #[test]
  fn test_relative_root_path() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    assert_eq!(relative_root_path(root, Path::new("src/controllers")), "../..");
    assert_eq!(relative_root_path(root, Path::new("./models")), "..");
    assert_eq!(relative_root_path(root, Path::new("")), ".");
    assert_eq!(relative_root_path(root, Path::new("src/../lib")), "..");
  }

  #[test]
  fn test_relative_root_path_outside_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("app");
    fs::create_dir_all(&root).unwrap();
    assert_eq!(
      relative_root_path(&root, Path::new("../shared/controllers")),
      "../../app"
    );
  }
}
