// src/list.rs
use crate::config::{ResourceKind, TransactionsDocument};
use crate::error::EpicError;
use crate::operations::plugin::ADD_PLUGIN;
use crate::store::ConfigStore;
use log::{debug, warn};

/// One printed row: name, kind, detail.
fn rows(log: &TransactionsDocument) -> Vec<(String, &'static str, String)> {
  let mut rows: Vec<(String, &'static str, String)> = log
    .resources()
    .into_iter()
    .map(|resource| {
      let detail = match (resource.kind, resource.parent) {
        (ResourceKind::Controller, Some(parent)) => format!("parent: {}", parent),
        _ => String::new(),
      };
      (resource.name, resource.kind.as_str(), detail)
    })
    .collect();

  rows.extend(
    log
      .transactions
      .iter()
      .filter(|t| t.command == ADD_PLUGIN.name)
      .filter_map(|t| t.name())
      .map(|name| (name.to_string(), "plugin", String::new())),
  );
  rows
}

pub fn run_list(store: &ConfigStore) -> Result<(), EpicError> {
  println!("Generated Resources:");
  println!("{:<25} | {:<15} | {}", "Name", "Kind", "Details");
  println!("{:-<25}-+-{:-<15}-+-{:-<50}", "", "", ""); // Separator

  let log = match store.load_strict::<TransactionsDocument>()? {
    Some(log) => log,
    None => {
      warn!(
        "No transaction log found in {}; nothing has been generated yet.",
        store.root().display()
      );
      return Ok(());
    }
  };
  debug!("Listing {} transactions", log.transactions.len());

  for (name, kind, detail) in rows(&log) {
    println!("{:<25} | {:<15} | {}", name, kind, detail);
  }

  Ok(())
}
