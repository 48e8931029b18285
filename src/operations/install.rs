// src/operations/install.rs
use log::{error, info};

use crate::config::TransactionsDocument;
use crate::error::EpicError;
use crate::operations::{CommandMeta, Context, Params};
use crate::store::Document;

pub const INSTALL: CommandMeta = CommandMeta { name: "install" };

pub fn install_handler(ctx: &mut Context<'_>, _params: &Params) -> Result<(), EpicError> {
  install(ctx).map(|_| ())
}

/// Replays every recorded transaction, in log order, stopping at the first failure.
/// Returns the number of transactions replayed.
pub fn install(ctx: &mut Context<'_>) -> Result<usize, EpicError> {
  let log = ctx
    .store
    .load_strict::<TransactionsDocument>()?
    .ok_or(EpicError::MissingDocument(
      <TransactionsDocument as Document>::FILE,
    ))?;

  let total = log.transactions.len();
  info!("Replaying {} transactions...", total);

  let was_replaying = std::mem::replace(&mut ctx.replaying, true);
  let result = replay(ctx, &log);
  ctx.replaying = was_replaying;
  result?;

  info!("Replayed {} transactions.", total);
  Ok(total)
}

/// Later entries may depend on earlier ones (a child controller on its parent),
/// so the log order is kept and the log itself is never rewritten.
fn replay(ctx: &mut Context<'_>, log: &TransactionsDocument) -> Result<(), EpicError> {
  let total = log.transactions.len();
  for (i, transaction) in log.transactions.iter().enumerate() {
    let title = format!("{} {}", transaction.command, transaction.name().unwrap_or_default());
    info!("[{}/{}] Replaying '{}'", i + 1, total, title.trim_end());

    if let Err(e) = ctx.dispatch(&transaction.command, &transaction.params) {
      error!("Replay stopped at transaction {} of {}: {}", i + 1, total, e);
      return Err(e.in_step(title.trim_end()));
    }
  }
  Ok(())
}
