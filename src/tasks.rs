// src/tasks.rs
use log::{debug, error, info};

use crate::error::EpicError;

type Predicate<'a, C> = Box<dyn Fn(&C) -> bool + 'a>;
type SkipReason<'a, C> = Box<dyn Fn(&C) -> Option<String> + 'a>;
type Action<'a, C> = Box<dyn FnOnce(&mut C) -> Result<(), EpicError> + 'a>;

/// One titled step of an operation.
pub struct Task<'a, C> {
  title: String,
  enabled: Option<Predicate<'a, C>>,
  skip: Option<SkipReason<'a, C>>,
  action: Action<'a, C>,
}

impl<'a, C> Task<'a, C> {
  pub fn new<F>(title: impl Into<String>, action: F) -> Self
  where
    F: FnOnce(&mut C) -> Result<(), EpicError> + 'a,
  {
    Task {
      title: title.into(),
      enabled: None,
      skip: None,
      action: Box::new(action),
    }
  }

  /// The step only runs when `predicate` holds; otherwise it is passed over silently.
  pub fn enabled<P>(mut self, predicate: P) -> Self
  where
    P: Fn(&C) -> bool + 'a,
  {
    self.enabled = Some(Box::new(predicate));
    self
  }

  /// The step is skipped, with the returned reason logged, when `reason` yields `Some`.
  pub fn skip<S>(mut self, reason: S) -> Self
  where
    S: Fn(&C) -> Option<String> + 'a,
  {
    self.skip = Some(Box::new(reason));
    self
  }
}

/// Ordered steps sharing a context `C`. The first failure stops the list.
pub struct TaskList<'a, C> {
  name: String,
  tasks: Vec<Task<'a, C>>,
}

impl<'a, C> TaskList<'a, C> {
  pub fn new(name: impl Into<String>) -> Self {
    TaskList {
      name: name.into(),
      tasks: Vec::new(),
    }
  }

  pub fn add(mut self, task: Task<'a, C>) -> Self {
    self.tasks.push(task);
    self
  }

  pub fn run(self, ctx: &mut C) -> Result<(), EpicError> {
    let total_steps = self.tasks.len();
    info!("--- Running {} ---", self.name);

    for (i, task) in self.tasks.into_iter().enumerate() {
      let step_num = i + 1;

      if let Some(enabled) = &task.enabled {
        if !enabled(ctx) {
          debug!("[{}/{}] '{}' not enabled.", step_num, total_steps, task.title);
          continue;
        }
      }
      if let Some(skip) = &task.skip {
        if let Some(reason) = skip(ctx) {
          info!(
            "[{}/{}] Skipping '{}': {}",
            step_num, total_steps, task.title, reason
          );
          continue;
        }
      }

      info!("[{}/{}] {}...", step_num, total_steps, task.title);
      if let Err(e) = (task.action)(ctx) {
        error!("Step '{}' failed: {}", task.title, e);
        return Err(e.in_step(&task.title));
      }
    }

    info!("--- Finished {} ---", self.name);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct Ctx {
    log: Vec<&'static str>,
    flag: bool,
  }

  #[test]
  fn test_runs_in_order_and_shares_context() {
    let mut ctx = Ctx::default();
    TaskList::new("test")
      .add(Task::new("one", |c: &mut Ctx| {
        c.log.push("one");
        c.flag = true;
        Ok(())
      }))
      .add(
        Task::new("two", |c: &mut Ctx| {
          c.log.push("two");
          Ok(())
        })
        .enabled(|c: &Ctx| c.flag),
      )
      .run(&mut ctx)
      .unwrap();
    assert_eq!(ctx.log, vec!["one", "two"]);
  }

  #[test]
  fn test_disabled_and_skipped_steps_do_not_run() {
    let mut ctx = Ctx::default();
    TaskList::new("test")
      .add(
        Task::new("disabled", |c: &mut Ctx| {
          c.log.push("disabled");
          Ok(())
        })
        .enabled(|c: &Ctx| c.flag),
      )
      .add(
        Task::new("skipped", |c: &mut Ctx| {
          c.log.push("skipped");
          Ok(())
        })
        .skip(|_: &Ctx| Some("not needed".to_string())),
      )
      .add(Task::new("last", |c: &mut Ctx| {
        c.log.push("last");
        Ok(())
      }))
      .run(&mut ctx)
      .unwrap();
    assert_eq!(ctx.log, vec!["last"]);
  }

  #[test]
  fn test_failure_aborts_remaining_steps_with_title() {
    let mut ctx = Ctx::default();
    let err = TaskList::new("test")
      .add(Task::new("first", |c: &mut Ctx| {
        c.log.push("first");
        Ok(())
      }))
      .add(Task::new("breaks", |_: &mut Ctx| {
        Err(EpicError::Render("bad".to_string()))
      }))
      .add(Task::new("never", |c: &mut Ctx| {
        c.log.push("never");
        Ok(())
      }))
      .run(&mut ctx)
      .unwrap_err();

    assert_eq!(ctx.log, vec!["first"]);
    match err {
      EpicError::Step { step, source } => {
        assert_eq!(step, "breaks");
        assert!(matches!(*source, EpicError::Render(_)));
      }
      other => panic!("unexpected error: {}", other),
    }
  }
}
