use std::{
  future::Future,
  pin::Pin,
  sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type Task = Box<dyn FnOnce() -> TaskFuture + Send>;

struct QueuedTask {
  work: Task,
  done: oneshot::Sender<Result<()>>,
}

/// Serializes all peer-connection-mutating work.
///
/// At most one task is in flight; further submissions buffer FIFO and their
/// completions fire in submission order. A failed task does not drain the
/// queue, and tasks are not cancellable once dequeued.
pub struct ModificationQueue {
  tx: mpsc::UnboundedSender<QueuedTask>,
  closed: AtomicBool,
}

impl ModificationQueue {
  pub fn new() -> ModificationQueue {
    let (tx, mut rx) = mpsc::unbounded_channel::<QueuedTask>();
    tokio::spawn(async move {
      while let Some(task) = rx.recv().await {
        let result = (task.work)().await;
        if let Err(e) = &result {
          debug!("queued task failed: {:?}", e);
        }
        // The submitter may have gone away; the task still ran to completion.
        let _ = task.done.send(result);
      }
    });
    ModificationQueue {
      tx,
      closed: AtomicBool::new(false),
    }
  }

  /// Submit a task; the returned receiver resolves with its outcome.
  pub fn submit<F, Fut>(&self, work: F) -> Result<oneshot::Receiver<Result<()>>>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
  {
    if self.closed.load(Ordering::SeqCst) {
      return Err(anyhow!("modification queue is closed"));
    }
    let (done_tx, done_rx) = oneshot::channel();
    let task = QueuedTask {
      work: Box::new(move || Box::pin(work()) as TaskFuture),
      done: done_tx,
    };
    self
      .tx
      .send(task)
      .map_err(|_| anyhow!("modification queue worker is gone"))?;
    Ok(done_rx)
  }

  /// Submit a task and wait for its completion.
  pub async fn run<F, Fut>(&self, work: F) -> Result<()>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
  {
    self
      .submit(work)?
      .await
      .context("modification queue dropped the task")?
  }

  /// Stop accepting new tasks. Already queued work still runs.
  pub fn close(&self) {
    self.closed.store(true, Ordering::SeqCst);
  }
}

impl Default for ModificationQueue {
  fn default() -> ModificationQueue {
    ModificationQueue::new()
  }
}
