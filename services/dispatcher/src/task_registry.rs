//! Task Registry (§4.3): a process-wide table of live tasks keyed by a
//! monotonic task id, each with its own deadline timer.
//!
//! A single `tokio::sync::Mutex` guards the table so that a task's
//! completion and its deadline firing can never both succeed — whichever
//! side observes `state == Open` first wins and removes the entry, matching
//! §4.3's "completion must win the race" ordering rule.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

/// What the API connection handler receives once a task leaves `open`.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Completed normally; carries the full response body the worker sent
    /// (not including the HTTP prefix — that's the API handler's concern).
    Completed(Vec<u8>),
    /// The deadline fired before a worker reply completed the task.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Open,
    Completed,
    TimedOut,
    Cancelled,
}

struct TaskSlot {
    state: TaskState,
    expected_size: Option<u32>,
    buffer: Vec<u8>,
    responder: Option<oneshot::Sender<TaskOutcome>>,
}

struct Inner {
    next_id: u32,
    tasks: HashMap<u32, TaskSlot>,
}

/// A freshly allocated task: its id, and the channel the caller awaits for
/// the eventual outcome.
pub struct TaskHandle {
    pub id: u32,
    pub outcome: oneshot::Receiver<TaskOutcome>,
}

#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<Mutex<Inner>>,
    deadline: Duration,
}

impl TaskRegistry {
    pub fn new(deadline: Duration) -> Self {
        TaskRegistry {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                tasks: HashMap::new(),
            })),
            deadline,
        }
    }

    /// Allocates an id (wraps at 2³²), arms the deadline timer, and returns
    /// a handle. The id counter skips `0`, which is reserved for the
    /// no-reply admin control records (§4.6).
    pub async fn create(&self) -> TaskHandle {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut inner = self.inner.lock().await;
            let id = loop {
                let candidate = inner.next_id;
                inner.next_id = inner.next_id.wrapping_add(1);
                if candidate != 0 && !inner.tasks.contains_key(&candidate) {
                    break candidate;
                }
            };
            inner.tasks.insert(
                id,
                TaskSlot {
                    state: TaskState::Open,
                    expected_size: None,
                    buffer: Vec::new(),
                    responder: Some(tx),
                },
            );
            id
        };

        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(registry.deadline).await;
            registry.fire_deadline(id).await;
        });

        TaskHandle { id, outcome: rx }
    }

    async fn fire_deadline(&self, id: u32) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.tasks.get_mut(&id) {
            if slot.state == TaskState::Open {
                slot.state = TaskState::TimedOut;
                if let Some(responder) = slot.responder.take() {
                    let _ = responder.send(TaskOutcome::TimedOut);
                }
                inner.tasks.remove(&id);
            }
        }
    }

    /// Records the header-declared response size (§4.6: `Task.PrepareResponse(S)`).
    /// A no-op if the task is no longer open.
    pub async fn set_expected_size(&self, id: u32, size: u32) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.tasks.get_mut(&id) {
            if slot.state == TaskState::Open {
                slot.expected_size = Some(size);
            }
        }
    }

    /// Appends `bytes` to the task's response buffer. A no-op (returning
    /// `true` so the caller treats the body as "done") if the task has
    /// already left `open` — bytes belonging to a released task are simply
    /// discarded by the caller, per §4.6.
    pub async fn append_body(&self, id: u32, bytes: &[u8]) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(slot) = inner.tasks.get_mut(&id) else {
            return true;
        };
        if slot.state != TaskState::Open {
            return true;
        }
        slot.buffer.extend_from_slice(bytes);
        let done = slot.expected_size == Some(slot.buffer.len() as u32);
        if done {
            slot.state = TaskState::Completed;
            let body = std::mem::take(&mut slot.buffer);
            if let Some(responder) = slot.responder.take() {
                let _ = responder.send(TaskOutcome::Completed(body));
            }
            inner.tasks.remove(&id);
        }
        done
    }

    /// Cancels a task because its originating API connection closed before
    /// completion (§4.2). A no-op if the task already left `open`.
    pub async fn cancel(&self, id: u32) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.tasks.get_mut(&id) {
            if slot.state == TaskState::Open {
                slot.state = TaskState::Cancelled;
                slot.responder.take();
                inner.tasks.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_body_completes_when_buffer_reaches_expected_size() {
        let registry = TaskRegistry::new(Duration::from_secs(5));
        let handle = registry.create().await;
        registry.set_expected_size(handle.id, 5).await;
        assert!(!registry.append_body(handle.id, b"he").await);
        assert!(registry.append_body(handle.id, b"llo").await);
        match handle.outcome.await.unwrap() {
            TaskOutcome::Completed(body) => assert_eq!(body, b"hello"),
            TaskOutcome::TimedOut => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn deadline_fires_a_timeout_when_nothing_completes() {
        let registry = TaskRegistry::new(Duration::from_millis(10));
        let handle = registry.create().await;
        match handle.outcome.await.unwrap() {
            TaskOutcome::TimedOut => {}
            TaskOutcome::Completed(_) => panic!("expected timeout"),
        }
    }

    #[tokio::test]
    async fn completion_after_cancellation_is_a_no_op() {
        let registry = TaskRegistry::new(Duration::from_secs(5));
        let handle = registry.create().await;
        registry.cancel(handle.id).await;
        registry.set_expected_size(handle.id, 3).await;
        // append_body on a cancelled task reports "done" (discard) without
        // ever resolving the oneshot — the receiver observes a dropped sender.
        assert!(registry.append_body(handle.id, b"abc").await);
        assert!(handle.outcome.await.is_err());
    }

    #[tokio::test]
    async fn completion_wins_the_race_against_a_fired_deadline() {
        let registry = TaskRegistry::new(Duration::from_millis(20));
        let handle = registry.create().await;
        registry.set_expected_size(handle.id, 2).await;
        assert!(registry.append_body(handle.id, b"ok").await);
        // Give the deadline timer a chance to fire; it must observe the
        // task already removed and do nothing.
        tokio::time::sleep(Duration::from_millis(40)).await;
        match handle.outcome.await.unwrap() {
            TaskOutcome::Completed(body) => assert_eq!(body, b"ok"),
            TaskOutcome::TimedOut => panic!("completion should have won the race"),
        }
    }
}
