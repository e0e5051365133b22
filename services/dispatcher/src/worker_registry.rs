//! Worker Registry (§4.4): the set of currently attached workers, the
//! round-robin dispatch cursor, and the credential pool workers borrow from.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::credential_pool::{Credential, CredentialPool};

/// A frame queued to a worker's writer task; see `worker_handler`.
pub type WorkerFrame = Vec<u8>;
pub type WorkerSender = mpsc::UnboundedSender<WorkerFrame>;
pub type SharedWorkerRegistry = Arc<Mutex<WorkerRegistry>>;

struct WorkerEntry {
    uid: u64,
    addr: SocketAddr,
    tx: WorkerSender,
}

pub struct WorkerRegistry {
    workers: Vec<WorkerEntry>,
    cursor: usize,
    next_uid: u64,
    credentials: CredentialPool,
}

impl WorkerRegistry {
    pub fn new(credentials: CredentialPool) -> Self {
        WorkerRegistry {
            workers: Vec::new(),
            cursor: 0,
            next_uid: 1,
            credentials,
        }
    }

    /// Appends a newly handshaken worker, returning its dispatcher-assigned uid.
    pub fn subscribe(&mut self, addr: SocketAddr, tx: WorkerSender) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        self.workers.push(WorkerEntry { uid, addr, tx });
        uid
    }

    /// Removes a worker by uid. Resets the cursor to 0 if it had reached the
    /// old worker count, per §4.4's wraparound rule.
    pub fn unsubscribe(&mut self, uid: u64) {
        if let Some(pos) = self.workers.iter().position(|w| w.uid == uid) {
            self.workers.remove(pos);
        }
        if self.cursor >= self.workers.len() {
            self.cursor = 0;
        }
    }

    pub fn has_available(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Advances the cursor then returns the worker now under it, modulo the
    /// current worker count.
    pub fn next_available(&mut self) -> Option<(u64, WorkerSender)> {
        if self.workers.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.workers.len();
        self.workers
            .get(self.cursor)
            .map(|w| (w.uid, w.tx.clone()))
    }

    /// Bounds-checked positional accessor for the admin routes.
    pub fn sender_at(&self, index: usize) -> Option<(u64, WorkerSender)> {
        self.workers.get(index).map(|w| (w.uid, w.tx.clone()))
    }

    /// A snapshot of `(uid, addr)` in insertion order, for `/server/status`.
    pub fn snapshot(&self) -> Vec<(u64, SocketAddr)> {
        self.workers.iter().map(|w| (w.uid, w.addr)).collect()
    }

    pub fn borrow_credential(&mut self) -> Option<Credential> {
        self.credentials.borrow()
    }

    pub fn return_credential(&mut self, credential: Credential) {
        self.credentials.return_credential(credential);
    }
}
