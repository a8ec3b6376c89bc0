//! Outstanding-request bookkeeping.
//!
//! Every remote call registers itself before the command is sent and is
//! unregistered when its [`PendingGuard`] drops, whichever way the call exits.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::commands::Command;
use crate::poison::lock;

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub command: Command,
    pub started: Instant,
}

/// The table of requests that have been issued but not yet closed out.
#[derive(Debug)]
pub(crate) struct PendingRequests {
    next_id: AtomicU32,
    table: Mutex<HashMap<u32, PendingRequest>>,
}

impl PendingRequests {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            next_id: AtomicU32::new(1),
            table: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Allocates a correlation id and records the request under it.
    ///
    /// After the counter wraps, ids still held by outstanding requests are
    /// skipped.
    pub(crate) fn register(self: &Arc<Self>, command: Command) -> PendingGuard {
        let mut table = lock(&self.table, "PendingRequests.register");
        let id = loop {
            let id = self.alloc_id();
            if let Entry::Vacant(slot) = table.entry(id) {
                slot.insert(PendingRequest {
                    command,
                    started: Instant::now(),
                });
                break id;
            }
            tracing::trace!(target: "nova.jdi", id, "correlation id still in use");
        };
        drop(table);
        PendingGuard {
            id,
            requests: Arc::clone(self),
            released: false,
        }
    }

    fn alloc_id(&self) -> u32 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            // Zero is skipped so wrapped ids never look uninitialized.
            if id != 0 {
                return id;
            }
        }
    }

    fn remove(&self, id: u32) -> Option<PendingRequest> {
        lock(&self.table, "PendingRequests.remove").remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.table, "PendingRequests.len").len()
    }

    pub(crate) fn snapshot(&self) -> Vec<(u32, PendingRequest)> {
        let table = lock(&self.table, "PendingRequests.snapshot");
        let mut out: Vec<_> = table.iter().map(|(id, req)| (*id, req.clone())).collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}

/// Scoped registration of one outstanding request.
///
/// Dropping the guard removes the entry; [`PendingGuard::release`] does the same
/// eagerly and is idempotent.
#[derive(Debug)]
pub(crate) struct PendingGuard {
    id: u32,
    requests: Arc<PendingRequests>,
    released: bool,
}

impl PendingGuard {
    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(req) = self.requests.remove(self.id) {
            tracing::trace!(
                target: "nova.jdi",
                id = self.id,
                command = req.command.name,
                elapsed_us = req.started.elapsed().as_micros() as u64,
                "request closed"
            );
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.release();
    }
}
