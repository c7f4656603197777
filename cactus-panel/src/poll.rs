//! Registry of readiness-poll tasks, one per instance id.
//!
//! Each task holds a [`PollTicket`] carrying the generation it was started
//! with. A ticket stays current until its entry is finished, cancelled or
//! replaced, and every status write goes through [`PollRegistry::write_if_current`].
//! The entry also keeps the most recently listed record for its instance, so a
//! long-running task writes with the address the list shows now.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use cactus_common::Instance;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PollTicket {
    instance_id: String,
    generation: u64,
    cancel: CancellationToken,
}

impl PollTicket {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the registry drops this task.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

struct PollEntry {
    generation: u64,
    cancel: CancellationToken,
    latest: Instance,
}

#[derive(Default)]
pub struct PollRegistry {
    clock: AtomicU64,
    tasks: Mutex<HashMap<String, PollEntry>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PollEntry>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a poll for `instance`. Returns `None` when a live task
    /// already covers it; that task picks up the new record instead.
    pub fn ensure(&self, instance: &Instance) -> Option<PollTicket> {
        let mut tasks = self.lock();
        if let Some(entry) = tasks.get_mut(&instance.id) {
            if !entry.cancel.is_cancelled() {
                entry.latest = instance.clone();
                return None;
            }
        }
        let generation = self.clock.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        let cancel = CancellationToken::new();
        tasks.insert(
            instance.id.clone(),
            PollEntry {
                generation,
                cancel: cancel.clone(),
                latest: instance.clone(),
            },
        );
        Some(PollTicket {
            instance_id: instance.id.clone(),
            generation,
            cancel,
        })
    }

    /// Cancel and drop every task whose instance is not in `live`.
    /// Returns how many were cancelled.
    pub fn retain(&self, live: &HashSet<&str>) -> usize {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|id, entry| {
            let keep = live.contains(id.as_str());
            if !keep {
                entry.cancel.cancel();
            }
            keep
        });
        before - tasks.len()
    }

    pub fn is_current(&self, ticket: &PollTicket) -> bool {
        Self::current_in(&self.lock(), ticket).is_some()
    }

    fn current_in<'a>(
        tasks: &'a HashMap<String, PollEntry>,
        ticket: &PollTicket,
    ) -> Option<&'a PollEntry> {
        if ticket.is_cancelled() {
            return None;
        }
        tasks
            .get(&ticket.instance_id)
            .filter(|entry| entry.generation == ticket.generation)
    }

    /// Run `write` with the latest listed record only if `ticket` is still
    /// current. The check and the write happen under the registry lock, so
    /// `retain` cannot slip in between.
    pub fn write_if_current<F: FnOnce(&Instance)>(&self, ticket: &PollTicket, write: F) -> bool {
        let tasks = self.lock();
        match Self::current_in(&tasks, ticket) {
            Some(entry) => {
                write(&entry.latest);
                true
            }
            None => false,
        }
    }

    /// Drop the entry for a task that reached a terminal state.
    pub fn finish(&self, ticket: &PollTicket) {
        let mut tasks = self.lock();
        if Self::current_in(&tasks, ticket).is_some() {
            tasks.remove(&ticket.instance_id);
        }
    }

    pub fn cancel_all(&self) -> usize {
        let mut tasks = self.lock();
        let count = tasks.len();
        for (_, entry) in tasks.drain() {
            entry.cancel.cancel();
        }
        count
    }

    pub fn is_polling(&self, instance_id: &str) -> bool {
        self.lock()
            .get(instance_id)
            .is_some_and(|entry| !entry.cancel.is_cancelled())
    }

    pub fn active(&self) -> usize {
        self.lock().len()
    }
}
