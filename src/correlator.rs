use crate::error::{Result, SoundTouchError};
use crate::protocol::Category;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Single-shot receiver of a category reply
pub(crate) type Waiter = oneshot::Sender<Result<Value>>;

/// Identifies one in-flight wire request for a category
pub(crate) type Generation = u64;

/// Outcome of registering a waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    /// No request was in flight; the caller must put one on the wire
    Issue(Generation),
    /// A request for the category is already in flight; the waiter rides along
    Joined,
}

#[derive(Debug)]
struct Slot {
    generation: Generation,
    waiters: Vec<Waiter>,
}

/// Matches category replies to the callers waiting for them
///
/// The protocol carries no request ids, so replies are matched by category
/// alone. Only one wire request per category is ever in flight; concurrent
/// callers for the same category share it.
#[derive(Debug, Default)]
pub(crate) struct Correlator {
    pending: HashMap<Category, Slot>,
    next_generation: Generation,
}

impl Correlator {
    /// Add a waiter for `category`
    ///
    /// Waiters whose callers went away are dropped first, so a slot held only
    /// by cancelled calls does not swallow the next request.
    pub(crate) fn register(&mut self, category: Category, waiter: Waiter) -> Registration {
        self.prune(category);

        if let Some(slot) = self.pending.get_mut(&category) {
            slot.waiters.push(waiter);
            return Registration::Joined;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending.insert(
            category,
            Slot {
                generation,
                waiters: vec![waiter],
            },
        );
        Registration::Issue(generation)
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self, category: Category) -> bool {
        self.pending.contains_key(&category)
    }

    /// Hand a reply to every waiter of the category
    ///
    /// Returns how many live waiters received it. A reply nobody asked for
    /// resolves nothing.
    pub(crate) fn resolve(&mut self, category: Category, value: &Value) -> usize {
        let Some(slot) = self.pending.remove(&category) else {
            return 0;
        };
        slot.waiters
            .into_iter()
            .map(|waiter| waiter.send(Ok(value.clone())).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }

    /// Fail the waiters of the request `generation` because its write failed
    ///
    /// A newer request for the same category is left alone.
    pub(crate) fn fail(&mut self, category: Category, generation: Generation, reason: &str) {
        match self.pending.get(&category) {
            Some(slot) if slot.generation == generation => {}
            _ => return,
        }
        if let Some(slot) = self.pending.remove(&category) {
            for waiter in slot.waiters {
                let _ = waiter.send(Err(SoundTouchError::RequestFailed(reason.to_string())));
            }
        }
    }

    /// Fail every pending waiter because the session closed
    pub(crate) fn close_all(&mut self) -> usize {
        let mut failed = 0;
        for (_, slot) in self.pending.drain() {
            for waiter in slot.waiters {
                if waiter.send(Err(SoundTouchError::ConnectionClosed)).is_ok() {
                    failed += 1;
                }
            }
        }
        failed
    }

    /// Drop waiters whose callers went away, freeing the slot if none remain
    pub(crate) fn prune(&mut self, category: Category) {
        if let Some(slot) = self.pending.get_mut(&category) {
            slot.waiters.retain(|waiter| !waiter.is_closed());
            if slot.waiters.is_empty() {
                self.pending.remove(&category);
            }
        }
    }
}
