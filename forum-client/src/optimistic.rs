//! Mutate local state now, confirm or roll back once the server answers.
//!
//! `InFlight` holds the pre-mutation snapshot of every entity with a pending
//! mutation, at most one per key. `run` drives one mutation end to end:
//! snapshot, apply, await the remote call, then commit or revert. When fresh
//! server data replaces an entity meanwhile, `rebase` moves the snapshot onto
//! it, so a failure reverts to what the server last said.

use std::{cell::RefCell, collections::HashMap, fmt, fmt::Debug, future::Future, hash::Hash};

use crate::{api::Error, Locale, Notice, Notifier};

/// Reasons a mutation was not attempted. None of them reach the network or
/// the user.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum Skip {
    #[error("input is blank")]
    Blank,

    #[error("target is not loaded")]
    NotFound,

    #[error("a mutation on this target is still in flight")]
    Busy,

    #[error("target does not offer this action")]
    NotAllowed,

    #[error("user declined")]
    Declined,
}

#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The server accepted the mutation
    Applied,

    /// The server refused or could not be reached, local state was restored
    RolledBack(Error),

    /// The server refused or could not be reached, and nothing had been
    /// changed locally
    Failed(Error),

    Skipped(Skip),

    /// The answer arrived after the owning view was torn down
    Discarded,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

pub trait Mutation<V> {
    type Response;

    /// Short name for logs
    fn describe(&self) -> &'static str;

    /// Local change made before the remote call is issued. Mutations that
    /// must not show unconfirmed state leave this empty and do their work in
    /// `confirmed`.
    fn optimistic(&self, value: &mut V);

    /// Merges whatever canonical fields the server returned
    fn confirmed(&self, value: &mut V, response: Self::Response) {
        let _ = (value, response);
    }

    /// Called with the not-yet-confirmed value
    fn success_message(&self, value: &V, response: &Self::Response, locale: Locale) -> String;
}

/// Where `run` finds the snapshots table along with the entity itself
pub trait Store<K, V> {
    fn optimistic_parts(&mut self, key: &K) -> (&mut InFlight<K, V>, Option<&mut V>);
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ticket<K> {
    key: K,
    seq: u64,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

#[must_use]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Settled {
    Committed,
    RolledBack,

    /// The ticket is no longer current or its entity is gone: nothing was done
    Stale,
}

struct Pending<V> {
    seq: u64,
    snapshot: V,
    reapply: Box<dyn Fn(&mut V)>,
}

pub struct InFlight<K, V> {
    pending: HashMap<K, Pending<V>>,
    next_seq: u64,
}

impl<K: Debug, V> Debug for InFlight<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}

impl<K, V> Default for InFlight<K, V> {
    fn default() -> InFlight<K, V> {
        InFlight {
            pending: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K, V> InFlight<K, V>
where
    K: Clone + Debug + Eq + Hash,
    V: Clone,
{
    pub fn new() -> InFlight<K, V> {
        InFlight::default()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Snapshots `entity` and applies the optimistic step to it
    pub fn begin<M: Mutation<V> + Clone + 'static>(
        &mut self,
        key: K,
        entity: Option<&mut V>,
        mutation: &M,
    ) -> Result<Ticket<K>, Skip>
    where
        V: 'static,
    {
        let entity = entity.ok_or(Skip::NotFound)?;
        if self.pending.contains_key(&key) {
            return Err(Skip::Busy);
        }
        let snapshot = entity.clone();
        mutation.optimistic(entity);
        let seq = self.next_seq;
        self.next_seq += 1;
        let reapply = mutation.clone();
        self.pending.insert(
            key.clone(),
            Pending {
                seq,
                snapshot,
                reapply: Box::new(move |v: &mut V| reapply.optimistic(v)),
            },
        );
        tracing::trace!(?key, seq, mutation = mutation.describe(), "optimistic mutation applied");
        Ok(Ticket { key, seq })
    }

    fn take(&mut self, ticket: &Ticket<K>) -> Option<V> {
        match self.pending.get(&ticket.key) {
            Some(p) if p.seq == ticket.seq => self.pending.remove(&ticket.key).map(|p| p.snapshot),
            _ => None,
        }
    }

    /// `fresh` is the server's latest version of the entity at `key`, about
    /// to replace the local one. If a mutation on it is pending, `fresh`
    /// becomes the snapshot to revert to and gets the optimistic step
    /// applied again.
    pub fn rebase(&mut self, key: &K, fresh: &mut V) {
        if let Some(p) = self.pending.get_mut(key) {
            p.snapshot = fresh.clone();
            (p.reapply)(fresh);
            tracing::trace!(?key, seq = p.seq, "rebased pending mutation on fresh data");
        }
    }

    pub fn commit<M: Mutation<V>>(
        &mut self,
        ticket: Ticket<K>,
        entity: Option<&mut V>,
        mutation: &M,
        response: M::Response,
    ) -> Settled {
        if self.take(&ticket).is_none() {
            tracing::warn!(key = ?ticket.key, seq = ticket.seq, "ignoring confirmation for stale mutation");
            return Settled::Stale;
        }
        match entity {
            None => {
                tracing::warn!(key = ?ticket.key, "confirmed mutation for entity that is no longer loaded");
                Settled::Stale
            }
            Some(e) => {
                mutation.confirmed(e, response);
                Settled::Committed
            }
        }
    }

    /// Puts back the snapshot taken by `begin`, or by the latest `rebase`
    pub fn rollback(&mut self, ticket: Ticket<K>, entity: Option<&mut V>) -> Settled {
        let snapshot = match self.take(&ticket) {
            Some(s) => s,
            None => {
                tracing::warn!(key = ?ticket.key, seq = ticket.seq, "ignoring failure for stale mutation");
                return Settled::Stale;
            }
        };
        match entity {
            None => Settled::Stale,
            Some(e) => {
                *e = snapshot;
                Settled::RolledBack
            }
        }
    }

    /// Forgets every pending mutation: later answers will all be stale
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Runs `mutation` on the entity at `key`. `remote` is only called if the
/// mutation could start. The `RefCell` is never borrowed across the await.
pub async fn run<K, V, S, M, N, R, Fut>(
    store: &RefCell<S>,
    key: K,
    mutation: &M,
    remote: R,
    notifier: &N,
    locale: Locale,
) -> Outcome
where
    K: Clone + Debug + Eq + Hash,
    V: Clone + 'static,
    S: Store<K, V>,
    M: Mutation<V> + Clone + 'static,
    N: Notifier + ?Sized,
    R: FnOnce() -> Fut,
    Fut: Future<Output = Result<M::Response, Error>>,
{
    let ticket = {
        let mut store = store.borrow_mut();
        let (in_flight, entity) = store.optimistic_parts(&key);
        match in_flight.begin(key.clone(), entity, mutation) {
            Ok(t) => t,
            Err(skip) => {
                tracing::debug!(?key, mutation = mutation.describe(), %skip, "mutation skipped");
                return Outcome::Skipped(skip);
            }
        }
    };

    let result = remote().await;

    let mut store = store.borrow_mut();
    let (in_flight, entity) = store.optimistic_parts(&key);
    match result {
        Ok(response) => {
            let message = entity
                .as_deref()
                .map(|v| mutation.success_message(v, &response, locale));
            match (in_flight.commit(ticket, entity, mutation, response), message) {
                (Settled::Committed, Some(message)) => {
                    drop(store);
                    tracing::debug!(?key, mutation = mutation.describe(), "mutation confirmed");
                    notifier.notify(Notice::success(message));
                    Outcome::Applied
                }
                _ => Outcome::Discarded,
            }
        }
        Err(err) => {
            tracing::error!(?key, mutation = mutation.describe(), %err, "mutation failed, rolling back");
            match in_flight.rollback(ticket, entity) {
                Settled::RolledBack => {
                    drop(store);
                    notifier.notify(Notice::failure(locale.operation_failed()));
                    Outcome::RolledBack(err)
                }
                _ => Outcome::Discarded,
            }
        }
    }
}
