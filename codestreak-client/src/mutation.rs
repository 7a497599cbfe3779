//! Apply locally, call the backend, then commit or roll back.
//!
//! Every relationship and streak action goes through [`MutationEngine::dispatch`]:
//!
//! 1. capture the current snapshot,
//! 2. publish the locally-applied snapshot with `action_in_progress` set and
//!    the previous action's error and message cleared,
//! 3. await the remote call on a spawned task,
//! 4. on success publish the applied snapshot with a confirmation message and
//!    optionally resync, on failure publish the captured snapshot with the error.
//!
//! A rollback restores the whole captured snapshot, so anything published
//! after the capture (another mutation's commit, a resync) is lost with it.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::store::Store;

/// Snapshot fields the engine drives on every mutation.
pub trait ActionState: Clone + Send + Sync + 'static {
    fn set_action_in_progress(&mut self, in_progress: bool);
    fn set_action_message(&mut self, message: Option<String>);
    fn set_error(&mut self, error: Option<String>);
}

impl ActionState for codestreak_common::non_api_structs::FriendsUiState {
    fn set_action_in_progress(&mut self, in_progress: bool) {
        self.action_in_progress = in_progress;
    }
    fn set_action_message(&mut self, message: Option<String>) {
        self.action_message = message;
    }
    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

/// Re-fetches the authoritative state after a topology change.
#[async_trait]
pub trait Resync: Send + Sync {
    async fn refresh(&self);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    Committed,
    RolledBack(GatewayError),
    /// Failed a local precondition; nothing was sent.
    Rejected(GatewayError),
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
    pub fn error(&self) -> Option<&GatewayError> {
        match self {
            Self::Committed => None,
            Self::RolledBack(err) | Self::Rejected(err) => Some(err),
        }
    }
}

type Apply<S> = Box<dyn FnOnce(&S) -> S + Send>;

pub struct Mutation<S> {
    label: &'static str,
    apply: Apply<S>,
    remote: BoxFuture<'static, Result<(), GatewayError>>,
    message: String,
    refresh: bool,
}

impl<S: Clone + Send + 'static> Mutation<S> {
    pub fn new(label: &'static str, remote: impl Future<Output = Result<(), GatewayError>> + Send + 'static) -> Self {
        Self {
            label,
            apply: Box::new(|state: &S| state.clone()),
            remote: remote.boxed(),
            message: String::from("Done"),
            refresh: false,
        }
    }

    /// Pure function of the snapshot. Must not invent server-assigned fields.
    pub fn apply_locally(mut self, apply: impl FnOnce(&S) -> S + Send + 'static) -> Self {
        self.apply = Box::new(apply);
        self
    }

    pub fn on_success(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn refresh_after(mut self) -> Self {
        self.refresh = true;
        self
    }
}

/// Handle to a dispatched mutation. The remote call keeps running if this is dropped.
#[must_use = "await the handle to learn whether the mutation committed"]
pub struct PendingMutation {
    inner: Pending,
}

enum Pending {
    Settled(MutationOutcome),
    Running(JoinHandle<MutationOutcome>),
}

impl PendingMutation {
    pub fn settled(outcome: MutationOutcome) -> Self {
        Self { inner: Pending::Settled(outcome) }
    }
}

impl IntoFuture for PendingMutation {
    type Output = MutationOutcome;
    type IntoFuture = BoxFuture<'static, MutationOutcome>;

    fn into_future(self) -> Self::IntoFuture {
        async move {
            match self.inner {
                Pending::Settled(outcome) => outcome,
                Pending::Running(handle) => handle.await.unwrap_or_else(|err| {
                    MutationOutcome::RolledBack(GatewayError::Transport(format!("mutation task failed: {err}")))
                }),
            }
        }
        .boxed()
    }
}

pub struct MutationEngine<S> {
    store: Store<S>,
    resync: Option<Arc<dyn Resync>>,
}

impl<S> Clone for MutationEngine<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), resync: self.resync.clone() }
    }
}

impl<S: ActionState> MutationEngine<S> {
    pub fn new(store: Store<S>, resync: Option<Arc<dyn Resync>>) -> Self {
        Self { store, resync }
    }

    /// Publishes the optimistic snapshot before returning. Needs a tokio runtime.
    pub fn dispatch(&self, mutation: Mutation<S>) -> PendingMutation {
        let Mutation { label, apply, remote, message, refresh } = mutation;
        let before = self.store.current();
        let mut after = apply(&*before);
        after.set_action_in_progress(true);
        after.set_action_message(None);
        after.set_error(None);
        self.store.replace(after.clone());
        info!(action = label, "optimistic mutation dispatched");

        let store = self.store.clone();
        let resync = self.resync.clone().filter(|_| refresh);
        let handle = tokio::spawn(async move {
            match remote.await {
                Ok(()) => {
                    info!(action = label, "mutation committed");
                    let mut committed = after;
                    committed.set_action_in_progress(false);
                    committed.set_action_message(Some(message));
                    store.replace(committed);
                    if let Some(resync) = resync {
                        resync.refresh().await;
                    }
                    MutationOutcome::Committed
                }
                Err(err) => {
                    warn!(action = label, %err, "mutation failed, rolling back");
                    let mut reverted = S::clone(&before);
                    reverted.set_action_in_progress(false);
                    reverted.set_action_message(None);
                    reverted.set_error(Some(err.user_message()));
                    store.replace(reverted);
                    MutationOutcome::RolledBack(err)
                }
            }
        });
        PendingMutation { inner: Pending::Running(handle) }
    }

    /// Surfaces a failed precondition without touching collections or the network.
    pub fn reject(&self, label: &'static str, err: GatewayError) -> PendingMutation {
        warn!(action = label, %err, "mutation rejected locally");
        let mut next = S::clone(&self.store.current());
        next.set_action_message(None);
        next.set_error(Some(err.user_message()));
        self.store.replace(next);
        PendingMutation::settled(MutationOutcome::Rejected(err))
    }
}
