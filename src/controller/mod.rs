//! Optimistic update controller.
//!
//! The [`DiscussionController`] owns the working forest of one discussion
//! context. Every submitted mutation is applied locally and published before
//! the comment service is asked, then confirmed or rolled back when the
//! service answers.
//!
//! ## Operation lifecycle
//!
//! ```text
//! submit_*  ──validate──▶ apply locally ──publish──▶ spawn request
//!                                                        │
//!                       ┌────────────────────────────────┤
//!                       ▼                                ▼
//!                 Ok(canonical)                     Err(rejected)
//!                 confirm + publish                 rollback + publish
//!                       └──────────────┬─────────────────┘
//!                                      ▼
//!                               EngineEvent sent
//! ```
//!
//! ## Concurrency
//!
//! - The state lock is only held for synchronous steps, never across an
//!   await.
//! - At most one operation per comment id is in flight; further operations
//!   on that id fail with `Pending` until it settles.
//! - Loading or unloading a context bumps an epoch and aborts every request
//!   still in flight, reporting each one as `Discarded`. A response that
//!   already arrived for an older epoch is dropped without touching the
//!   forest.
//! - Events go through a bounded channel. When the receiver falls behind,
//!   new events are dropped with a warning.

pub mod events;
pub mod operation;

pub use events::{EngineEvent, EventReceiver, OperationKind, Outcome, EVENT_CHANNEL_CAPACITY};
pub use operation::Operation;

use crate::config::EngineConfig;
use crate::context::{ContextKey, ContextLoader};
use crate::error::{ForestError, Result};
use crate::service::CommentService;
use crate::session::Session;
use crate::tree::ops::find;
use crate::tree::{CommentId, CommentNode, Forest};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// Mutable controller state guarded by one lock.
#[derive(Debug, Default)]
struct ControllerState {
    /// Bumped on every context switch.
    epoch: u64,
    context: Option<ContextKey>,
    forest: Forest,
    /// Ids with an unsettled operation (placeholders included).
    in_flight: HashMap<CommentId, InFlight>,
}

/// Request task of an unsettled operation.
#[derive(Debug)]
struct InFlight {
    kind: OperationKind,
    abort: AbortHandle,
}

struct Shared {
    state: Mutex<ControllerState>,
    service: Arc<dyn CommentService>,
    loader: ContextLoader,
    config: EngineConfig,
    forest_tx: watch::Sender<Forest>,
    events: mpsc::Sender<EngineEvent>,
}

/// Handle to the working forest of one discussion view.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct DiscussionController {
    shared: Arc<Shared>,
}

impl fmt::Debug for DiscussionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DiscussionController")
            .field("context", &state.context)
            .field("epoch", &state.epoch)
            .field("comments", &state.forest.node_count())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

/// A submitted operation whose optimistic step is already visible.
#[derive(Debug)]
pub struct Submission {
    target: CommentId,
    kind: OperationKind,
    handle: JoinHandle<Outcome>,
}

impl Submission {
    /// The id the operation was submitted against. For new comments this is
    /// the placeholder id.
    pub fn target(&self) -> CommentId {
        self.target
    }

    /// What was submitted.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Waits until the service has answered and the forest is reconciled.
    pub async fn settled(self) -> Outcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => {
                debug!(comment = %self.target, "Operation aborted by a context switch");
                Outcome::Discarded
            }
            Err(err) => {
                warn!(comment = %self.target, error = %err, "Operation task did not complete");
                Outcome::Discarded
            }
        }
    }
}

impl DiscussionController {
    /// Creates a controller with no context loaded.
    ///
    /// Returns the receiving end of the event channel alongside it. The
    /// channel holds [`EVENT_CHANNEL_CAPACITY`] events; a receiver that is
    /// kept must be drained or later events are lost.
    pub fn new(
        service: Arc<dyn CommentService>,
        config: EngineConfig,
    ) -> Result<(Self, EventReceiver)> {
        config.validate()?;
        let (forest_tx, _) = watch::channel(Forest::new());
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let controller = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState::default()),
                service,
                loader: ContextLoader,
                config,
                forest_tx,
                events,
            }),
        };
        Ok((controller, receiver))
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ControllerState) {
        self.shared.forest_tx.send_replace(state.forest.clone());
    }

    fn notify(&self, event: EngineEvent) {
        match self.shared.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    kind = %event.kind,
                    comment = %event.target,
                    capacity = EVENT_CHANNEL_CAPACITY,
                    "Event channel full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => debug!("Event receiver dropped"),
        }
    }

    /// Aborts every unsettled request and reports it as discarded.
    fn discard_in_flight(&self, state: &mut ControllerState) {
        if state.in_flight.is_empty() {
            return;
        }
        let dropped = state.in_flight.len();
        for (target, in_flight) in state.in_flight.drain() {
            in_flight.abort.abort();
            self.notify(EngineEvent {
                kind: in_flight.kind,
                target,
                outcome: Outcome::Discarded,
            });
        }
        info!(dropped, "Aborted in-flight operations on context switch");
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Returns the loaded context, if any.
    pub fn context(&self) -> Option<ContextKey> {
        self.lock().context.clone()
    }

    /// Returns a snapshot of the working forest.
    pub fn forest(&self) -> Forest {
        self.lock().forest.clone()
    }

    /// Subscribes to every published working forest.
    pub fn subscribe(&self) -> watch::Receiver<Forest> {
        self.shared.forest_tx.subscribe()
    }

    /// Returns true while an operation on `id` awaits the service.
    pub fn is_in_flight(&self, id: &CommentId) -> bool {
        self.lock().in_flight.contains_key(id)
    }

    /// Number of operations awaiting the service.
    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Switches to `context` and loads its forest.
    ///
    /// The previous forest is discarded and its in-flight requests are
    /// aborted immediately. Fails with `ContextChanged` if another `load` or
    /// `unload` happens before the service answers.
    pub async fn load(&self, context: ContextKey) -> Result<()> {
        let epoch = {
            let mut state = self.lock();
            state.epoch += 1;
            state.context = Some(context.clone());
            state.forest = Forest::new();
            self.discard_in_flight(&mut state);
            self.publish(&state);
            state.epoch
        };
        info!(context = %context, "Loading discussion context");

        let result = self
            .shared
            .loader
            .load(self.shared.service.as_ref(), &context)
            .await;

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(context = %context, "Load superseded by a newer context switch");
            return Err(ForestError::ContextChanged);
        }
        state.forest = result?;
        self.publish(&state);
        Ok(())
    }

    /// Drops the loaded context and its forest, aborting in-flight requests.
    pub fn unload(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        if let Some(context) = state.context.take() {
            info!(context = %context, "Unloaded discussion context");
        }
        state.forest = Forest::new();
        self.discard_in_flight(&mut state);
        self.publish(&state);
    }

    /// Adds a reply to `parent` optimistically.
    ///
    /// Fails without side effects on an invalid body (`InvalidInput`), an
    /// unknown parent (`ParentNotFound`), a parent at the depth limit
    /// (`DepthExceeded`) or a parent that is still pending (`Pending`).
    pub fn submit_reply(
        &self,
        session: &Session,
        parent: CommentId,
        body: impl Into<String>,
    ) -> Result<Submission> {
        let body = body.into();
        self.shared.config.check_body(&body)?;
        let runtime = current_runtime()?;

        let mut state = self.lock();
        if state.context.is_none() {
            return Err(ForestError::NoContext);
        }
        let parent_id = parent.canonical().ok_or(ForestError::Pending(parent))?;
        self.shared
            .config
            .depth_policy()
            .check_reply(&state.forest, &parent)?;
        check_settled(&state, &parent)?;

        let node = CommentNode::pending(body.clone(), session.user_id(), session.display_name());
        let (op, forest) = Operation::add_reply(&state.forest, parent, node)?;
        info!(parent = %parent, placeholder = %op.target(), "Reply applied locally");

        let service = Arc::clone(&self.shared.service);
        let session = session.clone();
        Ok(self.dispatch(&mut state, runtime, op, forest, async move {
            service.create_reply(&session, parent_id, &body).await
        }))
    }

    /// Adds a root comment to the loaded context optimistically.
    pub fn submit_root_comment(
        &self,
        session: &Session,
        body: impl Into<String>,
    ) -> Result<Submission> {
        let body = body.into();
        self.shared.config.check_body(&body)?;
        let runtime = current_runtime()?;

        let mut state = self.lock();
        let context = state.context.clone().ok_or(ForestError::NoContext)?;

        let node = CommentNode::pending(body.clone(), session.user_id(), session.display_name());
        let (op, forest) = Operation::add_root(&state.forest, node);
        info!(context = %context, placeholder = %op.target(), "Root comment applied locally");

        let service = Arc::clone(&self.shared.service);
        let session = session.clone();
        Ok(self.dispatch(&mut state, runtime, op, forest, async move {
            service.create_root_comment(&session, &context, &body).await
        }))
    }

    /// Replaces the body of `id` optimistically.
    pub fn submit_edit(
        &self,
        session: &Session,
        id: CommentId,
        body: impl Into<String>,
    ) -> Result<Submission> {
        let body = body.into();
        self.shared.config.check_body(&body)?;
        let runtime = current_runtime()?;

        let mut state = self.lock();
        let comment_id = self.check_target(&state, &id)?;
        let (op, forest) = Operation::edit_body(&state.forest, id, body.clone())?;
        info!(id = %id, "Edit applied locally");

        let service = Arc::clone(&self.shared.service);
        let session = session.clone();
        Ok(self.dispatch(&mut state, runtime, op, forest, async move {
            service.update_comment_body(&session, comment_id, &body).await
        }))
    }

    /// Soft-deletes `id` optimistically. Its replies stay in the forest.
    pub fn submit_delete(&self, session: &Session, id: CommentId) -> Result<Submission> {
        self.submit_active(session, id, false)
    }

    /// Restores a soft-deleted comment optimistically.
    pub fn submit_restore(&self, session: &Session, id: CommentId) -> Result<Submission> {
        self.submit_active(session, id, true)
    }

    fn submit_active(&self, session: &Session, id: CommentId, active: bool) -> Result<Submission> {
        let runtime = current_runtime()?;

        let mut state = self.lock();
        let comment_id = self.check_target(&state, &id)?;
        if let Some(node) = find(&state.forest, &id) {
            if node.is_active == active {
                return Err(ForestError::invalid_input(if active {
                    format!("comment {} is not deleted", id)
                } else {
                    format!("comment {} is already deleted", id)
                }));
            }
        }
        let (op, forest) = Operation::toggle_active(&state.forest, id, active)?;
        info!(id = %id, active, "Active flag applied locally");

        let service = Arc::clone(&self.shared.service);
        let session = session.clone();
        Ok(self.dispatch(&mut state, runtime, op, forest, async move {
            service.set_comment_active(&session, comment_id, active).await
        }))
    }

    /// Checks that `id` is loaded, canonical, present and settled.
    fn check_target(&self, state: &ControllerState, id: &CommentId) -> Result<u64> {
        if state.context.is_none() {
            return Err(ForestError::NoContext);
        }
        let comment_id = id.canonical().ok_or(ForestError::Pending(*id))?;
        if find(&state.forest, id).is_none() {
            return Err(ForestError::NotFound(*id));
        }
        check_settled(state, id)?;
        Ok(comment_id)
    }

    /// Installs the optimistic forest, publishes it and spawns the request.
    fn dispatch<F>(
        &self,
        state: &mut ControllerState,
        runtime: Handle,
        op: Operation,
        forest: Forest,
        request: F,
    ) -> Submission
    where
        F: Future<Output = Result<CommentNode>> + Send + 'static,
    {
        let target = op.target();
        let kind = op.kind();
        let epoch = state.epoch;
        state.forest = forest;
        self.publish(state);

        let controller = self.clone();
        let handle = runtime.spawn(async move {
            let result = request.await;
            controller.settle(epoch, op, result)
        });
        state.in_flight.insert(
            target,
            InFlight {
                kind,
                abort: handle.abort_handle(),
            },
        );
        Submission {
            target,
            kind,
            handle,
        }
    }

    /// Reconciles a finished request with the working forest.
    ///
    /// Responses for an older epoch were already reported when the context
    /// switched and only return `Discarded`.
    fn settle(&self, epoch: u64, op: Operation, result: Result<CommentNode>) -> Outcome {
        let outcome = {
            let mut state = self.lock();
            if state.epoch != epoch {
                debug!(
                    kind = %op.kind(),
                    comment = %op.target(),
                    "Ignoring response for a discarded context"
                );
                return Outcome::Discarded;
            }
            state.in_flight.remove(&op.target());
            let outcome = match result {
                Ok(canonical) => {
                    let id = canonical.id;
                    match op.confirm(&state.forest, canonical) {
                        Ok(forest) => {
                            state.forest = forest;
                            info!(
                                kind = %op.kind(),
                                comment = %op.target(),
                                id = %id,
                                "Confirmed"
                            );
                            Outcome::Confirmed(id)
                        }
                        Err(err) => self.roll_back(&mut state, &op, err),
                    }
                }
                Err(err) => self.roll_back(&mut state, &op, err),
            };
            self.publish(&state);
            outcome
        };

        self.notify(EngineEvent {
            kind: op.kind(),
            target: op.target(),
            outcome: outcome.clone(),
        });
        outcome
    }

    fn roll_back(&self, state: &mut ControllerState, op: &Operation, err: ForestError) -> Outcome {
        warn!(kind = %op.kind(), comment = %op.target(), error = %err, "Rolling back");
        match op.rollback(&state.forest) {
            Ok(forest) => state.forest = forest,
            Err(rollback_err) => {
                warn!(comment = %op.target(), error = %rollback_err, "Rollback target missing");
            }
        }
        let reason = match err {
            ForestError::RemoteRejected(reason) => reason,
            other => other.to_string(),
        };
        Outcome::RolledBack { reason }
    }
}

/// Rejects operations on nodes that are unconfirmed or already in flight.
fn check_settled(state: &ControllerState, id: &CommentId) -> Result<()> {
    let pending = state.in_flight.contains_key(id)
        || find(&state.forest, id).is_some_and(|node| node.is_pending);
    if pending {
        return Err(ForestError::Pending(*id));
    }
    Ok(())
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current()
        .map_err(|_| ForestError::config("optimistic operations need a Tokio runtime"))
}
