//! Action registry: one broadcast channel per action kind
//!
//! The registry turns a closed set of action kinds into dispatchable handles.
//! Code that produces an action resolves a handle (by kind, or by name) and
//! dispatches a payload through it; code that reacts subscribes to the same
//! handle. The registry attaches no meaning to payloads.
//!
//! # Example
//!
//! ```ignore
//! use project_actions::prelude::*;
//! use serde_json::json;
//!
//! let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
//!
//! let mut listener = registry.action(ProjectAction::UpdateSuccess).subscribe();
//!
//! let handle = registry.lookup("updateSuccess")?;
//! handle.dispatch(json!({ "slug": "backend" }));
//!
//! let event = listener.recv().await?;
//! assert_eq!(event.action, ProjectAction::UpdateSuccess);
//! ```
//!
//! Listeners of different kinds are fed from independent channels, so no
//! order is promised between them. [`ActionRegistry::subscribe_all`] observes
//! every dispatch in sequence order.
//!
//! Middleware hooks may dispatch. Such a dispatch is queued and delivered,
//! through the middleware, as soon as the dispatch that ran the hook returns.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace, warn};

use crate::action::ActionKind;
use crate::action_log::ActionLoggerMiddleware;
use crate::config::{RegistryConfig, DEFAULT_CAPACITY};
use crate::error::{ConfigError, ListenError, RegistryError};
use crate::middleware::{Middleware, NoopMiddleware};

/// One dispatched action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatched<K, P = serde_json::Value> {
    /// Which action was dispatched
    pub action: K,
    /// Opaque payload supplied by the dispatcher
    pub payload: P,
    /// Registry-wide dispatch counter, starting at 0
    pub sequence: u64,
}

struct DispatchState<M> {
    middleware: M,
    next_sequence: u64,
}

struct Inner<K, P, M> {
    channels: HashMap<K, broadcast::Sender<Dispatched<K, P>>>,
    all: broadcast::Sender<Dispatched<K, P>>,
    state: Mutex<DispatchState<M>>,
    /// Dispatches made while this thread already holds `state`
    deferred: Mutex<VecDeque<(K, P)>>,
    capacity: usize,
}

thread_local! {
    /// Registries whose dispatch state this thread currently holds
    static HELD: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a registry as held by the current thread until dropped
struct HeldScope {
    key: usize,
}

impl HeldScope {
    /// `None` if this thread already holds the registry
    fn enter(key: usize) -> Option<Self> {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if held.contains(&key) {
                None
            } else {
                held.push(key);
                Some(Self { key })
            }
        })
    }
}

impl Drop for HeldScope {
    fn drop(&mut self) {
        HELD.with(|held| held.borrow_mut().retain(|&k| k != self.key));
    }
}

/// Maps every action kind in `K` to a broadcast channel
///
/// Cloning is cheap; clones share channels, middleware and the sequence counter.
///
/// # Type Parameters
/// * `K` - The action kind set (must implement `ActionKind`)
/// * `P` - Payload type carried by every dispatch
/// * `M` - Middleware run around each dispatch
pub struct ActionRegistry<K, P = serde_json::Value, M = NoopMiddleware> {
    inner: Arc<Inner<K, P, M>>,
}

impl<K, P, M> Clone for ActionRegistry<K, P, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: ActionKind, P, M> fmt::Debug for ActionRegistry<K, P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.inner.channels.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

impl<K, P> ActionRegistry<K, P, NoopMiddleware>
where
    K: ActionKind,
    P: Clone + Send + 'static,
{
    /// Registry with the default capacity and no middleware
    pub fn new() -> Self {
        Self::with_middleware(DEFAULT_CAPACITY, NoopMiddleware)
    }
}

impl<K, P> Default for ActionRegistry<K, P, NoopMiddleware>
where
    K: ActionKind,
    P: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> ActionRegistry<K, P, ActionLoggerMiddleware>
where
    K: ActionKind + crate::ActionSummary,
    P: Clone + Send + 'static,
{
    /// Registry whose capacity and action logging follow `config`
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_middleware(config.capacity, config.logger()))
    }
}

impl<K, P, M> ActionRegistry<K, P, M>
where
    K: ActionKind,
    P: Clone + Send + 'static,
    M: Middleware<K>,
{
    /// Registry with explicit capacity and middleware
    ///
    /// A capacity of zero is raised to one.
    pub fn with_middleware(capacity: usize, middleware: M) -> Self {
        let capacity = capacity.max(1);
        let channels = K::all()
            .iter()
            .map(|&kind| (kind, broadcast::channel(capacity).0))
            .collect();
        let (all, _) = broadcast::channel(capacity);

        Self {
            inner: Arc::new(Inner {
                channels,
                all,
                state: Mutex::new(DispatchState {
                    middleware,
                    next_sequence: 0,
                }),
                deferred: Mutex::new(VecDeque::new()),
                capacity,
            }),
        }
    }

    /// Handle for a known kind
    pub fn action(&self, kind: K) -> ActionHandle<K, P, M> {
        ActionHandle {
            kind,
            registry: self.clone(),
        }
    }

    /// Handle for an action name
    ///
    /// Fails with [`RegistryError::UnknownAction`] if the name is not in `K`.
    pub fn lookup(&self, name: &str) -> Result<ActionHandle<K, P, M>, RegistryError> {
        K::from_name(name)
            .map(|kind| self.action(kind))
            .ok_or_else(|| RegistryError::UnknownAction(name.to_string()))
    }

    /// Registered names, in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        K::names()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Dispatch `payload` as `kind`
    ///
    /// Returns how many listeners received it, counting both kind listeners
    /// and [`subscribe_all`](Self::subscribe_all) listeners. With nobody
    /// listening the dispatch is dropped and 0 is returned.
    ///
    /// Called from a middleware hook or from
    /// [`with_middleware_mut`](Self::with_middleware_mut), the dispatch is
    /// queued until the outer call returns and 0 is returned.
    pub fn dispatch(&self, kind: K, payload: P) -> usize {
        let Some(_scope) = HeldScope::enter(self.key()) else {
            debug!(action = %kind.name(), "dispatch deferred");
            self.lock_deferred().push_back((kind, payload));
            return 0;
        };

        // Held across the sends so the sequence matches delivery order
        let mut state = self.lock_state();
        let delivered = self.deliver(&mut state, kind, payload);
        self.flush_deferred(&mut state);
        delivered
    }

    fn deliver(&self, state: &mut DispatchState<M>, kind: K, payload: P) -> usize {
        state.middleware.before(&kind);

        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let event = Dispatched {
            action: kind,
            payload,
            sequence,
        };

        let mut delivered = self.inner.all.send(event.clone()).unwrap_or(0);
        if let Some(tx) = self.inner.channels.get(&kind) {
            delivered += tx.send(event).unwrap_or(0);
        }

        state.middleware.after(&kind, delivered);

        debug!(action = %kind.name(), sequence, delivered, "dispatched");
        delivered
    }

    fn flush_deferred(&self, state: &mut DispatchState<M>) {
        while let Some((kind, payload)) = self.pop_deferred() {
            self.deliver(state, kind, payload);
        }
    }

    fn pop_deferred(&self) -> Option<(K, P)> {
        self.lock_deferred().pop_front()
    }

    /// Listener for a single kind
    pub fn subscribe(&self, kind: K) -> ActionListener<K, P> {
        let rx = match self.inner.channels.get(&kind) {
            Some(tx) => tx.subscribe(),
            // unreachable for kinds from K::all(); the listener reports Closed
            None => broadcast::channel(1).1,
        };
        ActionListener {
            scope: Some(kind.name()),
            rx,
        }
    }

    /// Listener for every kind
    pub fn subscribe_all(&self) -> ActionListener<K, P> {
        ActionListener {
            scope: None,
            rx: self.inner.all.subscribe(),
        }
    }

    /// Current number of listeners for `kind`
    pub fn listener_count(&self, kind: K) -> usize {
        self.inner
            .channels
            .get(&kind)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Run `f` with exclusive access to the middleware
    ///
    /// Dispatches made inside `f` are delivered after it returns. Must not be
    /// called from a middleware hook of the same registry.
    pub fn with_middleware_mut<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        let scope = HeldScope::enter(self.key());
        let mut state = self.lock_state();
        let result = f(&mut state.middleware);
        if scope.is_some() {
            self.flush_deferred(&mut state);
        }
        result
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatchState<M>> {
        // A panicking middleware must not wedge every later dispatch
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_deferred(&self) -> MutexGuard<'_, VecDeque<(K, P)>> {
        self.inner
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Dispatchable token for one action kind
pub struct ActionHandle<K, P = serde_json::Value, M = NoopMiddleware> {
    kind: K,
    registry: ActionRegistry<K, P, M>,
}

impl<K: Clone, P, M> Clone for ActionHandle<K, P, M> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<K: ActionKind, P, M> fmt::Debug for ActionHandle<K, P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("action", &self.kind.name())
            .finish()
    }
}

impl<K, P, M> ActionHandle<K, P, M>
where
    K: ActionKind,
    P: Clone + Send + 'static,
    M: Middleware<K>,
{
    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Dispatch with a payload; see [`ActionRegistry::dispatch`]
    pub fn dispatch(&self, payload: P) -> usize {
        self.registry.dispatch(self.kind, payload)
    }

    /// Dispatch with the default payload
    pub fn trigger(&self) -> usize
    where
        P: Default,
    {
        self.dispatch(P::default())
    }

    pub fn subscribe(&self) -> ActionListener<K, P> {
        self.registry.subscribe(self.kind)
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listener_count(self.kind)
    }
}

/// Receiving end of a subscription
pub struct ActionListener<K, P = serde_json::Value> {
    /// Kind name for single-kind listeners, `None` for subscribe_all
    scope: Option<&'static str>,
    rx: broadcast::Receiver<Dispatched<K, P>>,
}

impl<K, P> fmt::Debug for ActionListener<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionListener")
            .field("scope", &self.scope.unwrap_or("*"))
            .field("pending", &self.rx.len())
            .finish()
    }
}

impl<K, P> ActionListener<K, P>
where
    K: ActionKind,
    P: Clone,
{
    /// Wait for the next dispatch
    ///
    /// After [`ListenError::Lagged`] the listener resumes with the oldest
    /// event still buffered.
    pub async fn recv(&mut self) -> Result<Dispatched<K, P>, ListenError> {
        match self.rx.recv().await {
            Ok(event) => {
                trace!(action = %event.action.name(), sequence = event.sequence, "received");
                Ok(event)
            }
            Err(RecvError::Lagged(skipped)) => Err(self.lagged(skipped)),
            Err(RecvError::Closed) => Err(ListenError::Closed),
        }
    }

    /// Next dispatch if one is already buffered
    pub fn try_recv(&mut self) -> Result<Option<Dispatched<K, P>>, ListenError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Lagged(skipped)) => Err(self.lagged(skipped)),
            Err(TryRecvError::Closed) => Err(ListenError::Closed),
        }
    }

    /// Everything buffered right now; lagged gaps are skipped
    pub fn drain(&mut self) -> Vec<Dispatched<K, P>> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(Some(event)) => events.push(event),
                Err(ListenError::Lagged(_)) => continue,
                Ok(None) | Err(ListenError::Closed) => break,
            }
        }
        events
    }

    /// Events buffered and not yet received
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn lagged(&self, skipped: u64) -> ListenError {
        warn!(scope = self.scope.unwrap_or("*"), skipped, "listener lagged");
        ListenError::Lagged(skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::action_log::ActionLoggerConfig;
    use crate::ProjectAction;
    use serde_json::{json, Value};
    use std::sync::OnceLock;

    /// Answers every `update` with `updateSuccess` from its `after` hook
    struct AutoReply {
        registry: Arc<OnceLock<ActionRegistry<ProjectAction, Value, AutoReply>>>,
        seen: Vec<(&'static str, usize)>,
    }

    impl Middleware<ProjectAction> for AutoReply {
        fn before(&mut self, _action: &ProjectAction) {}

        fn after(&mut self, action: &ProjectAction, delivered: usize) {
            self.seen.push((action.name(), delivered));
            if *action == ProjectAction::Update {
                if let Some(registry) = self.registry.get() {
                    assert_eq!(registry.dispatch(ProjectAction::UpdateSuccess, json!("ok")), 0);
                }
            }
        }
    }

    fn registry() -> ActionRegistry<ProjectAction> {
        ActionRegistry::new()
    }

    #[test]
    fn test_every_kind_has_a_channel() {
        let registry = registry();
        assert_eq!(registry.names().len(), 12);
        for &kind in ProjectAction::all() {
            assert_eq!(registry.listener_count(kind), 0);
            let _listener = registry.subscribe(kind);
            assert_eq!(registry.listener_count(kind), 1);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = registry();
        let handle = registry.lookup("removeProjectError").unwrap();
        assert_eq!(handle.kind(), ProjectAction::RemoveProjectError);
        assert_eq!(handle.name(), "removeProjectError");
    }

    #[test]
    fn test_lookup_unknown_name() {
        let registry = registry();
        let err = registry.lookup("deleteProject").unwrap_err();
        assert_eq!(err, RegistryError::UnknownAction("deleteProject".into()));
        assert_eq!(err.to_string(), "unknown action: \"deleteProject\"");
    }

    #[test]
    fn test_dispatch_without_listeners_is_noop() {
        let registry = registry();
        assert_eq!(registry.action(ProjectAction::SetActive).trigger(), 0);
    }

    #[test]
    fn test_listener_only_sees_its_kind() {
        let registry = registry();
        let mut updates = registry.action(ProjectAction::Update).subscribe();

        registry.dispatch(ProjectAction::ChangeSlug, json!("new-slug"));
        let delivered = registry.dispatch(ProjectAction::Update, json!({ "name": "api" }));
        assert_eq!(delivered, 1);

        let events = updates.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ProjectAction::Update);
        assert_eq!(events[0].payload, json!({ "name": "api" }));
        assert_eq!(events[0].sequence, 1);
    }

    #[test]
    fn test_delivered_counts_all_listeners() {
        let registry = registry();
        let handle = registry.action(ProjectAction::LoadStats);
        let _a = handle.subscribe();
        let _b = handle.subscribe();
        let _all = registry.subscribe_all();

        assert_eq!(handle.trigger(), 3);
    }

    #[test]
    fn test_subscribe_all_preserves_order() {
        let registry = registry();
        let mut all = registry.subscribe_all();

        for &kind in ProjectAction::all() {
            registry.dispatch(kind, Value::Null);
        }

        let events = all.drain();
        let kinds: Vec<_> = events.iter().map(|e| e.action).collect();
        assert_eq!(kinds, ProjectAction::all().to_vec());
        let sequences: Vec<_> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, (0..12).collect::<Vec<u64>>());
    }

    #[test]
    fn test_clones_share_channels() {
        let registry = registry();
        let mut listener = registry.subscribe(ProjectAction::SetActive);

        let other = registry.clone();
        other.dispatch(ProjectAction::SetActive, json!(7));

        let event = listener.try_recv().unwrap().unwrap();
        assert_eq!(event.payload, json!(7));
        assert_eq!(listener.try_recv().unwrap(), None);
    }

    #[test]
    fn test_listener_lag() {
        let registry: ActionRegistry<ProjectAction, u32> =
            ActionRegistry::with_middleware(2, NoopMiddleware);
        let mut listener = registry.subscribe(ProjectAction::Update);

        for i in 0..5 {
            registry.dispatch(ProjectAction::Update, i);
        }

        assert_eq!(listener.try_recv(), Err(ListenError::Lagged(3)));
        assert_eq!(listener.try_recv().unwrap().map(|e| e.payload), Some(3));
        assert_eq!(listener.try_recv().unwrap().map(|e| e.payload), Some(4));
    }

    #[test]
    fn test_closed_after_registry_dropped() {
        let registry = registry();
        let mut listener = registry.subscribe(ProjectAction::Update);
        drop(registry);
        assert_eq!(listener.try_recv(), Err(ListenError::Closed));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let registry: ActionRegistry<ProjectAction> =
            ActionRegistry::with_middleware(0, NoopMiddleware);
        assert_eq!(registry.capacity(), 1);
    }

    #[test]
    fn test_from_config_logs_history() {
        let config = RegistryConfig::default()
            .with_log(ActionLoggerConfig::new(Some("*Error"), None))
            .with_history(10);
        let registry: ActionRegistry<ProjectAction, Value, ActionLoggerMiddleware> =
            ActionRegistry::from_config(&config).unwrap();
        let _listener = registry.subscribe(ProjectAction::UpdateError);

        registry.dispatch(ProjectAction::Update, Value::Null);
        registry.dispatch(ProjectAction::UpdateError, json!("conflict"));

        registry.with_middleware_mut(|logger| {
            let log = logger.log().unwrap();
            assert_eq!(log.len(), 1);
            let entry = log.entries().next().unwrap();
            assert_eq!(entry.name, "updateError");
            assert_eq!(entry.delivered, Some(1));
        });
    }

    #[test]
    fn test_from_config_rejects_zero_capacity() {
        let config = RegistryConfig::default().with_capacity(0);
        let result: Result<ActionRegistry<ProjectAction, Value, ActionLoggerMiddleware>, _> =
            ActionRegistry::from_config(&config);
        assert!(matches!(result, Err(ConfigError::InvalidCapacity)));
    }

    #[test]
    fn test_hook_dispatch_is_delivered_after_outer_dispatch() {
        let slot = Arc::new(OnceLock::new());
        let registry = ActionRegistry::with_middleware(
            8,
            AutoReply {
                registry: Arc::clone(&slot),
                seen: Vec::new(),
            },
        );
        let _ = slot.set(registry.clone());
        let mut all = registry.subscribe_all();

        assert_eq!(registry.dispatch(ProjectAction::Update, json!({ "name": "api" })), 1);

        let events = all.drain();
        let kinds: Vec<_> = events.iter().map(|e| (e.action, e.sequence)).collect();
        assert_eq!(
            kinds,
            vec![(ProjectAction::Update, 0), (ProjectAction::UpdateSuccess, 1)]
        );
        registry.with_middleware_mut(|reply| {
            assert_eq!(reply.seen, vec![("update", 1), ("updateSuccess", 1)]);
        });
    }

    #[test]
    fn test_dispatch_inside_with_middleware_mut() {
        let registry = registry();
        let mut listener = registry.subscribe(ProjectAction::SetActive);

        let inner = registry.clone();
        let queued =
            registry.with_middleware_mut(|_| inner.dispatch(ProjectAction::SetActive, json!("p1")));
        assert_eq!(queued, 0);

        let events = listener.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, json!("p1"));
    }

    #[test]
    fn test_dispatch_from_other_threads_is_not_deferred() {
        let registry = registry();
        let mut all = registry.subscribe_all();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.dispatch(ProjectAction::LoadStats, json!(i)))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }

        let sequences: Vec<_> = all.drain().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_recv_waits_for_dispatch() {
        let registry = registry();
        let mut listener = registry.action(ProjectAction::LoadStatsSuccess).subscribe();

        let producer = registry.clone();
        tokio::spawn(async move {
            producer.dispatch(ProjectAction::LoadStatsSuccess, json!({ "received": 42 }));
        });

        let event = listener.recv().await.unwrap();
        assert_eq!(event.action, ProjectAction::LoadStatsSuccess);
        assert_eq!(event.payload["received"], 42);
    }
}
