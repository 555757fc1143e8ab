//! Core traits and types for project-actions
//!
//! This crate provides the closed set of project actions and the plumbing to
//! dispatch and observe them, following a Redux-inspired action model.
//!
//! # Core Concepts
//!
//! - **Action**: A named event describing a state change
//! - **ActionKind**: A closed, enumerable set of fieldless actions
//! - **ActionRegistry**: One broadcast channel per kind; dispatch and subscribe
//! - **Middleware**: Hooks around every dispatch (logging, history)
//!
//! # Basic Example
//!
//! ```ignore
//! use project_actions_core::prelude::*;
//! use serde_json::json;
//!
//! let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
//! let mut listener = registry.subscribe(ProjectAction::ChangeSlug);
//!
//! registry.lookup("changeSlug")?.dispatch(json!({ "from": "old", "to": "new" }));
//!
//! let event = listener.try_recv()?.unwrap();
//! assert_eq!(event.action, ProjectAction::ChangeSlug);
//! ```
//!
//! # Async Outcome Pattern
//!
//! Asynchronous operations use a request action and two outcome actions:
//!
//! 1. **Request** triggers the work (e.g., `loadStats`)
//! 2. **Outcomes** carry the result back (`loadStatsSuccess`, `loadStatsError`)
//!
//! ```ignore
//! let mut requests = registry.subscribe(ProjectAction::LoadStats);
//! let registry = registry.clone();
//! tokio::spawn(async move {
//!     while let Ok(event) = requests.recv().await {
//!         match fetch_stats(&event.payload).await {
//!             Ok(stats) => registry.dispatch(ProjectAction::LoadStatsSuccess, stats),
//!             Err(e) => registry.dispatch(ProjectAction::LoadStatsError, json!(e.to_string())),
//!         };
//!     }
//! });
//! ```
//!
//! [`ActionKind::counterpart`] maps between the three halves.

// Lets `#[derive(Action)]` refer to `::project_actions` from inside this crate
extern crate self as project_actions;

pub mod action;
pub mod action_log;
pub mod config;
pub mod error;
pub mod middleware;
pub mod project;
pub mod registry;
pub mod testing;

// Core trait exports
pub use action::{Action, ActionCategory, ActionKind, ActionSummary, Outcome};

// Project actions
pub use project::{ProjectAction, ProjectActionCategory, Theme};

// Registry exports
pub use registry::{ActionHandle, ActionListener, ActionRegistry, Dispatched};

// Middleware exports
pub use action_log::{ActionLog, ActionLogEntry, ActionLoggerConfig, ActionLoggerMiddleware};
pub use middleware::{ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware};

// Config and errors
pub use config::RegistryConfig;
pub use error::{ConfigError, ListenError, RegistryError};

// Testing exports
pub use testing::ActionRecorder;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionCategory, ActionKind, Outcome};
    pub use crate::middleware::{
        ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware,
    };
    pub use crate::project::{ProjectAction, Theme};
    pub use crate::registry::{ActionHandle, ActionListener, ActionRegistry, Dispatched};
    pub use crate::{ConfigError, ListenError, RegistryConfig, RegistryError};
}
