//! project-actions: the closed set of project actions, dispatched and observed
//!
//! Every project state change is named by one of twelve actions. Producers
//! dispatch them with an opaque payload, listeners subscribe per action or to
//! everything.
//!
//! # Example
//! ```ignore
//! use project_actions::prelude::*;
//! use serde_json::json;
//!
//! let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
//! let mut removed = registry.subscribe(ProjectAction::RemoveProjectSuccess);
//!
//! registry
//!     .lookup("removeProjectSuccess")?
//!     .dispatch(json!({ "slug": "legacy-api" }));
//!
//! let event = removed.recv().await?;
//! assert_eq!(event.payload["slug"], "legacy-api");
//! ```
//!
//! Custom action sets get the same treatment through the derive macro:
//!
//! ```ignore
//! #[derive(Action, Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! #[action(rename_all = "camelCase", infer_categories)]
//! enum TeamAction {
//!     Load,
//!     LoadSuccess,
//!     LoadError,
//! }
//! ```

// Re-export everything from core
pub use project_actions_core::*;

// Re-export derive macros
pub use project_actions_macros::Action;

// Re-export test assertion macros
pub use project_actions_core::{
    assert_category_emitted, assert_emitted, assert_not_emitted, count_category, count_emitted,
    find_emitted,
};

/// Prelude for convenient imports
pub mod prelude {
    // Traits
    pub use project_actions_core::{Action, ActionCategory, ActionKind, ActionSummary, Outcome};

    // Project actions
    pub use project_actions_core::{ProjectAction, ProjectActionCategory, Theme};

    // Registry
    pub use project_actions_core::{ActionHandle, ActionListener, ActionRegistry, Dispatched};

    // Middleware
    pub use project_actions_core::{
        ActionLoggerConfig, ActionLoggerMiddleware, ComposedMiddleware, LoggingMiddleware,
        Middleware, NoopMiddleware,
    };

    // Config and errors
    pub use project_actions_core::{
        ConfigError, ListenError, RegistryConfig, RegistryError,
    };

    // Derive macros
    pub use project_actions_macros::Action;
}
