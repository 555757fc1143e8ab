//! Test utilities for code built on project-actions
//!
//! - [`ActionRecorder`]: captures everything dispatched through a registry
//! - Assertion macros for verifying dispatched actions
//!
//! # Example
//!
//! ```ignore
//! use project_actions::testing::ActionRecorder;
//! use project_actions::{assert_emitted, ActionRegistry, ProjectAction};
//!
//! let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
//! let mut recorder = ActionRecorder::new(&registry);
//!
//! code_under_test(&registry);
//!
//! let actions = recorder.drain_actions();
//! assert_emitted!(actions, ProjectAction::UpdateSuccess);
//! ```

use std::collections::VecDeque;

use crate::action::{ActionCategory, ActionKind};
use crate::middleware::Middleware;
use crate::registry::{ActionListener, ActionRegistry, Dispatched};

/// Records every dispatch made through a registry after its creation.
///
/// # Type Parameters
///
/// - `K`: The action kind set
/// - `P`: The payload type
pub struct ActionRecorder<K, P = serde_json::Value> {
    listener: ActionListener<K, P>,
    /// Events pulled from the listener but not yet handed out
    buffered: VecDeque<Dispatched<K, P>>,
}

impl<K, P> ActionRecorder<K, P>
where
    K: ActionKind,
    P: Clone + Send + 'static,
{
    pub fn new<M: Middleware<K>>(registry: &ActionRegistry<K, P, M>) -> Self {
        Self {
            listener: registry.subscribe_all(),
            buffered: VecDeque::new(),
        }
    }

    fn pull(&mut self) {
        self.buffered.extend(self.listener.drain());
    }

    /// Drain all recorded dispatches, oldest first
    pub fn drain(&mut self) -> Vec<Dispatched<K, P>> {
        self.pull();
        self.buffered.drain(..).collect()
    }

    /// Drain all recorded dispatches, keeping only the action kinds
    pub fn drain_actions(&mut self) -> Vec<K> {
        self.drain().into_iter().map(|e| e.action).collect()
    }

    /// Drain the payloads dispatched as `kind`; other dispatches stay recorded
    pub fn drain_payloads(&mut self, kind: K) -> Vec<P> {
        self.pull();
        let (matching, rest): (Vec<_>, Vec<_>) =
            self.buffered.drain(..).partition(|e| e.action == kind);
        self.buffered.extend(rest);
        matching.into_iter().map(|e| e.payload).collect()
    }

    /// Check if anything was dispatched (drains the recording).
    pub fn has_emitted(&mut self) -> bool {
        !self.drain().is_empty()
    }
}

/// Category-aware methods for ActionRecorder.
impl<K, P> ActionRecorder<K, P>
where
    K: ActionKind + ActionCategory,
    P: Clone + Send + 'static,
{
    /// Drain recorded dispatches that belong to a category.
    ///
    /// Dispatches of other categories stay recorded for later draining.
    pub fn drain_category(&mut self, category: &str) -> Vec<Dispatched<K, P>> {
        self.pull();
        let (matching, rest): (Vec<_>, Vec<_>) = self
            .buffered
            .drain(..)
            .partition(|e| e.action.category() == Some(category));
        self.buffered.extend(rest);
        matching
    }

    /// Check if any action of the category was dispatched.
    ///
    /// This drains only the matching category.
    pub fn has_category(&mut self, category: &str) -> bool {
        !self.drain_category(category).is_empty()
    }
}

/// Assert that a specific action was emitted.
///
/// # Example
///
/// ```ignore
/// let actions = recorder.drain_actions();
/// assert_emitted!(actions, ProjectAction::Update);
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be emitted, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that a specific action was NOT emitted.
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be emitted, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Find and return the first action matching a pattern.
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count how many actions match a pattern.
///
/// # Example
///
/// ```ignore
/// let actions = recorder.drain_actions();
/// assert_eq!(count_emitted!(actions, ProjectAction::LoadStats), 3);
/// ```
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}

/// Assert that an action of a specific category was emitted.
///
/// Requires the action type to implement [`ActionCategory`].
#[macro_export]
macro_rules! assert_category_emitted {
    ($actions:expr, $category:expr) => {
        assert!(
            $actions.iter().any(|a| {
                use $crate::ActionCategory;
                a.category() == Some($category)
            }),
            "Expected action with category `{}` to be emitted, but got: {:?}",
            $category,
            $actions
        );
    };
}

/// Count how many actions belong to a specific category.
#[macro_export]
macro_rules! count_category {
    ($actions:expr, $category:expr) => {{
        use $crate::ActionCategory;
        $actions
            .iter()
            .filter(|a| a.category() == Some($category))
            .count()
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProjectAction;
    use serde_json::json;

    #[test]
    fn test_recorder_drain() {
        let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
        let mut recorder = ActionRecorder::new(&registry);

        registry.dispatch(ProjectAction::Update, json!({ "name": "web" }));
        registry.dispatch(ProjectAction::UpdateSuccess, json!({ "name": "web" }));

        let actions = recorder.drain_actions();
        assert_eq!(
            actions,
            vec![ProjectAction::Update, ProjectAction::UpdateSuccess]
        );
        assert!(!recorder.has_emitted());
    }

    #[test]
    fn test_recorder_drain_category_keeps_rest() {
        let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
        let mut recorder = ActionRecorder::new(&registry);

        registry.dispatch(ProjectAction::LoadStats, json!(null));
        registry.dispatch(ProjectAction::SetActive, json!("p1"));
        registry.dispatch(ProjectAction::LoadStatsError, json!("timeout"));

        let stats = recorder.drain_category("load_stats");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].payload, json!("timeout"));

        assert!(recorder.has_category("set_active"));
        assert!(!recorder.has_emitted());
    }

    #[test]
    fn test_recorder_drain_payloads() {
        let registry: ActionRegistry<ProjectAction, String> = ActionRegistry::new();
        let mut recorder = ActionRecorder::new(&registry);

        registry.dispatch(ProjectAction::ChangeSlug, "a".into());
        registry.dispatch(ProjectAction::SetActive, "x".into());
        registry.dispatch(ProjectAction::ChangeSlug, "b".into());

        assert_eq!(recorder.drain_payloads(ProjectAction::ChangeSlug), vec!["a", "b"]);
        assert_eq!(recorder.drain_actions(), vec![ProjectAction::SetActive]);
    }

    #[test]
    fn test_assert_macros() {
        let actions = vec![
            ProjectAction::RemoveProject,
            ProjectAction::RemoveProjectSuccess,
        ];

        assert_emitted!(actions, ProjectAction::RemoveProject);
        assert_not_emitted!(actions, ProjectAction::RemoveProjectError);
        assert_eq!(
            find_emitted!(actions, a if a.is_success()),
            Some(&ProjectAction::RemoveProjectSuccess)
        );
        assert_eq!(count_emitted!(actions, ProjectAction::RemoveProject), 1);

        assert_category_emitted!(actions, "remove_project");
        assert_eq!(count_category!(actions, "remove_project"), 2);
        assert_eq!(count_category!(actions, "update"), 0);
    }
}
