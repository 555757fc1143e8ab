//! Action traits for type-safe, enumerable action sets

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Marker trait for actions that can be dispatched through a registry
///
/// Actions represent intents to change state. They should be:
/// - Clone: Actions may be logged, replayed, or sent to multiple listeners
/// - Debug: For debugging and logging
/// - Send + 'static: For async dispatch across threads
///
/// Use `#[derive(Action)]` from `project-actions-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &'static str;
}

/// Which half of an asynchronous operation an action signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// The operation itself (no suffix)
    Request,
    /// `*Success` counterpart
    Success,
    /// `*Error` counterpart
    Error,
}

impl Outcome {
    /// Name suffix used for this outcome
    pub fn suffix(&self) -> &'static str {
        match self {
            Outcome::Request => "",
            Outcome::Success => "Success",
            Outcome::Error => "Error",
        }
    }
}

/// A closed, enumerable set of action kinds
///
/// Implemented by `#[derive(Action)]` for enums whose variants carry no data.
/// Every kind is known up front, so registries can allocate one channel per
/// kind and names can be parsed back without reflection.
pub trait ActionKind: Action + Copy + Eq + Hash + Sync {
    /// Every kind, in declaration order
    fn all() -> &'static [Self];

    /// Reverse lookup of [`Action::name`]; exact match only
    fn from_name(name: &str) -> Option<Self>;

    /// Outcome signalled by this kind
    fn outcome(&self) -> Outcome;

    /// The kind in the same category carrying the requested outcome
    ///
    /// `updateError.counterpart(Outcome::Success)` is `updateSuccess`.
    /// Returns `None` for uncategorized kinds or when the pair is incomplete.
    fn counterpart(&self, outcome: Outcome) -> Option<Self>
    where
        Self: ActionCategory,
    {
        let category = self.category()?;
        Self::all()
            .iter()
            .copied()
            .find(|k| k.category() == Some(category) && k.outcome() == outcome)
    }

    /// All names in declaration order
    fn names() -> Vec<&'static str> {
        Self::all().iter().map(Action::name).collect()
    }
}

/// Trait for actions that belong to a category
///
/// Implemented by `#[derive(Action)]` with `#[action(infer_categories)]`.
pub trait ActionCategory: Action {
    /// Category enum generated for the action type
    type Category: Copy + Eq + Hash + Debug;

    /// Category name, `None` if uncategorized
    fn category(&self) -> Option<&'static str>;

    /// Category as enum value
    fn category_enum(&self) -> Self::Category;
}

/// Short, human-readable description of an action for logs
///
/// The default implementation uses `Debug`.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}
