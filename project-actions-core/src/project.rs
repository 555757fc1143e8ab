//! Project actions
//!
//! The closed set of action names that coordinate project state changes.
//! Names ending in `Success` / `Error` report the outcome of the operation
//! named by the rest of the word, so `loadStats` is answered by either
//! `loadStatsSuccess` or `loadStatsError`.
//!
//! # Categories (inferred from naming):
//! - `create`: createSuccess
//! - `update`: update, updateError, updateSuccess
//! - `load_stats`: loadStats, loadStatsError, loadStatsSuccess
//! - `remove_project`: removeProject, removeProjectError, removeProjectSuccess
//! - `set_active`: setActive
//! - `change_slug`: changeSlug

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::{ActionKind, Outcome};
use crate::error::RegistryError;
use crate::Action;

/// Project action kinds
#[derive(
    project_actions_macros::Action,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[action(rename_all = "camelCase", infer_categories)]
#[serde(rename_all = "camelCase")]
pub enum ProjectAction {
    CreateSuccess,

    Update,
    UpdateError,
    UpdateSuccess,

    LoadStats,
    LoadStatsError,
    LoadStatsSuccess,

    RemoveProject,
    RemoveProjectError,
    RemoveProjectSuccess,

    SetActive,
    ChangeSlug,
}

/// Loose thematic grouping of project actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    /// create / update / remove
    Lifecycle,
    /// statistics loading
    Stats,
    /// switching the active project
    Activation,
    /// slug renaming
    Slug,
}

impl ProjectAction {
    /// Thematic group of this action
    pub fn theme(&self) -> Theme {
        match self {
            ProjectAction::CreateSuccess
            | ProjectAction::Update
            | ProjectAction::UpdateError
            | ProjectAction::UpdateSuccess
            | ProjectAction::RemoveProject
            | ProjectAction::RemoveProjectError
            | ProjectAction::RemoveProjectSuccess => Theme::Lifecycle,
            ProjectAction::LoadStats
            | ProjectAction::LoadStatsError
            | ProjectAction::LoadStatsSuccess => Theme::Stats,
            ProjectAction::SetActive => Theme::Activation,
            ProjectAction::ChangeSlug => Theme::Slug,
        }
    }

    pub fn is_request(&self) -> bool {
        self.outcome() == Outcome::Request
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == Outcome::Success
    }

    pub fn is_error(&self) -> bool {
        self.outcome() == Outcome::Error
    }
}

impl fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectAction {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| RegistryError::UnknownAction(s.to_string()))
    }
}

impl crate::ActionSummary for ProjectAction {
    fn summary(&self) -> String {
        self.name().to_string()
    }
}
