//! Status enums for client-side state.

use serde::{Deserialize, Serialize};

/// Lifecycle of the one-shot catalog bootstrap.
///
/// Moves strictly forward: `Unattempted -> Seeding -> Done`. Only a new
/// client session starts over at `Unattempted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeedState {
    #[default]
    Unattempted,
    Seeding,
    Done,
}

impl SeedState {
    /// Whether a seeding attempt has started (in flight or finished).
    #[must_use]
    pub const fn is_attempted(self) -> bool {
        !matches!(self, Self::Unattempted)
    }
}

/// How a cached view should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    /// No value yet and no actionable error (includes "gateway not connected").
    Loading,
    /// A value is available (possibly stale, possibly with a failed refresh).
    Ready,
    /// No value and the last load failed.
    Failed,
}
