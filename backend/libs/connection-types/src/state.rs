//! Connection request state machine
//!
//! ```text
//! Created --Submit--------------> PendingReview --Confirm--> Confirmed
//!    |                                  \
//!    +--ConfirmOnCreation--> Confirmed   +------Reject-----> Rejected
//! ```
//!
//! `Confirmed` and `Rejected` are terminal. `Created` is never persisted: creation applies
//! `Submit` (or `ConfirmOnCreation`) before the row is written.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Created,
    PendingReview,
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Submit,
    /// Staff already verified feasibility in the field
    ConfirmOnCreation,
    Confirm,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {transition} a connection request in state {from}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub transition: Transition,
}

impl ConnectionState {
    pub fn apply(self, transition: Transition) -> Result<ConnectionState, InvalidTransition> {
        use ConnectionState::*;
        use Transition::*;

        match (self, transition) {
            (Created, Submit) => Ok(PendingReview),
            (Created, ConfirmOnCreation) => Ok(Confirmed),
            (PendingReview, Confirm) => Ok(Confirmed),
            (PendingReview, Reject) => Ok(Rejected),
            (from, transition) => Err(InvalidTransition { from, transition }),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Confirmed | ConnectionState::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Created => "created",
            ConnectionState::PendingReview => "pending_review",
            ConnectionState::Confirmed => "confirmed",
            ConnectionState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown connection state '{0}'")]
pub struct UnknownState(pub String);

impl FromStr for ConnectionState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ConnectionState::Created),
            "pending_review" => Ok(ConnectionState::PendingReview),
            "confirmed" => Ok(ConnectionState::Confirmed),
            "rejected" => Ok(ConnectionState::Rejected),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transition::Submit => "submit",
            Transition::ConfirmOnCreation => "confirm on creation",
            Transition::Confirm => "confirm",
            Transition::Reject => "reject",
        })
    }
}
