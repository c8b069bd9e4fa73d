//! Connection request types shared across the gateway boundary
//!
//! - `state`: the connection request state machine
//! - `request`: the request view and the creation / feasibility bodies
//! - `query`: listing and review queue query parameters
//! - `auth`: login bodies exchanged between gateway and connection service

pub mod auth;
pub mod query;
pub mod request;
pub mod state;

pub use auth::{AuthenticatedUser, LoginRequest, LoginResponse, INVALID_CREDENTIALS};
pub use query::{ConnectionListQuery, SortDirection, SortField, UnknownSortValue};
pub use request::{
    AddressRef, AssistedConnectionBody, ConfirmFeasibility, ConnectionRequest,
    CreateConnectionRequest, NewAddress, RejectFeasibility, SelfServiceConnectionBody,
    SubmissionOrigin, describe_validation_errors,
};
pub use state::{ConnectionState, InvalidTransition, Transition, UnknownState};

/// Header the gateway sets to scope an internal query to one person.
pub const PERSON_HEADER: &str = "x-id-persona";
