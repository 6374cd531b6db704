//! Infrastructure layer for the verification workflow core.
//!
//! Contains the error taxonomy, the storage and collaborator trait
//! contracts, and two backends:
//! - PostgreSQL (production)
//! - in-memory (tests, local development)

mod error;
mod memory;
pub mod postgres;
mod traits;

pub use error::{Result, VerificationError};
pub use memory::InMemoryBackend;
pub use postgres::{PgConfig, PgVerificationStore};
pub use traits::{
    IdentityDirectory, IncidentGateway, RequestStore, TimelineLedger, TransitionJournal,
};

#[cfg(test)]
pub use traits::{
    MockIdentityDirectory, MockIncidentGateway, MockRequestStore, MockTimelineLedger,
    MockTransitionJournal,
};
