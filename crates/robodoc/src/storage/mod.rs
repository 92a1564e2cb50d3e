//! Document store implementations

mod database;
mod memory;

pub use database::SqliteDocumentStore;
pub use memory::InMemoryDocumentStore;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::DocumentStatus;

/// Reject any move out of a terminal status
fn check_transition(id: Uuid, from: DocumentStatus, to: &str) -> Result<()> {
    if from.is_terminal() && from.as_str() != to {
        return Err(Error::InvalidTransition {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}
