//! Agent loop errors.

use codeport_core::GenerationError;
use thiserror::Error;

/// Failures that end an agentic run.
///
/// Tool failures are not here: they are reported back to the model.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Turn budget must be at least 1")]
    ZeroTurnBudget,

    #[error("Generation failed on turn {turn}: {source}")]
    Generation {
        turn: u32,
        #[source]
        source: GenerationError,
    },
}
