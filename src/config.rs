//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tunables consumed by [`crate::Engine`].
///
/// The defaults match the documented engine semantics; tests tweak
/// `sequence_start` to exercise auto-increment behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Emit a debug trace line for every executed statement.
    pub log_statements: bool,

    /// Initial value of per-table auto-increment counters. The counter is
    /// incremented before use, so the first assigned id is `sequence_start + 1`.
    pub sequence_start: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_statements: false,
            sequence_start: 0,
        }
    }
}
