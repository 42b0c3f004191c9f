//! Command layer for prompt-synchronized exchanges.
//!
//! This module layers request/response discipline over the raw
//! transport: prompt synchronization, bounded waits, and retried
//! command exchanges with substring or pattern acknowledgment.

mod result;
mod session;

pub use result::MatchResult;
pub use session::{CommandSession, DEFAULT_PROMPT, PromptOptions, Retries};
