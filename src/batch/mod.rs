// =============================================================================
// Batch Module
// =============================================================================
//
// Concurrent multi-symbol refresh:
// - Jittered, bounded fetch retry
// - Batched, semaphore-gated fan-out with per-symbol outcomes

pub mod orchestrator;
pub mod retry;

pub use orchestrator::{BatchOrchestrator, RefreshReport};
