//! Two-tier memory subsystem
//!
//! - `session`: exact per-session ring buffer (always available)
//! - `vector`: approximate-match store with degraded fallback mode
//! - `embedding`: text-to-vector backend behind a trait seam
//! - `manager`: ties the tiers together for one role

pub mod embedding;
pub mod manager;
pub mod session;
pub mod vector;

pub use embedding::{EmbeddingClient, OllamaEmbedder};
pub use manager::{ContextItem, ContextKind, ContextOptions, MemoryManager, MemoryStatus};
pub use session::{InteractionRecord, SessionStore, MAX_SESSION_ENTRIES};
pub use vector::{VectorMemory, VectorMemoryStats, VectorRecord, FALLBACK_CAPACITY};
