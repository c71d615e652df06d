//! Boardroom - Multi-Agent Task Coordination
//!
//! Routes one user task through a leadership team of four role agents
//! (CEO, CTO, CMO, CFO) over an in-process message bus.
//!
//! # Architecture
//!
//! - **bus**: pub/sub topics plus one-shot correlation reply channels
//! - **orchestrator**: task decomposition and fan-out/fan-in
//! - **worker**: per-role pipeline (collaboration, context, reasoning)
//! - **memory**: two-tier session + vector memory with graceful fallback
//! - **reasoning**: tiered engine execution with retry and degradation

pub mod errors;
pub mod roles;
pub mod types;
pub mod bus;
pub mod collab;
pub mod memory;
pub mod reasoning;
pub mod worker;
pub mod orchestrator;
pub mod config;
pub mod cli;

// Re-export commonly used types
pub use errors::{AgentError, Result};
pub use roles::RoleId;
