//! Agent Pool Supervisor (§4.2): per-project pools of subprocess agents,
//! output streaming with secret redaction and auth-error detection, and
//! orphaned lock-file recovery at start-up.
//!
//! Grounded primarily in the original project's
//! `services/agent_pool_manager.py`, adapted to `tokio::process` and a
//! typed event bus in place of Python's `asyncio` callback sets.

pub mod auth_detect;
pub mod instance;
pub mod lock;
pub mod pool;
pub mod redaction;

pub use instance::{AgentInstance, AgentSpawnConfig};
pub use lock::cleanup_orphaned_locks;
pub use pool::AgentPoolManager;
pub use redaction::sanitize_output;
