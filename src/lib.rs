/// Flowdeck: hot-reloading workflow definition runtime
///
/// Discovers declarative workflow documents on disk, validates their node
/// and connection graphs, and serves them from a live in-memory registry
/// that stays consistent under filesystem changes. Transient I/O failures
/// are absorbed through bounded retry and circuit breaking.

// Core configuration and setup
pub mod config;

// Definition document model, validation and registry
pub mod definition;

// Discovery, format loading, change watching and orchestration
pub mod loader;

// Bounded retry and circuit breaking for unstable external calls
pub mod resilience;

// Publish boundary toward the external execution platform
pub mod deploy;

// Structured loader counters
pub mod metrics;

// Failure taxonomy for loading and observation
pub mod error;

// Re-export commonly used types for external consumers
pub use config::Config;
pub use definition::{Definition, DefinitionRegistry, DefinitionValidator, Node, ValidationResult};
pub use error::{LoadError, WatchError};
pub use loader::watcher::{ChangeEvent, ChangeWatcher};
pub use loader::{DefinitionLoader, LoadResult};
