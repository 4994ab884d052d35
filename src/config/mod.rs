//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FailoverConfig (validated, immutable)
//!     → MonitorConfig handed to the health monitor
//!     → NodeConfig list used to build the node pool
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a monitor keeps its MonitorConfig for life
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::DispatchConfig;
pub use schema::FailoverConfig;
pub use schema::MonitorConfig;
pub use schema::NodeConfig;
pub use schema::ObservabilityConfig;
