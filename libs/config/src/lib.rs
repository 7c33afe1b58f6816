//! # Wirebus Configuration
//!
//! Sizing configuration for the core: segment pool, buffer room factor and
//! binder registry.
//!
//! ## Usage
//!
//! ```rust
//! use config::CoreConfig;
//!
//! let config = CoreConfig::from_toml_str("[pool]\nsegment_exponent = 10\n").unwrap();
//! assert_eq!(config.pool.segment_size(), 1024);
//! ```

pub mod core_config;
pub mod defaults;

pub use core_config::{BinderConfig, BufferConfig, CoreConfig, PoolConfig};
