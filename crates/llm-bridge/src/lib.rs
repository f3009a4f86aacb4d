//! Configuration core for a multi-provider LLM proxy.
//!
//! - [`mapping`]: load and validate the declarative route table.
//! - [`env`]: resolve the active provider pair, credentials and port.
//! - [`store`]: share the current table and swap it on reload.

pub mod config;
pub mod env;
pub mod mapping;
pub mod provider;
pub mod store;

pub use env::{EnvError, ResolvedConfig, resolve};
pub use mapping::{LoadError, Mapping, MappingTable, load};
pub use provider::Provider;
pub use store::MappingStore;
