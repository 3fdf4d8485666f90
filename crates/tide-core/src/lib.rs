//! tide-core — shared types for Tideway stack rollouts.
//!
//! Every other crate in the workspace builds on the types defined here:
//!
//! - **`types`** — stack specs, variable declarations, resolved variables,
//!   inventory items and service snapshots as reported by the cluster
//! - **`labels`** — reserved identity labels and input-only directive labels
//! - **`env`** — the priority-layered variable environment
//! - **`config`** — `tide.toml` parsing and resolved runtime `Settings`
//! - **`client`** — the `ControlPlane` trait implemented by cluster transports
//! - **`memory`** — an in-memory control plane for development and tests
//! - **`error`** — error kinds shared by every crate, and client errors

pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod labels;
pub mod memory;
pub mod types;

pub use client::ControlPlane;
pub use config::{MonitorSettings, Settings, TideConfig};
pub use env::{Layer, VariableEnvironment};
pub use error::{ClientError, ClientResult, ConfigError, ConfigResult, ErrorKind};
pub use labels::{Directive, ReservedLabel};
pub use memory::InMemoryControlPlane;
pub use types::*;
