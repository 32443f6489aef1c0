//! UDP RPC client for the facility-booking service.
//!
//! This crate provides [`RpcClient`] (request/reply with retries and the
//! monitoring loop), the [`Transport`] boundary with its UDP implementation,
//! and the `facility` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod rpc;
pub mod tracing;
pub mod transport;

pub use cli::Cli;
pub use config::{ClientConfig, RpcSettings};
pub use error::{ClientError, ClientResult};
pub use rpc::{CallState, MonitorEvent, MonitorOutcome, RpcClient};
pub use transport::{Transport, TransportError, UdpTransport};
