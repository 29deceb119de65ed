//! core types for chronicle - an append-only, verifiable ledger.
//!
//! this crate provides the records shared by storage, the http surface and
//! the scheduled tasks:
//! - [`entry`]: chain entries and their wire format
//! - [`replication`]: upstream chains this instance mirrors
//! - [`cross_sign`]: peers this instance pushes its head to, and when
//! - [`client`]: keys allowed to publish
//! - [`config`]: application configuration

mod client;
mod config;
mod cross_sign;
mod entry;
mod error;
mod replication;
mod timestamp;

pub use client::Client;
pub use config::{Config, DatabaseConfig, PeerConfig, ReplicationConfig, SqliteConfig};
pub use cross_sign::{CrossSignPolicy, CrossSignTarget, LastRun, TargetId};
pub use entry::{ChainEntry, ChainScope, NewChainEntry, WireEntry};
pub use error::Error;
pub use replication::{ReplicationSource, SourceId};
pub use timestamp::{format_created, parse_created};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
