//! QuartzDB
//!
//! An in-memory SQL relational engine for embedded use: a hand-written
//! lexer, a recursive-descent parser producing tagged statements, and an
//! interpreting executor over a catalog of locked relations.
//!
//! - No durability, no network protocol, no cost-based optimizer.
//! - Statements stream results through the [`protocol::EngineConn`]
//!   connection contract.
//! - Relations are the locking unit; multi-table statements take locks in
//!   lexicographic table-name order.
//!
//! ```
//! use quartzdb::{Engine, MemoryConn};
//!
//! let engine = Engine::new();
//! let mut conn = MemoryConn::new();
//! engine.execute_sql(
//!     "CREATE TABLE account (id BIGSERIAL, email TEXT)",
//!     &[],
//!     &mut conn,
//! )?;
//! engine.execute_sql(
//!     "INSERT INTO account (email) VALUES ('foo@bar.com')",
//!     &[],
//!     &mut conn,
//! )?;
//! # Ok::<(), quartzdb::QuartzError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod protocol;
pub mod sql;
pub mod types;

mod error;

pub use catalog::{Engine, Relation};
pub use config::EngineConfig;
pub use error::{QuartzError, Result};
pub use protocol::{ChannelConn, EngineConn, Frame, MemoryConn};
pub use sql::{parse, Statement};
pub use types::{Attribute, Row, Table, TypeFamily, Value};
