//! Prepared-statement binding layer over SQLite
//!
//! This crate exposes SQLite's prepared statements to an application runtime.
//! It does three things and nothing more:
//!
//! - normalizes caller parameters into positional or named form,
//! - zips column names with fetched value tuples into keyed [`Row`]s,
//! - forwards run/get/each/all/reset/finalize to the native statement handle.
//!
//! Planning, storage, locking and journaling all stay inside SQLite.
//!
//! # Features
//!
//! - Blocking [`Statement`] and suspending [`AsyncStatement`] facades with the
//!   same operations and return shapes
//! - Any backend implementing [`NativeStatement`] can sit behind a facade
//! - Statements release their native resource when dropped
//! - Optional C ABI (`ffi` feature) speaking JSON parameters and rows
//!
//! # Example: Blocking
//!
//! ```rust,no_run
//! use sqlbind::{bind, named, Database};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open_in_memory()?;
//! db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let mut insert = db.prepare("INSERT INTO users (id, name) VALUES (?, ?)")?;
//! let result = insert.run(bind![1, "ada"])?;
//! assert_eq!(result.changes, 1);
//! insert.finalize()?;
//!
//! let mut select = db.prepare("SELECT id, name FROM users WHERE name = $name")?;
//! let row = select.get(named! { "$name" => "ada" })?;
//! assert!(row.is_some());
//!
//! for row in select.each(named! { "$name" => "ada" }) {
//!     println!("{:?}", row?.get("id"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Suspending
//!
//! ```rust,no_run
//! use sqlbind::Database;
//!
//! # async fn demo() -> sqlbind::Result<()> {
//! let db = Database::open_in_memory()?;
//! let mut stmt = db.prepare_async("SELECT 1 AS one UNION ALL SELECT 2")?;
//!
//! let mut rows = stmt.each(());
//! while let Some(row) = rows.next().await? {
//!     println!("{:?}", row.get("one"));
//! }
//! stmt.finalize().await
//! # }
//! ```

pub mod async_statement;
pub mod config;
pub mod error;
pub mod logging;
pub mod native;
pub mod params;
pub mod row;
pub mod sqlite;
pub mod statement;
pub mod value;

// FFI module for host runtimes speaking the C ABI
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(test)]
mod testing;

// Re-export main types
pub use async_statement::{AsyncRows, AsyncStatement};
pub use config::DatabaseConfig;
pub use error::{Error, Result};
pub use native::{NativeStatement, RunResult};
pub use params::{normalize, BindArg, BindArgs, BindParams};
pub use row::{compose_row, compose_rows, Row};
pub use sqlite::{Database, SqliteStatement};
pub use statement::{Rows, Statement};
pub use value::{BindValue, Value};
