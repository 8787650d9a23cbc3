//! Native statement handle interface
//!
//! Everything that actually touches the database goes through
//! [`NativeStatement`]. Each bind-taking operation comes in a positional and a
//! named flavour; the facades pick one by matching on [`BindParams`].
//!
//! Only the blocking form is implemented by a handle. The suspending form of
//! every operation is the same call moved onto tokio's blocking pool (see
//! [`crate::AsyncStatement`]), so any `NativeStatement + Send + 'static` has
//! both.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Result;
use crate::params::BindParams;
use crate::value::{BindValue, Value};

/// Outcome of executing a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunResult {
    /// Rowid of the most recent successful insert on the connection
    #[serde(rename = "lastInsertRowId")]
    pub last_insert_rowid: i64,
    /// Rows modified by the statement
    pub changes: u64,
}

/// Opaque compiled statement owned by the engine.
///
/// Implementations must report [`crate::Error::Finalized`] from every
/// operation once `finalize` has run, and should release the engine resource
/// on drop if the caller never finalized.
pub trait NativeStatement {
    /// Bind and execute to completion
    fn run_positional(&mut self, values: &[BindValue]) -> Result<RunResult>;
    fn run_named(&mut self, values: &IndexMap<String, BindValue>) -> Result<RunResult>;

    /// Bind and step once; `None` once the result set is exhausted
    fn step_positional(&mut self, values: &[BindValue]) -> Result<Option<Vec<Value>>>;
    fn step_named(&mut self, values: &IndexMap<String, BindValue>)
        -> Result<Option<Vec<Value>>>;

    /// Bind and fetch every remaining row
    fn fetch_all_positional(&mut self, values: &[BindValue]) -> Result<Vec<Vec<Value>>>;
    fn fetch_all_named(&mut self, values: &IndexMap<String, BindValue>)
        -> Result<Vec<Vec<Value>>>;

    /// Result column labels in order
    fn column_names(&mut self) -> Result<Vec<String>>;

    /// Rewind the cursor to before the first row
    fn reset(&mut self) -> Result<()>;

    /// Release the engine resource
    fn finalize(&mut self) -> Result<()>;

    fn is_finalized(&self) -> bool;
}

pub(crate) fn run<N: NativeStatement + ?Sized>(
    native: &mut N,
    params: &BindParams,
) -> Result<RunResult> {
    match params {
        BindParams::Positional(values) => native.run_positional(values),
        BindParams::Named(values) => native.run_named(values),
    }
}

pub(crate) fn step<N: NativeStatement + ?Sized>(
    native: &mut N,
    params: &BindParams,
) -> Result<Option<Vec<Value>>> {
    match params {
        BindParams::Positional(values) => native.step_positional(values),
        BindParams::Named(values) => native.step_named(values),
    }
}

pub(crate) fn fetch_all<N: NativeStatement + ?Sized>(
    native: &mut N,
    params: &BindParams,
) -> Result<Vec<Vec<Value>>> {
    match params {
        BindParams::Positional(values) => native.fetch_all_positional(values),
        BindParams::Named(values) => native.fetch_all_named(values),
    }
}
