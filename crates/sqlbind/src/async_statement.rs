//! Suspending statement facade
//!
//! Same operations and return shapes as [`crate::Statement`], but each native
//! call runs on tokio's blocking pool while the caller awaits it. `each` pulls
//! one row per await so other tasks can run between rows.
//!
//! There is no cancellation. Dropping a pending future leaves the blocking
//! call to finish on its own.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::native::{self, NativeStatement, RunResult};
use crate::params::{normalize, BindArgs, BindParams};
use crate::row::{compose_row, compose_rows, Row};
use crate::sqlite::SqliteStatement;

/// Prepared statement with suspending operations
pub struct AsyncStatement<N = SqliteStatement> {
    // The mutex only carries the handle into blocking tasks; `&mut self`
    // already rules out overlapping calls.
    native: Arc<Mutex<N>>,
    columns: Option<Arc<[String]>>,
}

impl<N> AsyncStatement<N>
where
    N: NativeStatement + Send + 'static,
{
    /// Wrap a prepared native handle
    pub fn new(native: N) -> Self {
        Self::from_parts(native, None)
    }

    pub(crate) fn from_parts(native: N, columns: Option<Arc<[String]>>) -> Self {
        Self {
            native: Arc::new(Mutex::new(native)),
            columns,
        }
    }

    /// Execute once, returning the last insert rowid and change count
    pub async fn run(&mut self, params: impl Into<BindArgs>) -> Result<RunResult> {
        let params = normalize(params.into());
        self.call(move |n| native::run(n, &params)).await
    }

    /// Fetch the first row, or `None` if the statement produced none.
    ///
    /// Always a fresh execution with `params`: a cursor left open by `each`
    /// is rewound first, and the statement is rewound again afterwards.
    pub async fn get(&mut self, params: impl Into<BindArgs>) -> Result<Option<Row>> {
        let params = normalize(params.into());
        let names = self.column_cache().await?;
        let values = self
            .call(move |n| {
                n.reset()?;
                let stepped = native::step(n, &params);
                let rewound = n.reset();
                let values = stepped?;
                rewound?;
                Ok(values)
            })
            .await?;
        values.map(|values| compose_row(&names, values)).transpose()
    }

    /// Pull rows one native step at a time; see [`AsyncRows::next`]
    pub fn each(&mut self, params: impl Into<BindArgs>) -> AsyncRows<'_, N> {
        AsyncRows {
            params: Arc::new(normalize(params.into())),
            statement: self,
            done: false,
        }
    }

    /// Fetch every row of a fresh execution in one native call
    pub async fn all(&mut self, params: impl Into<BindArgs>) -> Result<Vec<Row>> {
        let params = normalize(params.into());
        let names = self.column_cache().await?;
        let rows = self
            .call(move |n| {
                n.reset()?;
                native::fetch_all(n, &params)
            })
            .await?;
        compose_rows(&names, rows)
    }

    /// Result column names; fetched from the engine on first use only
    pub async fn column_names(&mut self) -> Result<Vec<String>> {
        Ok(self.column_cache().await?.to_vec())
    }

    /// Rewind the cursor. Parameters are not retained between calls.
    pub async fn reset(&mut self) -> Result<()> {
        self.call(|n| n.reset()).await
    }

    /// Release the native statement
    pub async fn finalize(self) -> Result<()> {
        self.call(|n| n.finalize()).await
    }

    async fn call<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut N) -> Result<T> + Send + 'static,
    {
        let native = Arc::clone(&self.native);
        tokio::task::spawn_blocking(move || {
            let mut guard = native.lock();
            op(&mut *guard)
        })
        .await?
    }

    async fn column_cache(&mut self) -> Result<Arc<[String]>> {
        if let Some(names) = &self.columns {
            return Ok(Arc::clone(names));
        }
        let names: Arc<[String]> = self.call(|n| n.column_names()).await?.into();
        self.columns = Some(Arc::clone(&names));
        Ok(names)
    }

    async fn step(&mut self, params: Arc<BindParams>) -> Result<Option<Row>> {
        let names = self.column_cache().await?;
        let values = self.call(move |n| native::step(n, &params)).await?;
        values.map(|values| compose_row(&names, values)).transpose()
    }
}

/// Rows produced by [`AsyncStatement::each`]
pub struct AsyncRows<'stmt, N> {
    statement: &'stmt mut AsyncStatement<N>,
    params: Arc<BindParams>,
    done: bool,
}

impl<N> AsyncRows<'_, N>
where
    N: NativeStatement + Send + 'static,
{
    /// Fetch the next row, suspending for the native step.
    ///
    /// Returns `Ok(None)` once the result set is exhausted and keeps
    /// returning it, also after an error has been reported.
    pub async fn next(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        let result = self.statement.step(Arc::clone(&self.params)).await;
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    /// Drain the remaining rows
    pub async fn collect(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}
