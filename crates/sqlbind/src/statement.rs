//! Blocking statement facade
//!
//! [`Statement`] wraps one native handle. Every call normalizes its
//! arguments, forwards to the positional or named native operation and turns
//! raw value tuples into [`Row`]s. The only thing it keeps between calls is
//! the statement's column names.
//!
//! Blocking calls run on the caller's thread for their whole duration. Use
//! [`AsyncStatement`] from async code.

use std::iter::FusedIterator;
use std::sync::Arc;

use crate::async_statement::AsyncStatement;
use crate::error::Result;
use crate::native::{self, NativeStatement, RunResult};
use crate::params::{normalize, BindArgs, BindParams};
use crate::row::{compose_row, compose_rows, Row};
use crate::sqlite::SqliteStatement;

/// Prepared statement with blocking operations
pub struct Statement<N: NativeStatement = SqliteStatement> {
    native: N,
    columns: Option<Arc<[String]>>,
}

impl<N: NativeStatement> Statement<N> {
    /// Wrap a prepared native handle
    pub fn new(native: N) -> Self {
        Self {
            native,
            columns: None,
        }
    }

    /// Execute once, returning the last insert rowid and change count
    pub fn run(&mut self, params: impl Into<BindArgs>) -> Result<RunResult> {
        let params = normalize(params.into());
        native::run(&mut self.native, &params)
    }

    /// Fetch the first row, or `None` if the statement produced none.
    ///
    /// Always a fresh execution with `params`: a cursor left open by `each`
    /// is rewound first, and the statement is rewound again afterwards.
    pub fn get(&mut self, params: impl Into<BindArgs>) -> Result<Option<Row>> {
        let params = normalize(params.into());
        let names = self.column_cache()?;
        self.native.reset()?;
        let stepped = native::step(&mut self.native, &params);
        let rewound = self.native.reset();
        let values = stepped?;
        rewound?;
        values.map(|values| compose_row(&names, values)).transpose()
    }

    /// Iterate rows one native step at a time.
    ///
    /// Parameters are normalized once, here. The iterator ends when the
    /// engine reports the end of the result set or after the first error.
    pub fn each(&mut self, params: impl Into<BindArgs>) -> Rows<'_, N> {
        Rows {
            params: normalize(params.into()),
            statement: self,
            done: false,
        }
    }

    /// Fetch every row of a fresh execution in one native call
    pub fn all(&mut self, params: impl Into<BindArgs>) -> Result<Vec<Row>> {
        let params = normalize(params.into());
        let names = self.column_cache()?;
        self.native.reset()?;
        let rows = native::fetch_all(&mut self.native, &params)?;
        compose_rows(&names, rows)
    }

    /// Result column names; fetched from the engine on first use only
    pub fn column_names(&mut self) -> Result<&[String]> {
        self.column_cache()?;
        Ok(self.columns.as_deref().unwrap_or_default())
    }

    /// Rewind the cursor. Parameters are not retained between calls.
    pub fn reset(&mut self) -> Result<()> {
        self.native.reset()
    }

    /// Release the native statement.
    ///
    /// Dropping the statement releases it as well; this form reports the
    /// engine's result.
    pub fn finalize(mut self) -> Result<()> {
        self.native.finalize()
    }

    /// The wrapped native handle
    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn into_native(self) -> N {
        self.native
    }

    /// Switch to the suspending variants, keeping cached column names
    pub fn into_async(self) -> AsyncStatement<N>
    where
        N: Send + 'static,
    {
        AsyncStatement::from_parts(self.native, self.columns)
    }

    fn column_cache(&mut self) -> Result<Arc<[String]>> {
        match &self.columns {
            Some(names) => Ok(Arc::clone(names)),
            None => {
                let names: Arc<[String]> = self.native.column_names()?.into();
                self.columns = Some(Arc::clone(&names));
                Ok(names)
            }
        }
    }

    fn step(&mut self, params: &BindParams) -> Result<Option<Row>> {
        let names = self.column_cache()?;
        native::step(&mut self.native, params)?
            .map(|values| compose_row(&names, values))
            .transpose()
    }
}

/// Rows produced by [`Statement::each`]
pub struct Rows<'stmt, N: NativeStatement> {
    statement: &'stmt mut Statement<N>,
    params: BindParams,
    done: bool,
}

impl<N: NativeStatement> Iterator for Rows<'_, N> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.statement.step(&self.params) {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<N: NativeStatement> FusedIterator for Rows<'_, N> {}
