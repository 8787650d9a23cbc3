//! SQLite native handle
//!
//! [`Database`] opens a connection through rusqlite and compiles statements
//! with the engine's C API. [`SqliteStatement`] is the opaque statement
//! handle behind [`Statement`]: it binds, steps and reads columns directly,
//! keeping the compiled program and its cursor alive between calls.
//! rusqlite's safe `Statement<'conn>` borrows its `Connection`, so it cannot
//! live beside the shared connection across calls; hence the raw API.
//!
//! Cursor rules:
//! - A step on an idle statement clears old bindings and binds the new
//!   values; a step on a statement that is mid-iteration just continues.
//! - Reaching the end of the result set resets the statement.
//! - `run` always starts from a reset statement and leaves it reset.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::{ffi, Connection, OpenFlags};
use tracing::{debug, trace};

use crate::async_statement::AsyncStatement;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::logging::prefix;
use crate::native::{NativeStatement, RunResult};
use crate::statement::Statement;
use crate::value::{BindValue, Value};

/// Shared SQLite connection.
///
/// Clones share one connection. It closes once every clone and every
/// statement prepared from it has been dropped.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(&DatabaseConfig::file(path))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with(&DatabaseConfig::in_memory())
    }

    pub fn open_with(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let conn = match &config.path {
            Some(path) if config.read_only => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        if config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON")?;
        }

        debug!(
            "{} opened database {}",
            prefix::DB,
            config
                .path
                .as_deref()
                .map_or_else(|| ":memory:".into(), |p| p.display().to_string())
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute one or more statements without parameters (schema setup)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Compile `sql` into a statement with blocking operations
    pub fn prepare(&self, sql: &str) -> Result<Statement<SqliteStatement>> {
        Ok(Statement::new(self.prepare_native(sql)?))
    }

    /// Compile `sql` into a statement with suspending operations
    pub fn prepare_async(&self, sql: &str) -> Result<AsyncStatement<SqliteStatement>> {
        Ok(AsyncStatement::new(self.prepare_native(sql)?))
    }

    /// Compile `sql` into a bare native handle.
    ///
    /// Only the first statement of `sql` is compiled; trailing text is
    /// ignored.
    pub fn prepare_native(&self, sql: &str) -> Result<SqliteStatement> {
        SqliteStatement::prepare(Arc::clone(&self.conn), sql)
    }
}

struct RawStatement(NonNull<ffi::sqlite3_stmt>);

// SAFETY: the statement is only touched while the owning connection's lock
// is held, and the connection outlives it through the shared `Arc`.
unsafe impl Send for RawStatement {}

/// Compiled SQLite statement
pub struct SqliteStatement {
    conn: Arc<Mutex<Connection>>,
    raw: Option<RawStatement>,
}

enum Binding<'a> {
    Positional(&'a [BindValue]),
    Named(&'a IndexMap<String, BindValue>),
}

impl SqliteStatement {
    fn prepare(conn: Arc<Mutex<Connection>>, sql: &str) -> Result<Self> {
        let len = c_int::try_from(sql.len())
            .map_err(|_| engine_failure(ffi::SQLITE_TOOBIG, "SQL text is too long"))?;

        let stmt = {
            let guard = conn.lock();
            let db = unsafe { guard.handle() };
            let mut stmt = ptr::null_mut();
            let rc = unsafe {
                ffi::sqlite3_prepare_v2(
                    db,
                    sql.as_ptr().cast::<c_char>(),
                    len,
                    &mut stmt,
                    ptr::null_mut(),
                )
            };
            if rc != ffi::SQLITE_OK {
                return Err(unsafe { native_error(db, rc) });
            }
            NonNull::new(stmt)
                .ok_or_else(|| engine_failure(ffi::SQLITE_MISUSE, "SQL contains no statement"))?
        };

        trace!("{} prepared statement: {}", prefix::DB, sql);

        Ok(Self {
            conn,
            raw: Some(RawStatement(stmt)),
        })
    }

    /// Run `op` against the live handle with the connection locked
    fn with_raw<T>(
        &self,
        op: impl FnOnce(*mut ffi::sqlite3, *mut ffi::sqlite3_stmt) -> Result<T>,
    ) -> Result<T> {
        let raw = self.raw.as_ref().ok_or(Error::Finalized)?;
        let conn = self.conn.lock();
        let db = unsafe { conn.handle() };
        op(db, raw.0.as_ptr())
    }

    fn run(&mut self, binding: Binding<'_>) -> Result<RunResult> {
        self.with_raw(|db, stmt| unsafe {
            ffi::sqlite3_reset(stmt);
            bind(db, stmt, binding)?;

            let rc = loop {
                match ffi::sqlite3_step(stmt) {
                    ffi::SQLITE_ROW => continue,
                    rc => break rc,
                }
            };
            if rc != ffi::SQLITE_DONE {
                let err = native_error(db, rc);
                ffi::sqlite3_reset(stmt);
                return Err(err);
            }

            let result = RunResult {
                last_insert_rowid: ffi::sqlite3_last_insert_rowid(db),
                changes: ffi::sqlite3_changes64(db).max(0) as u64,
            };
            ffi::sqlite3_reset(stmt);
            Ok(result)
        })
    }

    fn step(&mut self, binding: Binding<'_>) -> Result<Option<Vec<Value>>> {
        self.with_raw(|db, stmt| unsafe {
            if ffi::sqlite3_stmt_busy(stmt) == 0 {
                bind(db, stmt, binding)?;
            }
            step_row(db, stmt)
        })
    }

    fn fetch_all(&mut self, binding: Binding<'_>) -> Result<Vec<Vec<Value>>> {
        self.with_raw(|db, stmt| unsafe {
            if ffi::sqlite3_stmt_busy(stmt) == 0 {
                bind(db, stmt, binding)?;
            }
            let mut rows = Vec::new();
            while let Some(row) = step_row(db, stmt)? {
                rows.push(row);
            }
            Ok(rows)
        })
    }
}

impl NativeStatement for SqliteStatement {
    fn run_positional(&mut self, values: &[BindValue]) -> Result<RunResult> {
        self.run(Binding::Positional(values))
    }

    fn run_named(&mut self, values: &IndexMap<String, BindValue>) -> Result<RunResult> {
        self.run(Binding::Named(values))
    }

    fn step_positional(&mut self, values: &[BindValue]) -> Result<Option<Vec<Value>>> {
        self.step(Binding::Positional(values))
    }

    fn step_named(
        &mut self,
        values: &IndexMap<String, BindValue>,
    ) -> Result<Option<Vec<Value>>> {
        self.step(Binding::Named(values))
    }

    fn fetch_all_positional(&mut self, values: &[BindValue]) -> Result<Vec<Vec<Value>>> {
        self.fetch_all(Binding::Positional(values))
    }

    fn fetch_all_named(
        &mut self,
        values: &IndexMap<String, BindValue>,
    ) -> Result<Vec<Vec<Value>>> {
        self.fetch_all(Binding::Named(values))
    }

    fn column_names(&mut self) -> Result<Vec<String>> {
        self.with_raw(|db, stmt| unsafe {
            let count = ffi::sqlite3_column_count(stmt);
            (0..count)
                .map(|i| {
                    let name = ffi::sqlite3_column_name(stmt, i);
                    if name.is_null() {
                        return Err(native_error(db, ffi::SQLITE_NOMEM));
                    }
                    Ok(CStr::from_ptr(name).to_string_lossy().into_owned())
                })
                .collect()
        })
    }

    fn reset(&mut self) -> Result<()> {
        // The return code repeats the last step failure, which was already
        // reported by the call that hit it.
        self.with_raw(|_, stmt| {
            unsafe { ffi::sqlite3_reset(stmt) };
            Ok(())
        })
    }

    fn finalize(&mut self) -> Result<()> {
        let raw = self.raw.take().ok_or(Error::Finalized)?;
        let conn = self.conn.lock();
        let db = unsafe { conn.handle() };
        let rc = unsafe { ffi::sqlite3_finalize(raw.0.as_ptr()) };
        trace!("{} finalized statement", prefix::DB);
        if rc != ffi::SQLITE_OK {
            return Err(unsafe { native_error(db, rc) });
        }
        Ok(())
    }

    fn is_finalized(&self) -> bool {
        self.raw.is_none()
    }
}

impl Drop for SqliteStatement {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            let _conn = self.conn.lock();
            unsafe { ffi::sqlite3_finalize(raw.0.as_ptr()) };
            debug!("{} finalized statement on drop", prefix::DB);
        }
    }
}

fn engine_failure(code: c_int, message: &str) -> Error {
    Error::Database(rusqlite::Error::SqliteFailure(
        ffi::Error::new(code),
        Some(message.to_string()),
    ))
}

/// Capture the engine's error for `rc` from the connection.
///
/// # Safety
/// `db` must be a live connection handle whose lock is held.
unsafe fn native_error(db: *mut ffi::sqlite3, rc: c_int) -> Error {
    let msg = unsafe { ffi::sqlite3_errmsg(db) };
    let message = if msg.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned())
    };
    Error::Database(rusqlite::Error::SqliteFailure(ffi::Error::new(rc), message))
}

/// Replace every binding of `stmt`.
///
/// # Safety
/// `db` and `stmt` must be live, with the connection lock held.
unsafe fn bind(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    binding: Binding<'_>,
) -> Result<()> {
    unsafe { ffi::sqlite3_clear_bindings(stmt) };

    match binding {
        Binding::Positional(values) => {
            for (i, value) in values.iter().enumerate() {
                let index = c_int::try_from(i + 1)
                    .map_err(|_| engine_failure(ffi::SQLITE_RANGE, "too many parameters"))?;
                unsafe { bind_value(db, stmt, index, value) }?;
            }
        }
        Binding::Named(values) => {
            for (name, value) in values {
                let c_name = CString::new(name.as_str()).map_err(|_| {
                    Error::InvalidParameter(format!("parameter name {name:?} contains a nul byte"))
                })?;
                let index = unsafe { ffi::sqlite3_bind_parameter_index(stmt, c_name.as_ptr()) };
                if index == 0 {
                    return Err(Error::InvalidParameter(format!(
                        "no such bind parameter: {name}"
                    )));
                }
                unsafe { bind_value(db, stmt, index, value) }?;
            }
        }
    }

    Ok(())
}

/// # Safety
/// `db` and `stmt` must be live, with the connection lock held.
unsafe fn bind_value(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    index: c_int,
    value: &BindValue,
) -> Result<()> {
    let rc = unsafe {
        match value {
            BindValue::Null => ffi::sqlite3_bind_null(stmt, index),
            BindValue::Bool(b) => ffi::sqlite3_bind_int64(stmt, index, i64::from(*b)),
            BindValue::Integer(i) => ffi::sqlite3_bind_int64(stmt, index, *i),
            BindValue::Real(f) => ffi::sqlite3_bind_double(stmt, index, *f),
            BindValue::Text(s) => match c_int::try_from(s.len()) {
                Ok(len) => ffi::sqlite3_bind_text(
                    stmt,
                    index,
                    s.as_ptr().cast::<c_char>(),
                    len,
                    ffi::SQLITE_TRANSIENT(),
                ),
                Err(_) => ffi::SQLITE_TOOBIG,
            },
        }
    };

    if rc != ffi::SQLITE_OK {
        return Err(unsafe { native_error(db, rc) });
    }
    Ok(())
}

/// Step once, reading the row if there is one. The statement is reset when
/// the result set ends or the step fails.
///
/// # Safety
/// `db` and `stmt` must be live, with the connection lock held.
unsafe fn step_row(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
) -> Result<Option<Vec<Value>>> {
    match unsafe { ffi::sqlite3_step(stmt) } {
        ffi::SQLITE_ROW => Ok(Some(unsafe { read_row(stmt) })),
        ffi::SQLITE_DONE => {
            unsafe { ffi::sqlite3_reset(stmt) };
            Ok(None)
        }
        rc => {
            let err = unsafe { native_error(db, rc) };
            unsafe { ffi::sqlite3_reset(stmt) };
            Err(err)
        }
    }
}

/// # Safety
/// `stmt` must be positioned on a row.
unsafe fn read_row(stmt: *mut ffi::sqlite3_stmt) -> Vec<Value> {
    let count = unsafe { ffi::sqlite3_column_count(stmt) };
    (0..count).map(|i| unsafe { read_column(stmt, i) }).collect()
}

/// # Safety
/// `stmt` must be positioned on a row and `i` within its column count.
unsafe fn read_column(stmt: *mut ffi::sqlite3_stmt, i: c_int) -> Value {
    unsafe {
        match ffi::sqlite3_column_type(stmt, i) {
            ffi::SQLITE_INTEGER => Value::Integer(ffi::sqlite3_column_int64(stmt, i)),
            ffi::SQLITE_FLOAT => Value::Real(ffi::sqlite3_column_double(stmt, i)),
            ffi::SQLITE_TEXT => {
                // text before bytes: the length refers to the UTF-8 form
                let text = ffi::sqlite3_column_text(stmt, i);
                let len = ffi::sqlite3_column_bytes(stmt, i);
                Value::Text(String::from_utf8_lossy(column_bytes(text, len)).into_owned())
            }
            ffi::SQLITE_BLOB => {
                let blob = ffi::sqlite3_column_blob(stmt, i);
                let len = ffi::sqlite3_column_bytes(stmt, i);
                Value::Blob(column_bytes(blob.cast::<u8>(), len).to_vec())
            }
            _ => Value::Null,
        }
    }
}

/// # Safety
/// `ptr` must point at `len` readable bytes or be null.
unsafe fn column_bytes<'a>(ptr: *const u8, len: c_int) -> &'a [u8] {
    if ptr.is_null() || len <= 0 {
        return &[];
    }
    unsafe { std::slice::from_raw_parts(ptr, len as usize) }
}
