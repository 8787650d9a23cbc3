//! C-compatible FFI interface for databases and statements
//!
//! Exposes the statement facade through a C ABI so a host runtime can drive
//! it. Parameters go in and rows come out as JSON.
//!
//! # Memory Ownership Rules
//!
//! - `sqlbind_db_open()` allocates on Rust heap, caller owns pointer and
//!   releases it with `sqlbind_db_free()`
//! - Statement handles from `sqlbind_prepare()` are released with
//!   `sqlbind_stmt_free()`, finalized or not
//! - Error messages and JSON results are owned by the caller and freed with
//!   the matching `*_result_free()` function
//! - Strings passed in are copied, caller retains ownership
//!
//! # Parameters JSON
//!
//! - NULL pointer or `null`: no parameters
//! - array: positional, `[1, "a", null, true]`
//! - object: named, `{"$id": 1}`
//! - any other scalar: a single positional value
//!
//! Nested arrays or objects as values are rejected.
//!
//! # Statement state
//!
//! A handle starts Prepared. `sqlbind_stmt_finalize()` moves it to Finalized;
//! after that every call except `sqlbind_stmt_free()` fails with an
//! invalid-state message.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::params::BindArgs;
use crate::{Database, DatabaseConfig, Error, Statement};

// Safety limits
const MAX_JSON_LENGTH: usize = 1_000_000; // 1MB
const MAX_SQL_LENGTH: usize = 1_000_000;

const ERROR_FALLBACK: &str = "error message contains null";

/// Opaque database handle
pub struct DatabaseHandle {
    db: Database,
}

/// Opaque statement handle; `None` once finalized
pub struct StatementHandle {
    statement: Option<Statement>,
}

/// C-compatible status result
#[repr(C)]
pub struct StatusResultC {
    pub success: bool,
    pub error_msg: *mut c_char,
}

/// C-compatible JSON result; `json` is NULL for an absent row
#[repr(C)]
pub struct JsonResultC {
    pub success: bool,
    pub error_msg: *mut c_char,
    pub json: *mut c_char,
}

/// C-compatible prepare result
#[repr(C)]
pub struct StatementResultC {
    pub success: bool,
    pub error_msg: *mut c_char,
    pub statement: *mut StatementHandle,
}

fn error_cstring(msg: &str) -> *mut c_char {
    CString::new(msg)
        .unwrap_or_else(|_| CString::new(ERROR_FALLBACK).unwrap_or_default())
        .into_raw()
}

impl StatusResultC {
    fn ok() -> Self {
        Self {
            success: true,
            error_msg: ptr::null_mut(),
        }
    }

    fn error(msg: &str) -> Self {
        Self {
            success: false,
            error_msg: error_cstring(msg),
        }
    }
}

impl JsonResultC {
    fn ok(json: String) -> Self {
        Self {
            success: true,
            error_msg: ptr::null_mut(),
            json: CString::new(json).unwrap_or_default().into_raw(),
        }
    }

    fn absent() -> Self {
        Self {
            success: true,
            error_msg: ptr::null_mut(),
            json: ptr::null_mut(),
        }
    }

    fn error(msg: &str) -> Self {
        Self {
            success: false,
            error_msg: error_cstring(msg),
            json: ptr::null_mut(),
        }
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => Self::ok(json),
            Err(e) => Self::error(&format!("failed to serialize: {}", e)),
        }
    }
}

impl StatementResultC {
    fn ok(statement: Statement) -> Self {
        Self {
            success: true,
            error_msg: ptr::null_mut(),
            statement: Box::into_raw(Box::new(StatementHandle {
                statement: Some(statement),
            })),
        }
    }

    fn error(msg: &str) -> Self {
        Self {
            success: false,
            error_msg: error_cstring(msg),
            statement: ptr::null_mut(),
        }
    }
}

/// Read a C string argument, enforcing a length cap
fn read_str<'a>(ptr: *const c_char, what: &str, max_len: usize) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("null {}", what));
    }
    let s = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| format!("invalid UTF-8 in {}", what))?;
    if s.len() > max_len {
        return Err(format!("{} exceeds maximum length", what));
    }
    Ok(s)
}

/// Parse parameters JSON; NULL means no parameters
fn read_params(params_json: *const c_char) -> Result<BindArgs, String> {
    if params_json.is_null() {
        return Ok(BindArgs::None);
    }
    let json = read_str(params_json, "params JSON", MAX_JSON_LENGTH)?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("failed to parse params JSON: {}", e))?;
    BindArgs::try_from(value).map_err(|e| e.to_string())
}

/// Borrow the live statement behind a handle
fn live_statement<'a>(stmt: *mut StatementHandle) -> Result<&'a mut Statement, String> {
    if stmt.is_null() {
        return Err("null statement pointer".to_string());
    }
    let handle = unsafe { &mut *stmt };
    handle
        .statement
        .as_mut()
        .ok_or_else(|| Error::Finalized.to_string())
}

/// Statement and parameters for a bind-taking call
fn call_args<'a>(
    stmt: *mut StatementHandle,
    params_json: *const c_char,
) -> Result<(&'a mut Statement, BindArgs), String> {
    let statement = live_statement(stmt)?;
    let params = read_params(params_json)?;
    Ok((statement, params))
}

// ============================================================================
// Database Lifecycle
// ============================================================================

/// Open a database. `config_json` may be NULL for an in-memory database.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_db_open(config_json: *const c_char) -> *mut DatabaseHandle {
    let config = if config_json.is_null() {
        DatabaseConfig::default()
    } else {
        let json = match read_str(config_json, "config JSON", MAX_JSON_LENGTH) {
            Ok(s) => s,
            Err(_) => return ptr::null_mut(),
        };
        match DatabaseConfig::from_json(json) {
            Ok(c) => c,
            Err(_) => return ptr::null_mut(),
        }
    };

    match Database::open_with(&config) {
        Ok(db) => Box::into_raw(Box::new(DatabaseHandle { db })),
        Err(_) => ptr::null_mut(),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_db_exec(db: *mut DatabaseHandle, sql: *const c_char) -> StatusResultC {
    if db.is_null() {
        return StatusResultC::error("null database pointer");
    }
    let sql = match read_str(sql, "SQL", MAX_SQL_LENGTH) {
        Ok(s) => s,
        Err(e) => return StatusResultC::error(&e),
    };

    let handle = unsafe { &*db };
    match handle.db.execute_batch(sql) {
        Ok(()) => StatusResultC::ok(),
        Err(e) => StatusResultC::error(&format!("{}", e)),
    }
}

/// Free a database handle. Statements prepared from it stay usable.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_db_free(db: *mut DatabaseHandle) {
    if !db.is_null() {
        unsafe {
            let _ = Box::from_raw(db);
        }
    }
}

// ============================================================================
// Statement Operations
// ============================================================================

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_prepare(db: *mut DatabaseHandle, sql: *const c_char) -> StatementResultC {
    if db.is_null() {
        return StatementResultC::error("null database pointer");
    }
    let sql = match read_str(sql, "SQL", MAX_SQL_LENGTH) {
        Ok(s) => s,
        Err(e) => return StatementResultC::error(&e),
    };

    let handle = unsafe { &*db };
    match handle.db.prepare(sql) {
        Ok(statement) => StatementResultC::ok(statement),
        Err(e) => StatementResultC::error(&format!("{}", e)),
    }
}

/// Execute; returns `{"lastInsertRowId": .., "changes": ..}`
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_run(
    stmt: *mut StatementHandle,
    params_json: *const c_char,
) -> JsonResultC {
    let (statement, params) = match call_args(stmt, params_json) {
        Ok(v) => v,
        Err(e) => return JsonResultC::error(&e),
    };

    match statement.run(params) {
        Ok(result) => JsonResultC::serialize(&result),
        Err(e) => JsonResultC::error(&format!("{}", e)),
    }
}

/// First row as a JSON object, or NULL `json` when there is none
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_get(
    stmt: *mut StatementHandle,
    params_json: *const c_char,
) -> JsonResultC {
    let (statement, params) = match call_args(stmt, params_json) {
        Ok(v) => v,
        Err(e) => return JsonResultC::error(&e),
    };

    match statement.get(params) {
        Ok(Some(row)) => JsonResultC::serialize(&row),
        Ok(None) => JsonResultC::absent(),
        Err(e) => JsonResultC::error(&format!("{}", e)),
    }
}

/// One `each` step: the next row, or NULL `json` once exhausted.
///
/// Parameters only take effect when a fresh iteration begins.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_next(
    stmt: *mut StatementHandle,
    params_json: *const c_char,
) -> JsonResultC {
    let (statement, params) = match call_args(stmt, params_json) {
        Ok(v) => v,
        Err(e) => return JsonResultC::error(&e),
    };

    match statement.each(params).next() {
        Some(Ok(row)) => JsonResultC::serialize(&row),
        None => JsonResultC::absent(),
        Some(Err(e)) => JsonResultC::error(&format!("{}", e)),
    }
}

/// All remaining rows as a JSON array of objects
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_all(
    stmt: *mut StatementHandle,
    params_json: *const c_char,
) -> JsonResultC {
    let (statement, params) = match call_args(stmt, params_json) {
        Ok(v) => v,
        Err(e) => return JsonResultC::error(&e),
    };

    match statement.all(params) {
        Ok(rows) => JsonResultC::serialize(&rows),
        Err(e) => JsonResultC::error(&format!("{}", e)),
    }
}

/// Column names as a JSON array of strings
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_columns(stmt: *mut StatementHandle) -> JsonResultC {
    let statement = match live_statement(stmt) {
        Ok(s) => s,
        Err(e) => return JsonResultC::error(&e),
    };

    match statement.column_names() {
        Ok(names) => JsonResultC::serialize(&names),
        Err(e) => JsonResultC::error(&format!("{}", e)),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_reset(stmt: *mut StatementHandle) -> StatusResultC {
    let statement = match live_statement(stmt) {
        Ok(s) => s,
        Err(e) => return StatusResultC::error(&e),
    };

    match statement.reset() {
        Ok(()) => StatusResultC::ok(),
        Err(e) => StatusResultC::error(&format!("{}", e)),
    }
}

/// Release the native statement. The handle itself stays allocated until
/// `sqlbind_stmt_free()`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_finalize(stmt: *mut StatementHandle) -> StatusResultC {
    if stmt.is_null() {
        return StatusResultC::error("null statement pointer");
    }

    let handle = unsafe { &mut *stmt };
    let Some(statement) = handle.statement.take() else {
        return StatusResultC::error(&Error::Finalized.to_string());
    };

    match statement.finalize() {
        Ok(()) => StatusResultC::ok(),
        Err(e) => StatusResultC::error(&format!("{}", e)),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn sqlbind_stmt_free(stmt: *mut StatementHandle) {
    if !stmt.is_null() {
        unsafe {
            let _ = Box::from_raw(stmt);
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

#[no_mangle]
pub extern "C" fn sqlbind_status_result_free(result: StatusResultC) {
    if !result.error_msg.is_null() {
        unsafe {
            let _ = CString::from_raw(result.error_msg);
        }
    }
}

#[no_mangle]
pub extern "C" fn sqlbind_json_result_free(result: JsonResultC) {
    if !result.error_msg.is_null() {
        unsafe {
            let _ = CString::from_raw(result.error_msg);
        }
    }
    if !result.json.is_null() {
        unsafe {
            let _ = CString::from_raw(result.json);
        }
    }
}

/// Frees the error message only; the statement is freed with
/// `sqlbind_stmt_free()`.
#[no_mangle]
pub extern "C" fn sqlbind_statement_result_free(result: StatementResultC) {
    if !result.error_msg.is_null() {
        unsafe {
            let _ = CString::from_raw(result.error_msg);
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

#[no_mangle]
pub extern "C" fn sqlbind_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
