//! Scripted native handle for facade unit tests

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::native::{NativeStatement, RunResult};
use crate::value::{BindValue, Value};

/// Which flavour of native call a facade issued
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Positional(Vec<BindValue>),
    Named(Vec<(String, BindValue)>),
}

/// Serves a fixed result set and records what the facade asked for
#[derive(Debug, Default)]
pub(crate) struct ScriptedStatement {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub cursor: usize,
    pub column_fetches: usize,
    pub resets: usize,
    pub calls: Vec<Call>,
    pub finalized: bool,
}

impl ScriptedStatement {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..Default::default()
        }
    }

    fn live(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::Finalized);
        }
        Ok(())
    }

    fn record_positional(&mut self, values: &[BindValue]) -> Result<()> {
        self.live()?;
        self.calls.push(Call::Positional(values.to_vec()));
        Ok(())
    }

    fn record_named(&mut self, values: &IndexMap<String, BindValue>) -> Result<()> {
        self.live()?;
        self.calls.push(Call::Named(
            values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        ));
        Ok(())
    }

    fn next_row(&mut self) -> Option<Vec<Value>> {
        let row = self.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
        }
        row
    }

    fn remaining(&mut self) -> Vec<Vec<Value>> {
        let rows = self.rows[self.cursor..].to_vec();
        self.cursor = self.rows.len();
        rows
    }

    fn executed(&mut self) -> RunResult {
        self.cursor = 0;
        RunResult {
            last_insert_rowid: self.rows.len() as i64,
            changes: 1,
        }
    }
}

impl NativeStatement for ScriptedStatement {
    fn run_positional(&mut self, values: &[BindValue]) -> Result<RunResult> {
        self.record_positional(values)?;
        Ok(self.executed())
    }

    fn run_named(&mut self, values: &IndexMap<String, BindValue>) -> Result<RunResult> {
        self.record_named(values)?;
        Ok(self.executed())
    }

    fn step_positional(&mut self, values: &[BindValue]) -> Result<Option<Vec<Value>>> {
        self.record_positional(values)?;
        Ok(self.next_row())
    }

    fn step_named(
        &mut self,
        values: &IndexMap<String, BindValue>,
    ) -> Result<Option<Vec<Value>>> {
        self.record_named(values)?;
        Ok(self.next_row())
    }

    fn fetch_all_positional(&mut self, values: &[BindValue]) -> Result<Vec<Vec<Value>>> {
        self.record_positional(values)?;
        Ok(self.remaining())
    }

    fn fetch_all_named(
        &mut self,
        values: &IndexMap<String, BindValue>,
    ) -> Result<Vec<Vec<Value>>> {
        self.record_named(values)?;
        Ok(self.remaining())
    }

    fn column_names(&mut self) -> Result<Vec<String>> {
        self.live()?;
        self.column_fetches += 1;
        Ok(self.columns.clone())
    }

    fn reset(&mut self) -> Result<()> {
        self.live()?;
        self.resets += 1;
        self.cursor = 0;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.live()?;
        self.finalized = true;
        Ok(())
    }

    fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// Three rows of `(id, name)`
pub(crate) fn three_rows() -> ScriptedStatement {
    ScriptedStatement::new(
        &["id", "name"],
        vec![
            vec![Value::Integer(1), Value::Text("a".into())],
            vec![Value::Integer(2), Value::Text("b".into())],
            vec![Value::Integer(3), Value::Text("c".into())],
        ],
    )
}
