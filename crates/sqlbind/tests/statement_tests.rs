//! Blocking statement tests against SQLite

use pretty_assertions::assert_eq;
use serde::Deserialize;
use sqlbind::{
    bind, named, BindArgs, BindValue, Database, DatabaseConfig, Error, NativeStatement, Statement,
    Value,
};

/// Helper to create a database with a populated users table
fn users_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE users (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL UNIQUE,
             score REAL,
             active INTEGER,
             avatar BLOB
         );
         INSERT INTO users (name, score, active) VALUES ('alice', 1.5, 1);
         INSERT INTO users (name, score, active) VALUES ('bob', 2.5, 0);
         INSERT INTO users (name, score, active) VALUES ('carol', NULL, 1);",
    )
    .unwrap();
    db
}

#[test]
fn test_run_returns_insert_id_and_changes() {
    let db = users_db();
    let mut insert = db
        .prepare("INSERT INTO users (name, score, active) VALUES (?, ?, ?)")
        .unwrap();

    let result = insert.run(("dave", 4.0, true)).unwrap();
    assert_eq!(result.last_insert_rowid, 4);
    assert_eq!(result.changes, 1);

    let mut update = db.prepare("UPDATE users SET active = 0").unwrap();
    let result = update.run(()).unwrap();
    assert_eq!(result.changes, 4);
}

#[test]
fn test_run_named_params() {
    let db = users_db();
    let mut insert = db
        .prepare("INSERT INTO users (name, score) VALUES (:name, :score)")
        .unwrap();

    insert
        .run(named! { ":name" => "erin", ":score" => 9.5 })
        .unwrap();

    let mut select = db
        .prepare("SELECT score FROM users WHERE name = ?")
        .unwrap();
    let row = select.get("erin").unwrap().unwrap();
    assert_eq!(row.get("score"), Some(&Value::Real(9.5)));
}

#[test]
fn test_get_first_row_or_none() {
    let db = users_db();
    let mut stmt = db
        .prepare("SELECT id, name FROM users WHERE name = $name")
        .unwrap();

    let row = stmt.get(named! { "$name" => "bob" }).unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Integer(2)));
    assert_eq!(row.get("name"), Some(&Value::Text("bob".into())));

    // the cursor was rewound, so different params take effect
    let row = stmt.get(named! { "$name" => "carol" }).unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Integer(3)));

    assert!(stmt.get(named! { "$name" => "nobody" }).unwrap().is_none());
}

#[test]
fn test_get_on_non_row_statement() {
    let db = users_db();
    let mut stmt = db.prepare("DELETE FROM users WHERE name = ?").unwrap();
    assert!(stmt.get("alice").unwrap().is_none());

    let mut count = db.prepare("SELECT COUNT(*) AS n FROM users").unwrap();
    assert_eq!(count.get(()).unwrap().unwrap().get("n"), Some(&Value::Integer(2)));
}

#[test]
fn test_each_yields_rows_in_order() {
    let db = users_db();
    let mut stmt = db.prepare("SELECT name FROM users ORDER BY id").unwrap();

    let names: Vec<Value> = stmt
        .each(())
        .map(|row| row.unwrap().get("name").cloned().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            Value::Text("alice".into()),
            Value::Text("bob".into()),
            Value::Text("carol".into()),
        ]
    );

    // exhausted iteration leaves the statement rewound
    assert_eq!(stmt.each(()).count(), 3);
}

#[test]
fn test_each_stops_after_three_rows() {
    let db = users_db();
    let mut stmt = db.prepare("SELECT id FROM users").unwrap();
    let mut rows = stmt.each(());

    assert!(rows.next().is_some());
    assert!(rows.next().is_some());
    assert!(rows.next().is_some());
    assert!(rows.next().is_none());
    assert!(rows.next().is_none());
}

#[test]
fn test_each_resumes_unless_reset() {
    let db = users_db();
    let mut stmt = db.prepare("SELECT id FROM users ORDER BY id").unwrap();

    let first = stmt.each(()).next().unwrap().unwrap();
    assert_eq!(first.get("id"), Some(&Value::Integer(1)));

    let rest: Vec<_> = stmt.each(()).collect::<Result<_, _>>().unwrap();
    assert_eq!(rest.len(), 2);

    stmt.each(()).next();
    stmt.reset().unwrap();
    assert_eq!(stmt.each(()).count(), 3);
}

#[test]
fn test_get_and_all_rebind_after_partial_each() {
    let db = users_db();
    let mut stmt = db
        .prepare("SELECT id FROM users WHERE id >= ? ORDER BY id")
        .unwrap();

    let first = stmt.each(1).next().unwrap().unwrap();
    assert_eq!(first.get("id"), Some(&Value::Integer(1)));

    let row = stmt.get(3).unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Integer(3)));

    stmt.each(1).next();
    let ids: Vec<_> = stmt
        .all(3)
        .unwrap()
        .iter()
        .map(|row| row.get("id").cloned())
        .collect();
    assert_eq!(ids, vec![Some(Value::Integer(3))]);
}

#[test]
fn test_run_rebinds_after_partial_each() {
    let db = users_db();
    let mut stmt = db
        .prepare("SELECT id FROM users WHERE id >= ? ORDER BY id")
        .unwrap();

    stmt.each(1).next();
    stmt.run(3).unwrap();

    // run leaves the statement idle, so the next iteration binds fresh
    let row = stmt.each(2).next().unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Integer(2)));
}

#[test]
fn test_all_rows() {
    let db = users_db();
    let mut stmt = db
        .prepare("SELECT name, score FROM users WHERE active = ? ORDER BY id")
        .unwrap();

    let rows = stmt.all(true).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        serde_json::to_value(&rows).unwrap(),
        serde_json::json!([
            {"name": "alice", "score": 1.5},
            {"name": "carol", "score": null},
        ])
    );

    let none = stmt.all(bind![7]).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_column_names_stable() {
    let db = users_db();
    let mut stmt = db.prepare("SELECT id AS user_id, name FROM users").unwrap();

    let first = stmt.column_names().unwrap().to_vec();
    stmt.all(()).unwrap();
    let second = stmt.column_names().unwrap().to_vec();

    assert_eq!(first, vec!["user_id", "name"]);
    assert_eq!(first, second);
}

#[test]
fn test_bindings_do_not_persist() {
    let db = users_db();
    let mut stmt = db.prepare("SELECT ? AS a, ? AS b").unwrap();

    let row = stmt.get(bind![1, 2]).unwrap().unwrap();
    assert_eq!(row.get("b"), Some(&Value::Integer(2)));

    // unbound parameters read as NULL on the next call
    let row = stmt.get(1).unwrap().unwrap();
    assert_eq!(row.get("a"), Some(&Value::Integer(1)));
    assert_eq!(row.get("b"), Some(&Value::Null));
}

#[test]
fn test_value_types_round_trip() {
    let db = users_db();
    let mut stmt = db
        .prepare("SELECT ? AS t, ? AS i, ? AS r, ? AS n, ? AS b, x'0102' AS blob")
        .unwrap();

    let row = stmt
        .get(BindArgs::positional([
            BindValue::from("text"),
            BindValue::from(42),
            BindValue::from(0.5),
            BindValue::Null,
            BindValue::from(false),
        ]))
        .unwrap()
        .unwrap();

    assert_eq!(row.get("t"), Some(&Value::Text("text".into())));
    assert_eq!(row.get("i"), Some(&Value::Integer(42)));
    assert_eq!(row.get("r"), Some(&Value::Real(0.5)));
    assert_eq!(row.get("n"), Some(&Value::Null));
    assert_eq!(row.get("b"), Some(&Value::Integer(0)));
    assert_eq!(row.get("blob"), Some(&Value::Blob(vec![1, 2])));
}

#[test]
fn test_decode_rows() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        score: Option<f64>,
    }

    let db = users_db();
    let mut stmt = db
        .prepare("SELECT id, name, score FROM users ORDER BY id")
        .unwrap();

    let users: Vec<User> = stmt
        .all(())
        .unwrap()
        .iter()
        .map(|row| row.decode().unwrap())
        .collect();

    assert_eq!(
        users[2],
        User {
            id: 3,
            name: "carol".into(),
            score: None,
        }
    );
}

#[test]
fn test_constraint_violation_propagates() {
    let db = users_db();
    let mut insert = db.prepare("INSERT INTO users (name) VALUES (?)").unwrap();

    let err = insert.run("alice").unwrap_err();
    match err {
        Error::Database(rusqlite::Error::SqliteFailure(code, Some(message))) => {
            assert_eq!(code.code, rusqlite::ErrorCode::ConstraintViolation);
            assert!(message.contains("UNIQUE"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // the statement is still usable afterwards
    assert_eq!(insert.run("zed").unwrap().changes, 1);
}

#[test]
fn test_unknown_named_parameter() {
    let db = users_db();
    let mut stmt = db
        .prepare("SELECT * FROM users WHERE name = :name")
        .unwrap();
    let err = stmt.get(named! { ":nope" => 1 }).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn test_too_many_positional_parameters() {
    let db = users_db();
    let mut stmt = db.prepare("SELECT ?").unwrap();
    let err = stmt.get(bind![1, 2]).unwrap_err();
    assert!(matches!(err, Error::Database(_)));
}

#[test]
fn test_finalize() {
    let db = users_db();
    let stmt = db.prepare("SELECT 1").unwrap();
    stmt.finalize().unwrap();
}

#[test]
fn test_operations_after_native_finalize_fail() {
    let db = users_db();
    let mut native = db.prepare_native("SELECT name FROM users").unwrap();
    native.finalize().unwrap();

    let mut stmt = Statement::new(native);
    assert!(matches!(stmt.run(()), Err(Error::Finalized)));
    assert!(matches!(stmt.get(()), Err(Error::Finalized)));
    assert!(matches!(stmt.all(()), Err(Error::Finalized)));
    assert!(matches!(stmt.column_names(), Err(Error::Finalized)));
    assert!(matches!(stmt.each(()).next(), Some(Err(Error::Finalized))));
    assert!(matches!(stmt.finalize(), Err(Error::Finalized)));
}

#[test]
fn test_drop_finalizes_open_cursor() {
    let db = users_db();
    let mut stmt = db.prepare("SELECT id FROM users").unwrap();
    assert!(stmt.each(()).next().is_some());

    // an active read cursor locks the table
    assert!(db.execute_batch("DROP TABLE users").is_err());

    drop(stmt);
    db.execute_batch("DROP TABLE users").unwrap();
}

#[test]
fn test_statement_keeps_connection_alive() {
    let stmt = {
        let db = users_db();
        db.prepare("SELECT COUNT(*) AS n FROM users").unwrap()
    };
    let mut stmt = stmt;
    assert_eq!(stmt.get(()).unwrap().unwrap().get("n"), Some(&Value::Integer(3)));
}

#[test]
fn test_file_backed_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");

    {
        let db = Database::open(&path).unwrap();
        db
            .execute_batch("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)")
            .unwrap();
        let mut insert = db.prepare("INSERT INTO kv VALUES (?, ?)").unwrap();
        insert.run(("a", "1")).unwrap();
    }

    let config = DatabaseConfig {
        read_only: true,
        ..DatabaseConfig::file(&path)
    };
    let db = Database::open_with(&config).unwrap();
    let mut select = db.prepare("SELECT v FROM kv WHERE k = ?").unwrap();
    assert_eq!(
        select.get("a").unwrap().unwrap().get("v"),
        Some(&Value::Text("1".into()))
    );

    let mut insert = db.prepare("INSERT INTO kv VALUES ('b', '2')").unwrap();
    assert!(matches!(insert.run(()), Err(Error::Database(_))));
}

#[test]
fn test_foreign_keys_enforced_by_default() {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE parent (id INTEGER PRIMARY KEY);
         CREATE TABLE child (parent_id INTEGER REFERENCES parent(id));",
    )
    .unwrap();

    let mut insert = db.prepare("INSERT INTO child VALUES (?)").unwrap();
    assert!(insert.run(1).is_err());
}
