use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::{Handler, StepContext, Verb, required};
use crate::error::ProbeError;

/// `SQL <query> <connection>` against a SQLite database.
///
/// The database must already exist; it is opened read-write without create
/// so a wrong path shows up as a failure instead of an empty new file.
pub struct SqlHandler;

fn database_path(connection: &str) -> &str {
    connection
        .strip_prefix("sqlite://")
        .or_else(|| connection.strip_prefix("sqlite:"))
        .unwrap_or(connection)
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => STANDARD.encode(b),
    }
}

/// Column header line, then one line per row, all `;`-joined.
fn run_query(connection: &str, query: &str) -> Result<String, ProbeError> {
    let conn = Connection::open_with_flags(
        database_path(connection),
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let mut stmt = conn.prepare(query)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();

    let mut lines = vec![columns.join(";")];
    let mut rows = stmt.query([])?;
    let mut found = false;
    while let Some(row) = rows.next()? {
        found = true;
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(render_value))
            .collect::<Result<Vec<_>, _>>()?;
        lines.push(values.join(";"));
    }
    if !found {
        lines.push("No rows found.".to_string());
    }
    Ok(lines.join("\n"))
}

#[async_trait]
impl Handler for SqlHandler {
    fn verb(&self) -> Verb {
        Verb::Sql
    }

    fn usage(&self) -> &str {
        "\"<query>\" <database path | sqlite://path | :memory:>"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let query = required(Verb::Sql, args, 0, "query")?.to_string();
        let connection = required(Verb::Sql, args, 1, "connection")?.to_string();

        tokio::task::spawn_blocking(move || run_query(&connection, &query))
            .await
            .map_err(|e| ProbeError::Io(std::io::Error::other(e)))?
    }
}
