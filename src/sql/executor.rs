use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use rusqlite::{Connection, OpenFlags, types::Value};

use super::{Error, QueryDefinition, QueryResult, compat};

/// Where report queries are run.
#[derive(Clone, Debug)]
pub struct DataSource {
    /// SQLite database path or `file:` URI.
    pub database: String,

    /// SQL that seeds the database before the report queries.
    ///
    /// An in-memory database is seeded on every connection; a database file
    /// is seeded once per [`DataSource`] (shared by its clones).
    pub init_sql: Option<String>,

    /// Upper bound for running the whole report.
    pub timeout: Duration,

    seeded: Arc<Mutex<bool>>,
}

impl DataSource {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            init_sql: None,
            timeout: Duration::from_secs(5),
            seeded: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_init_sql(mut self, init_sql: impl Into<String>) -> Self {
        self.init_sql = Some(init_sql.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether every connection sees a fresh, empty database.
    pub fn is_in_memory(&self) -> bool {
        self.database == ":memory:"
            || self.database.starts_with("file::memory:")
            || (self.database.starts_with("file:") && self.database.contains("mode=memory"))
    }

    fn open(&self) -> Result<Connection, Error> {
        // Only a seeded database needs to be writable.
        let access = if self.init_sql.is_some() {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        } else {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        };
        let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn =
            Connection::open_with_flags(&self.database, flags).map_err(Error::OpenDatabase)?;
        conn.busy_timeout(Duration::from_secs(3))
            .map_err(Error::OpenDatabase)?;
        compat::register(&conn).map_err(Error::RegisterFunctions)?;

        Ok(conn)
    }

    /// Run the init script on `conn` unless this database file is already
    /// seeded.
    fn seed(&self, conn: &Connection) -> Result<(), Error> {
        let Some(init_sql) = &self.init_sql else {
            return Ok(());
        };
        if self.is_in_memory() {
            return conn
                .execute_batch(init_sql)
                .map_err(Error::ExecuteInitialSql);
        }

        let mut seeded = self.seeded.lock().unwrap_or_else(PoisonError::into_inner);
        if !*seeded {
            conn.execute_batch(init_sql)
                .map_err(Error::ExecuteInitialSql)?;
            *seeded = true;
        }
        Ok(())
    }
}

/// Run every definition in order and collect the results.
///
/// A definition that fails to run is logged and left out; failing to open
/// the database fails the whole report. Once the timeout expires no further
/// definition is started.
pub async fn execute_report(
    source: &DataSource,
    definitions: &[QueryDefinition],
) -> Result<Vec<QueryResult>, Error> {
    let source = source.clone();
    let definitions = definitions.to_vec();
    let timeout = source.timeout;

    let cancelled = Arc::new(AtomicBool::new(false));
    let (interrupt_tx, mut interrupt_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::task::spawn_blocking({
        let cancelled = Arc::clone(&cancelled);
        move || {
            let conn = source.open()?;
            let _ = interrupt_tx.send(conn.get_interrupt_handle());
            source.seed(&conn)?;

            let mut results = Vec::with_capacity(definitions.len());
            for (index, definition) in definitions.into_iter().enumerate() {
                if cancelled.load(Ordering::Acquire) {
                    tracing::debug!(index, "report cancelled");
                    return Err(Error::QueryTimedOut);
                }

                match run_query(&conn, &definition.query) {
                    Ok((header, rows)) => {
                        tracing::debug!(index, rows = rows.len(), "query finished");
                        results.push(QueryResult {
                            description: definition.description,
                            query: definition.query,
                            header,
                            rows,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(index, description = %definition.description, "skipping query: {e}");
                    }
                }
            }

            Ok::<_, Error>(results)
        }
    });
    let timeout_result = tokio::time::timeout(timeout, handle).await;

    match timeout_result {
        Err(_) => {
            // Set the flag before interrupting so the interrupted statement
            // is the last one run.
            cancelled.store(true, Ordering::Release);
            if let Ok(interrupt) = interrupt_rx.try_recv() {
                interrupt.interrupt();
            }
            Err(Error::QueryTimedOut)
        }
        Ok(Err(e)) => Err(Error::RetrieveResult(e)),
        Ok(Ok(Err(e))) => Err(e),
        Ok(Ok(Ok(results))) => Ok(results),
    }
}

type Rows = Vec<Vec<Option<String>>>;

fn run_query(conn: &Connection, query: &str) -> Result<(Vec<String>, Rows), Error> {
    let mut stmt = conn.prepare(query).map_err(Error::ExecuteQuery)?;
    let column_count = stmt.column_count();
    let header = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<String>>();

    let rows = stmt
        .query_map((), |row| {
            let mut row_data = Vec::with_capacity(column_count);
            for i in 0..column_count {
                row_data.push(cell_text(row.get::<_, Value>(i)?));
            }
            Ok(row_data)
        })
        .map_err(Error::ExecuteQuery)?
        .collect::<Result<Rows, rusqlite::Error>>()
        .map_err(Error::TransformQueryResult)?;

    Ok((header, rows))
}

fn cell_text(cell: Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).to_string()),
    }
}
