use std::time::{Duration, Instant};

use diesel::connection::SimpleConnection;
use diesel::query_dsl::methods::ExecuteDsl;
use diesel::RunQueryDsl;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError, QueryResult};
use diesel::sqlite::SqliteConnection;
use tracing::{debug, warn};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Longest total time a write keeps retrying while the database is locked
const MAX_LOCK_WAIT: Duration = Duration::from_secs(5);

/// First backoff step for lock retries, doubled on each attempt
const INITIAL_LOCK_BACKOFF: Duration = Duration::from_millis(10);

/// Ceiling for a single lock-retry backoff step
const MAX_LOCK_BACKOFF: Duration = Duration::from_secs(1);

/// Applies per-connection pragmas when r2d2 hands out a connection
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 2000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool for the given SQLite URL
///
/// ### Arguments
///
/// * `database_url` - A file path or SQLite URI (`file:...?mode=memory&cache=shared`)
///
/// ### Errors
///
/// Returns an error if the pool cannot open its initial connections.
pub fn init_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)?;
    Ok(pool)
}

/// Whether a diesel error is SQLite reporting a lock held by another writer
pub fn is_lock_error(err: &DieselError) -> bool {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::Unknown, info) => {
            let message = info.message();
            message.contains("database is locked") || message.contains("database table is locked")
        }
        _ => false,
    }
}

/// Runs a write, retrying with exponential backoff while SQLite reports a lock
///
/// Any other error is returned immediately. Once `MAX_LOCK_WAIT` has elapsed
/// the last lock error is returned.
///
/// ### Arguments
///
/// * `conn` - The connection to run the operation on
/// * `op` - The operation; it is called once per attempt
pub async fn execute_with_retry<T, F>(conn: &mut SqliteConnection, mut op: F) -> QueryResult<T>
where
    F: FnMut(&mut SqliteConnection) -> QueryResult<T>,
{
    let started = Instant::now();
    let mut backoff = INITIAL_LOCK_BACKOFF;
    let mut attempt = 1u32;

    loop {
        match op(conn) {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, elapsed_ms = started.elapsed().as_millis() as u64, "Write succeeded after lock retries");
                }
                return Ok(value);
            }
            Err(err) if is_lock_error(&err) && started.elapsed() < MAX_LOCK_WAIT => {
                warn!(attempt, backoff_ms = backoff.as_millis() as u64, "Database is locked, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_LOCK_BACKOFF);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Adds a lock-retrying `execute` to diesel statements
pub trait ExecuteWithRetry: Sized {
    /// Executes the statement through [`execute_with_retry`]
    fn execute_with_retry(self, conn: &mut SqliteConnection) -> impl Future<Output = QueryResult<usize>> + Send;
}

impl<Q> ExecuteWithRetry for Q
where
    Q: RunQueryDsl<SqliteConnection> + ExecuteDsl<SqliteConnection> + Clone + Send,
{
    async fn execute_with_retry(self, conn: &mut SqliteConnection) -> QueryResult<usize> {
        execute_with_retry(conn, move |c| self.clone().execute(c)).await
    }
}
