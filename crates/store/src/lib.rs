//! Persistent decision store.
//!
//! Backed by SQLite via `rusqlite`, with a `requests` table: `Id,
//! ApplicationId, Feature, Timestamp, Answer`. All access is
//! serialized through a single `parking_lot::Mutex<Connection>` — the
//! store is shared by many concurrent agent chains but SQLite itself
//! only tolerates one writer.

mod query;
pub mod expose;

pub use query::{Query, Status};

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::Connection;
use tb_domain::{Error, Request, Result};

/// Handle to the per-service SQLite-backed request store.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if necessary) the store for `service_name` under
    /// `override_path`, or the XDG data directory when `None`.
    pub fn open_for_service(service_name: &str, override_path: Option<&Path>) -> Result<Self> {
        let path = match override_path {
            Some(p) => p.to_path_buf(),
            None => default_path(service_name)?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        let conn = Connection::open(&path)
            .map_err(|e| Error::StoreOpen(format!("{}: {e}", path.display())))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and by the `--ephemeral` broker flag.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::StoreOpen(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS requests (
                Id INTEGER PRIMARY KEY AUTOINCREMENT,
                ApplicationId TEXT NOT NULL,
                Feature INTEGER NOT NULL,
                Timestamp INTEGER NOT NULL,
                Answer INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS requests_app_feature
                ON requests (ApplicationId, Feature);",
        )
        .map_err(|e| Error::StoreOpen(e.to_string()))?;
        Ok(())
    }

    /// Erase every persisted decision. Used on schema mismatch or by the
    /// admin `reset` operation exposed to the confined service.
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM requests", [])
            .map_err(|e| Error::StoreReset(e.to_string()))?;
        Ok(())
    }

    /// Persist a new decision.
    pub fn add(&self, request: &Request) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO requests (ApplicationId, Feature, Timestamp, Answer) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                request.from.as_str(),
                request.feature.get() as i64,
                request.when.as_nanos(),
                request.answer.as_db_int(),
            ],
        )
        .map_err(|e| Error::Other(format!("insert failed: {e}")))?;
        Ok(())
    }

    /// Start a new query against this store. The query is armed: set
    /// predicates, then call [`Query::execute`].
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    fn lock(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

fn default_path(service_name: &str) -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| Error::StoreOpen("no XDG data directory available".to_owned()))?;
    Ok(base.join("trust-store").join(format!("{service_name}.sqlite")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_domain::{Answer, Feature, Timestamp};

    fn sample(app: &str, feature: u64, nanos: i64, answer: Answer) -> Request {
        Request {
            from: app.into(),
            feature: Feature::new(feature),
            when: Timestamp::from_nanos(nanos),
            answer,
        }
    }

    #[test]
    fn add_and_query_all_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store.add(&sample("app_a_1.0", 1, 10, Answer::Granted)).unwrap();
        store.add(&sample("app_b_1.0", 2, 20, Answer::Denied)).unwrap();

        let mut q = store.query();
        q.all();
        q.execute().unwrap();

        let mut seen = Vec::new();
        while q.status() == Status::HasMoreResults {
            seen.push(q.current().unwrap());
            q.next().unwrap();
        }
        assert_eq!(q.status(), Status::Eor);
        assert_eq!(seen.len(), 2);
        // most recent (higher timestamp) first
        assert_eq!(seen[0].from.as_str(), "app_b_1.0");
    }

    #[test]
    fn reset_clears_all_rows() {
        let store = Store::open_in_memory().unwrap();
        store.add(&sample("app_a_1.0", 1, 10, Answer::Granted)).unwrap();
        store.reset().unwrap();

        let mut q = store.query();
        q.all();
        q.execute().unwrap();
        assert_eq!(q.status(), Status::Eor);
    }

    #[test]
    fn query_for_application_and_feature_picks_most_recent() {
        let store = Store::open_in_memory().unwrap();
        store.add(&sample("app_a_1.0", 1, 10, Answer::Denied)).unwrap();
        store.add(&sample("app_a_1.0", 1, 20, Answer::Granted)).unwrap();
        store.add(&sample("app_a_1.0", 2, 30, Answer::Denied)).unwrap();

        let mut q = store.query();
        q.for_application_id("app_a_1.0").for_feature(Feature::new(1));
        q.execute().unwrap();

        assert_eq!(q.status(), Status::HasMoreResults);
        let hit = q.current().unwrap();
        assert_eq!(hit.answer, Answer::Granted);
        assert_eq!(hit.when.as_nanos(), 20);
    }

    #[test]
    fn query_without_execute_has_no_current_result() {
        let store = Store::open_in_memory().unwrap();
        let q = store.query();
        assert!(matches!(q.current(), Err(Error::NoCurrentResult)));
    }

    #[test]
    fn for_interval_with_equal_bounds_matches_the_exact_timestamp() {
        let store = Store::open_in_memory().unwrap();
        store.add(&sample("app_a_1.0", 1, 10, Answer::Granted)).unwrap();
        store.add(&sample("app_a_1.0", 1, 20, Answer::Denied)).unwrap();

        let mut q = store.query();
        q.for_interval(Timestamp::from_nanos(20), Timestamp::from_nanos(20));
        q.execute().unwrap();

        assert_eq!(q.status(), Status::HasMoreResults);
        let hit = q.current().unwrap();
        assert_eq!(hit.when.as_nanos(), 20);
        q.next().unwrap();
        assert_eq!(q.status(), Status::Eor);
    }

    #[test]
    fn erase_removes_row_and_advances() {
        let store = Store::open_in_memory().unwrap();
        store.add(&sample("app_a_1.0", 1, 10, Answer::Granted)).unwrap();
        store.add(&sample("app_a_1.0", 1, 20, Answer::Granted)).unwrap();

        let mut q = store.query();
        q.for_application_id("app_a_1.0");
        q.execute().unwrap();
        q.erase().unwrap();
        assert_eq!(q.status(), Status::HasMoreResults);
        q.next().unwrap();
        assert_eq!(q.status(), Status::Eor);

        let mut verify = store.query();
        verify.all();
        verify.execute().unwrap();
        let mut count = 0;
        while verify.status() == Status::HasMoreResults {
            count += 1;
            verify.next().unwrap();
        }
        assert_eq!(count, 1);
    }
}
