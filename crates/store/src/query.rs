//! The [`Query`] cursor: armed with predicates, executed into a
//! materialized snapshot, then stepped with `current`/`next`/`erase`.
//!
//! Keeping a live prepared statement behind the cursor would need a
//! self-referential struct borrowing from `rusqlite::Connection`.
//! Instead the SELECT executes once into an owned `Vec` and the cursor
//! walks that — same observable lifecycle (armed →
//! has_more_results/eor → error), same snapshot consistency (a query
//! sees every write that happened-before its `execute`), no unsafe.

use tb_domain::{Answer, Error, Feature, Request, Result, Timestamp};

use crate::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Armed,
    HasMoreResults,
    Eor,
    Error,
}

pub struct Query<'s> {
    store: &'s Store,
    application_id: Option<String>,
    feature: Option<Feature>,
    interval: Option<(Timestamp, Timestamp)>,
    answer: Option<Answer>,
    status: Status,
    rows: Vec<(i64, Request)>,
    cursor: usize,
}

impl<'s> Query<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self {
            store,
            application_id: None,
            feature: None,
            interval: None,
            answer: None,
            status: Status::Armed,
            rows: Vec::new(),
            cursor: 0,
        }
    }

    pub fn for_application_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.application_id = Some(id.into());
        self
    }

    pub fn for_feature(&mut self, feature: Feature) -> &mut Self {
        self.feature = Some(feature);
        self
    }

    pub fn for_interval(&mut self, from: Timestamp, to: Timestamp) -> &mut Self {
        self.interval = Some((from, to));
        self
    }

    pub fn for_answer(&mut self, answer: Answer) -> &mut Self {
        self.answer = Some(answer);
        self
    }

    /// Clear all predicates; the query matches every row.
    pub fn all(&mut self) -> &mut Self {
        self.application_id = None;
        self.feature = None;
        self.interval = None;
        self.answer = None;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Run the accumulated conjunctive predicate and materialize the
    /// result set, most recent `when` first.
    pub fn execute(&mut self) -> Result<()> {
        let mut sql = String::from(
            "SELECT Id, ApplicationId, Feature, Timestamp, Answer FROM requests WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(app) = &self.application_id {
            sql.push_str(" AND ApplicationId = ?");
            params.push(Box::new(app.clone()));
        }
        if let Some(feature) = self.feature {
            sql.push_str(" AND Feature = ?");
            params.push(Box::new(feature.get() as i64));
        }
        if let Some((from, to)) = self.interval {
            sql.push_str(" AND Timestamp BETWEEN ? AND ?");
            params.push(Box::new(from.as_nanos()));
            params.push(Box::new(to.as_nanos()));
        }
        if let Some(answer) = self.answer {
            sql.push_str(" AND Answer = ?");
            params.push(Box::new(answer.as_db_int()));
        }
        sql.push_str(" ORDER BY Timestamp DESC");

        let result = self.run(&sql, &params);
        match result {
            Ok(rows) => {
                self.rows = rows;
                self.cursor = 0;
                self.status = if self.rows.is_empty() {
                    Status::Eor
                } else {
                    Status::HasMoreResults
                };
                Ok(())
            }
            Err(e) => {
                self.status = Status::Error;
                Err(e)
            }
        }
    }

    fn run(&self, sql: &str, params: &[Box<dyn rusqlite::ToSql>]) -> Result<Vec<(i64, Request)>> {
        let conn = self.store.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::Other(format!("query prepare failed: {e}")))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let id: i64 = row.get(0)?;
                let app_id: String = row.get(1)?;
                let feature: i64 = row.get(2)?;
                let when: i64 = row.get(3)?;
                let answer: i64 = row.get(4)?;
                Ok((
                    id,
                    Request {
                        from: app_id.into(),
                        feature: Feature::new(feature as u64),
                        when: Timestamp::from_nanos(when),
                        answer: Answer::from_db_int(answer).unwrap_or(Answer::Denied),
                    },
                ))
            })
            .map_err(|e| Error::Other(format!("query map failed: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| Error::Other(format!("row decode failed: {e}")))?);
        }
        Ok(out)
    }

    /// The request the cursor currently points at.
    pub fn current(&self) -> Result<Request> {
        if self.status == Status::Error {
            return Err(Error::QueryInErrorState);
        }
        self.rows
            .get(self.cursor)
            .map(|(_, r)| r.clone())
            .ok_or(Error::NoCurrentResult)
    }

    /// Advance the cursor by one row.
    pub fn next(&mut self) -> Result<()> {
        if self.status == Status::Error {
            return Err(Error::QueryInErrorState);
        }
        if self.cursor >= self.rows.len() {
            return Err(Error::NoCurrentResult);
        }
        self.cursor += 1;
        self.status = if self.cursor < self.rows.len() {
            Status::HasMoreResults
        } else {
            Status::Eor
        };
        Ok(())
    }

    /// Delete the row the cursor currently points at, then advance.
    pub fn erase(&mut self) -> Result<()> {
        if self.status == Status::Error {
            return Err(Error::QueryInErrorState);
        }
        let (id, _) = self.rows.get(self.cursor).cloned().ok_or(Error::NoCurrentResult)?;

        {
            let conn = self.store.lock();
            conn.execute("DELETE FROM requests WHERE Id = ?1", rusqlite::params![id])
                .map_err(|e| Error::Other(format!("erase failed: {e}")))?;
        }

        self.rows.remove(self.cursor);
        self.status = if self.cursor < self.rows.len() {
            Status::HasMoreResults
        } else {
            Status::Eor
        };
        Ok(())
    }
}
