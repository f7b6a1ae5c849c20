//! Value types flowing through the agent chain: [`Request`] (what gets
//! persisted), [`RequestParameters`] (what an agent evaluates), and
//! [`AppInfo`] (prompt metadata).

use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ids::{Feature, Pid, Uid};

/// A textual identifier for a confined application, conventionally
/// `<package>_<app>_<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ApplicationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ApplicationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ApplicationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Wallclock time, nanoseconds since the Unix epoch. Plain integer
/// ordering is exact and collisions across distinct requests are
/// vanishingly unlikely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        let dur = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch");
        Self(dur.as_nanos() as i64)
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }
}

/// The user's answer to a trust prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Denied,
    Granted,
}

impl Answer {
    pub fn as_db_int(self) -> i64 {
        match self {
            Answer::Denied => 0,
            Answer::Granted => 1,
        }
    }

    pub fn from_db_int(v: i64) -> Option<Self> {
        match v {
            0 => Some(Answer::Denied),
            1 => Some(Answer::Granted),
            _ => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Granted => write!(f, "granted"),
            Answer::Denied => write!(f, "denied"),
        }
    }
}

/// A single persisted trust decision. Immutable after creation; equality
/// is structural over all four fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub from: ApplicationId,
    pub feature: Feature,
    pub when: Timestamp,
    pub answer: Answer,
}

/// Transient parameters an agent evaluates a single decision against.
/// Never persisted as-is; a [`Request`] is derived from it on a cache
/// write.
#[derive(Debug, Clone)]
pub struct RequestParameters {
    pub uid: Uid,
    pub pid: Pid,
    pub application_id: ApplicationId,
    pub feature: Feature,
    pub description: String,
}

/// Prompt metadata resolved for an application, used to render the
/// trust prompt (icon, localized display name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub icon_path: PathBuf,
    pub localized_name: String,
    pub application_id: ApplicationId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_equality_is_structural() {
        let a = Request {
            from: "app".into(),
            feature: Feature::new(0),
            when: Timestamp::from_nanos(100),
            answer: Answer::Granted,
        };
        let b = a.clone();
        assert_eq!(a, b);

        let mut c = a.clone();
        c.answer = Answer::Denied;
        assert_ne!(a, c);
    }

    #[test]
    fn answer_db_round_trip() {
        assert_eq!(Answer::from_db_int(Answer::Granted.as_db_int()), Some(Answer::Granted));
        assert_eq!(Answer::from_db_int(Answer::Denied.as_db_int()), Some(Answer::Denied));
        assert_eq!(Answer::from_db_int(2), None);
    }

    #[test]
    fn timestamp_now_is_monotonic_enough() {
        let a = Timestamp::now();
        let b = Timestamp::now();
        assert!(b.as_nanos() >= a.as_nanos());
    }
}
