//! Session registry: `uid -> session`, at most one entry per uid.
//! Mutation is serialized through a single `RwLock`.

use std::collections::HashMap;

use parking_lot::RwLock;
use tb_domain::{Gid, Pid, Uid};

#[derive(Debug, Clone, Copy)]
pub struct SessionHandle {
    pub pid: Pid,
    pub gid: Gid,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session for `uid`, replacing any prior session for that
    /// uid.
    pub fn insert(&self, uid: Uid, handle: SessionHandle) {
        self.sessions.write().insert(uid, handle);
    }

    pub fn remove(&self, uid: Uid) {
        self.sessions.write().remove(&uid);
    }

    /// Resolve the currently connected peer session for `uid`, or
    /// `None` to signal "no session".
    pub fn get(&self, uid: Uid) -> Option<SessionHandle> {
        self.sessions.read().get(&uid).copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
