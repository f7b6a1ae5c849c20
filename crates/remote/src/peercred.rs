//! Peer-credential lookup via `SO_PEERCRED`, queried by the listener
//! right after `accept` — credentials are never trusted over the wire.

use std::os::unix::io::AsRawFd;

use tb_domain::{Gid, Pid, Uid};
use tokio::net::UnixStream;

#[derive(Debug, Clone, Copy)]
pub struct PeerCredentials {
    pub uid: Uid,
    pub pid: Pid,
    pub gid: Gid,
}

pub fn query(stream: &UnixStream) -> std::io::Result<PeerCredentials> {
    let fd = stream.as_raw_fd();
    let mut cred = libc::ucred {
        pid: 0,
        uid: 0,
        gid: 0,
    };
    let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_PEERCRED,
            &mut cred as *mut libc::ucred as *mut libc::c_void,
            &mut len,
        )
    };

    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(PeerCredentials {
        uid: Uid::new(cred.uid),
        pid: Pid::new(cred.pid),
        gid: Gid::new(cred.gid),
    })
}
