//! Process start-time lookup, used on both sides of the transport to
//! detect pid reuse mid-request.
//!
//! Linux-only: reads field 22 (`starttime`, clock ticks since boot)
//! from `/proc/<pid>/stat`.

use tb_domain::Pid;

pub fn read(pid: Pid) -> std::io::Result<i64> {
    let path = format!("/proc/{}/stat", pid.get());
    let contents = std::fs::read_to_string(path)?;
    let after_comm = contents.rsplit(')').next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed /proc/pid/stat")
    })?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // Fields here are 2-indexed relative to the full stat line (state
    // is field 3 overall, so index 0 here); starttime is field 22
    // overall, i.e. index 19 here.
    let starttime = fields.get(19).ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "missing starttime field")
    })?;
    starttime
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "non-numeric starttime"))
}
