//! Shared data model and error types for the trust broker.
//!
//! Every other crate in this workspace depends on `tb-domain` for the
//! request/answer value types, the tagged integer newtypes, and the
//! single shared error enum.

pub mod config;
pub mod error;
pub mod ids;
pub mod request;

pub use error::{Error, Result};
pub use ids::{Feature, Gid, Pid, Uid};
pub use request::{Answer, AppInfo, ApplicationId, Request, RequestParameters, Timestamp};
