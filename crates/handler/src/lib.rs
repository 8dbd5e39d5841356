//! Request orchestration for the muse core.
//!
//! [`RequestHandler`] owns every in-flight transport call: it submits a
//! prepared payload, demultiplexes streamed chunks through the configured
//! provider, truncates at template stop words, and guarantees at most one
//! active request per correlation id with silent cancel-by-identity.

pub use config::RequestConfig;
pub use handler::{EventReceiver, RequestHandler};

mod config;
mod handler;
