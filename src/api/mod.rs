//! # REST API
//!
//! JSON over HTTP/1.1, mounted under `/api`. Every response except
//! `/api/health` is wrapped in an [`Envelope`].

mod envelope;
mod router;
mod server;

pub use envelope::{Envelope, ErrorBody};
pub use router::{route, Reply};
pub use server::ApiServer;
