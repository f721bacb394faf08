//! Incremental file-search query broker.
//!
//! Takes a stream of user-typed queries, runs the platform's file search
//! executable for them, and streams ranked candidate paths back, cancelling and
//! restarting searches as the user keeps typing.
//!
//! * [`controller`] decides, for each query, whether to ignore it, narrow the
//!   previous results in place, or start a new search.
//! * [`supervisor`] starts and cancels the external process and streams its
//!   output as tagged events.
//! * [`service`] runs the controller as a single task behind a
//!   [`BrokerHandle`].

pub mod backend;
pub mod candidate;
pub mod config;
pub mod controller;
pub mod error;
pub mod service;
pub mod supervisor;

pub use backend::{Backend, BackendKind};
pub use candidate::{Candidate, QueryResult};
pub use config::BrokerConfig;
pub use controller::{QueryController, QueryDisposition};
pub use error::{Error, Result};
pub use service::BrokerHandle;
pub use supervisor::{ProcessLauncher, RunOutcome, RunTag, SearchEvent, SearchEventKind, SearchHandle, SearchLauncher};
