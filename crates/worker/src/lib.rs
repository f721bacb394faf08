//! Worker primitives shared by the seek broker.
//!
//! * [`TaskClass`] labels spawned work for tracing.
//! * [`spawn`] routes futures onto the active tokio runtime, falling back to a
//!   small global runtime when called from plain threads.
//! * [`spawn_named_thread`] starts a named OS thread for blocking reads.
//! * [`GenerationClock`] and [`GenerationToken`] give every search run a
//!   monotonic identity and a cancellation handle scoped to that identity.

mod class;
mod spawn;
mod token;

pub use class::TaskClass;
pub use spawn::{spawn, spawn_named_thread};
pub use token::{GenerationClock, GenerationToken};
