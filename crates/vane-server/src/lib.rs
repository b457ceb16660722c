//! HTTP surface and background loops for the Vane weather service.
//!
//! Everything here is thin plumbing around the engine and the queue: route
//! handlers, request instrumentation, the queue worker, and the backlog
//! reporter.

pub mod middleware;
pub mod reporter;
pub mod routes;
pub mod state;
pub mod worker;
