//! Shared state handed to every request handler.

use std::sync::Arc;

use vane_core::PrometheusSink;
use vane_queue::JobQueue;
use vane_weather::WeatherEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WeatherEngine>,
    pub queue: Arc<JobQueue>,
    pub metrics: Arc<PrometheusSink>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
