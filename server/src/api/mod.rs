//! API server and routes

pub mod routes;
mod server;
pub mod types;

pub use server::ApiServer;

use std::sync::Arc;

use crate::data::Store;

/// Shared handler state: the runtime store handle, injected once at router
/// construction.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<Store>,
}
