pub mod api;
pub mod auth;
pub mod upload;

use std::sync::Arc;

use crate::config::{Config, LazyBackend};

pub use api::ApiService;
pub use auth::{AuthBroadcaster, AuthSnapshot, Subscription};
pub use upload::{FileUpload, UploadService};

/// The service objects built once at startup and handed to the controller.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub backend: Arc<LazyBackend>,
    pub auth: Arc<AuthBroadcaster>,
    pub api: Arc<ApiService>,
}

impl Services {
    pub fn new(config: Arc<Config>, backend: Arc<LazyBackend>) -> Self {
        let auth = Arc::new(AuthBroadcaster::new(backend.clone(), config.clone()));
        let api = Arc::new(ApiService::new(backend.clone(), auth.clone(), config.clone()));
        Self { config, backend, auth, api }
    }
}
