use crate::service::Service;
use std::sync::Arc;

pub const SERVICE_NAME: &str = "stow-upload-service";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<Service>,
}

impl ApiState {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}
