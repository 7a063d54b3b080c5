use std::sync::Arc;

use crate::services::{
    bootcamp_service::BootcampService, geocoder::Geocoder, upload_store::UploadStore,
};

/// Shared state handed to every handler. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub bootcamps: BootcampService,
    pub geocoder: Arc<dyn Geocoder>,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(bootcamps: BootcampService, geocoder: Arc<dyn Geocoder>, uploads: UploadStore) -> Self {
        Self {
            bootcamps,
            geocoder,
            uploads,
        }
    }
}
