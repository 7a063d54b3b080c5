pub mod bootcamp_service;
pub mod geocoder;
pub mod upload_store;
