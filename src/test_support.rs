//! Fixtures shared by the in-file test modules.

use async_trait::async_trait;
use axum_test::TestServer;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use uuid::Uuid;

use crate::{
    db,
    models::bootcamp::{Career, CreateBootcamp, Location},
    routes::routes,
    services::{
        bootcamp_service::BootcampService,
        geocoder::{GeocodeError, GeocodeResult, Geocoder},
        upload_store::UploadStore,
    },
    state::AppState,
};

/// Geocoder answering from a fixed table; unknown queries have no match.
#[derive(Default)]
pub struct FakeGeocoder {
    answers: HashMap<String, GeocodeResult>,
}

impl FakeGeocoder {
    pub fn with(mut self, query: &str, latitude: f64, longitude: f64) -> Self {
        self.answers.insert(
            query.to_string(),
            GeocodeResult {
                latitude,
                longitude,
                formatted_address: Some(format!("{}, US", query)),
                street: None,
                city: None,
                state: None,
                zipcode: Some(query.to_string()),
                country: Some("US".into()),
            },
        );
        self
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        Ok(self.answers.get(query).cloned().into_iter().collect())
    }
}

pub fn sample_bootcamp(name: &str) -> CreateBootcamp {
    CreateBootcamp {
        name: name.to_string(),
        description: format!("{} teaches full stack web development", name),
        website: Some("https://example.com".into()),
        phone: Some("(111) 111-1111".into()),
        email: Some("enroll@example.com".into()),
        careers: vec![Career::WebDevelopment, Career::UiUx],
        average_rating: Some(8.0),
        ..Default::default()
    }
}

pub fn location_at(latitude: f64, longitude: f64) -> Location {
    GeocodeResult {
        latitude,
        longitude,
        formatted_address: None,
        street: None,
        city: None,
        state: None,
        zipcode: None,
        country: None,
    }
    .into_location()
}

pub fn temp_upload_dir() -> PathBuf {
    std::env::temp_dir().join(format!("bootcamp-test-{}", Uuid::new_v4()))
}

/// Router over an in-memory database, the given geocoder and a fresh upload dir.
pub async fn test_app(geocoder: FakeGeocoder, max_upload: u64) -> (TestServer, AppState) {
    let pool = db::test_pool().await;
    let state = AppState::new(
        BootcampService::new(Arc::new(pool)),
        Arc::new(geocoder),
        UploadStore::new(temp_upload_dir(), max_upload),
    );
    let server = TestServer::new(routes::app(state.clone())).unwrap();
    (server, state)
}
