//! Address and postal-code geocoding.
//!
//! Handlers depend on the [`Geocoder`] trait; production wiring uses
//! [`MapQuestGeocoder`], which calls MapQuest's address endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{bootcamp::Location, geo::GeoPoint};

pub const MAPQUEST_ADDRESS_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

/// One candidate location for a geocoding query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl GeocodeResult {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn into_location(self) -> Location {
        Location {
            kind: "Point".into(),
            coordinates: [self.longitude, self.latitude],
            formatted_address: self.formatted_address,
            street: self.street,
            city: self.city,
            state: self.state,
            zipcode: self.zipcode,
            country: self.country,
        }
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder API key is not configured")]
    MissingApiKey,
    #[error("geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-form address or postal code. An empty vector means no match.
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError>;
}

/// MapQuest response: `{"results": [{"locations": [...]}]}`.
#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    street: Option<String>,
    /// City.
    admin_area5: Option<String>,
    /// State.
    admin_area3: Option<String>,
    /// Country code.
    admin_area1: Option<String>,
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl From<MapQuestLocation> for GeocodeResult {
    fn from(loc: MapQuestLocation) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let street = non_empty(loc.street);
        let city = non_empty(loc.admin_area5);
        let state = non_empty(loc.admin_area3);
        let zipcode = non_empty(loc.postal_code);
        let country = non_empty(loc.admin_area1);

        let parts: Vec<&str> = [&street, &city, &state, &zipcode, &country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        let formatted_address = (!parts.is_empty()).then(|| parts.join(", "));

        Self {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address,
            street,
            city,
            state,
            zipcode,
            country,
        }
    }
}

/// Geocoder backed by the MapQuest geocoding API.
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl MapQuestGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("bootcamp-directory/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::MissingApiKey)?;
        tracing::debug!("geocoding `{}` via {}", query, self.base_url);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", api_key), ("location", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("geocoder returned status: {}", response.status());
            return Err(GeocodeError::Status(response.status()));
        }

        let body: MapQuestResponse = response.json().await?;
        Ok(parse_results(body))
    }
}

fn parse_results(body: MapQuestResponse) -> Vec<GeocodeResult> {
    body.results
        .into_iter()
        .flat_map(|result| result.locations)
        .map(GeocodeResult::from)
        .collect()
}
