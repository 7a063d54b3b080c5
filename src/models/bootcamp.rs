//! Represents a bootcamp listing and the payloads used to create or change one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Career tracks a bootcamp can offer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Other,
}

/// GeoJSON point plus the address components the geocoder resolved.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,

    /// `[longitude, latitude]`, GeoJSON order.
    pub coordinates: [f64; 2],

    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl Location {
    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }
}

/// A training-program provider listed in the directory.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Option<Location>,
    pub careers: Vec<Career>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub created_at: DateTime<Utc>,
}

/// Flat row as stored in the `bootcamps` table.
#[derive(FromRow, Debug)]
pub(crate) struct BootcampRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location_lng: Option<f64>,
    pub location_lat: Option<f64>,
    pub location_formatted_address: Option<String>,
    pub location_street: Option<String>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_zipcode: Option<String>,
    pub location_country: Option<String>,
    pub careers: String,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BootcampRow> for Bootcamp {
    type Error = serde_json::Error;

    fn try_from(row: BootcampRow) -> Result<Self, Self::Error> {
        let location = match (row.location_lng, row.location_lat) {
            (Some(lng), Some(lat)) => Some(Location {
                kind: "Point".into(),
                coordinates: [lng, lat],
                formatted_address: row.location_formatted_address,
                street: row.location_street,
                city: row.location_city,
                state: row.location_state,
                zipcode: row.location_zipcode,
                country: row.location_country,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            website: row.website,
            phone: row.phone,
            email: row.email,
            location,
            careers: serde_json::from_str(&row.careers)?,
            average_rating: row.average_rating,
            average_cost: row.average_cost,
            photo: row.photo,
            housing: row.housing,
            job_assistance: row.job_assistance,
            job_guarantee: row.job_guarantee,
            accept_gi: row.accept_gi,
            created_at: row.created_at,
        })
    }
}

/// Body of `POST /api/v1/bootcamps`.
#[derive(Deserialize, Validate, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcamp {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Please add a name of at most 50 characters"
    ))]
    pub name: String,

    #[validate(length(
        min = 1,
        max = 500,
        message = "Please add a description of at most 500 characters"
    ))]
    pub description: String,

    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,

    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,

    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,

    /// Geocoded into `location`; never stored as-is.
    pub address: Option<String>,

    #[validate(length(min = 1, message = "Please add at least one career"))]
    pub careers: Vec<Career>,

    #[validate(range(min = 1.0, max = 10.0, message = "Rating must be between 1 and 10"))]
    pub average_rating: Option<f64>,

    #[validate(range(min = 0.0, message = "Average cost can not be negative"))]
    pub average_cost: Option<f64>,

    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

/// Body of `PUT /api/v1/bootcamps/{id}`. Absent fields are left untouched.
#[derive(Deserialize, Validate, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBootcamp {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Please add a name of at most 50 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(
        min = 1,
        max = 500,
        message = "Please add a description of at most 500 characters"
    ))]
    pub description: Option<String>,

    /// `Some(None)` (JSON `null`) clears the stored value.
    #[serde(default, deserialize_with = "nullable")]
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<Option<String>>,

    pub address: Option<String>,

    #[validate(length(min = 1, message = "Please add at least one career"))]
    pub careers: Option<Vec<Career>>,

    #[validate(range(min = 1.0, max = 10.0, message = "Rating must be between 1 and 10"))]
    pub average_rating: Option<f64>,

    #[validate(range(min = 0.0, message = "Average cost can not be negative"))]
    pub average_cost: Option<f64>,

    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

/// Keeps a present JSON `null` distinct from an absent key.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// URL-friendly form of a bootcamp name: lowercase ASCII words joined by `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
