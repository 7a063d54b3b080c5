//! src/services/bootcamp_service.rs
//!
//! BootcampService — data access for the `bootcamps` table. Validation of
//! incoming payloads happens here so handlers only translate HTTP.

use crate::{
    models::{
        bootcamp::{Bootcamp, BootcampRow, CreateBootcamp, Location, UpdateBootcamp, slugify},
        geo::{GeoPoint, SphericalCap},
    },
    query::ListQuery,
};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

const BOOTCAMP_COLUMNS: &str = "id, name, slug, description, website, phone, email, \
     location_lng, location_lat, location_formatted_address, location_street, \
     location_city, location_state, location_zipcode, location_country, careers, \
     average_rating, average_cost, photo, housing, job_assistance, job_guarantee, \
     accept_gi, created_at";

#[derive(Debug, Error)]
pub enum BootcampError {
    #[error("bootcamp `{0}` not found")]
    NotFound(Uuid),
    #[error("{0}")]
    Validation(String),
    #[error("duplicate bootcamp name")]
    Duplicate,
    #[error("malformed careers column: {0}")]
    Careers(#[from] serde_json::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type BootcampResult<T> = Result<T, BootcampError>;

/// Bootcamp operations backed by SQLite:
/// - filtered, sorted, paginated listing
/// - lookup / create / update / delete by id
/// - spherical-cap radius search
/// - photo filename updates
#[derive(Clone)]
pub struct BootcampService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl BootcampService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Run the list query: filter, sort, then the page window.
    pub async fn list(&self, query: &ListQuery) -> BootcampResult<Vec<Bootcamp>> {
        debug!(
            filter = %query.filter.to_document(),
            select = %query.projection.as_ref().map(ToString::to_string).unwrap_or_default(),
            skip = query.window.skip(),
            limit = query.window.limit,
            "listing bootcamps"
        );

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM bootcamps WHERE 1 = 1",
            BOOTCAMP_COLUMNS
        ));
        query.filter.push_sql(&mut builder);
        query.push_order_and_window(&mut builder);

        let rows: Vec<BootcampRow> = builder.build_query_as().fetch_all(&*self.db).await?;
        rows.into_iter()
            .map(|row| Bootcamp::try_from(row).map_err(BootcampError::from))
            .collect()
    }

    /// Number of stored bootcamps, regardless of any list filter.
    pub async fn count_all(&self) -> BootcampResult<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bootcamps")
            .fetch_one(&*self.db)
            .await?;
        Ok(total)
    }

    /// Fetch one bootcamp. Returns NotFound if missing.
    pub async fn get(&self, id: Uuid) -> BootcampResult<Bootcamp> {
        let row = sqlx::query_as::<_, BootcampRow>(&format!(
            "SELECT {} FROM bootcamps WHERE id = ?",
            BOOTCAMP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(BootcampError::NotFound(id))?;

        Ok(Bootcamp::try_from(row)?)
    }

    /// Validate and insert a new bootcamp.
    ///
    /// `location` is the geocoded form of the payload's address, if any.
    /// Returns Duplicate when the name is already taken.
    pub async fn create(
        &self,
        mut input: CreateBootcamp,
        location: Option<Location>,
    ) -> BootcampResult<Bootcamp> {
        input.name = input.name.trim().to_string();
        input.validate().map_err(validation_error)?;

        let careers = serde_json::to_string(&input.careers)?;
        let location = location.as_ref();

        let row = sqlx::query_as::<_, BootcampRow>(&format!(
            "INSERT INTO bootcamps (
                id, name, slug, description, website, phone, email,
                location_lng, location_lat, location_formatted_address, location_street,
                location_city, location_state, location_zipcode, location_country,
                careers, average_rating, average_cost, housing, job_assistance,
                job_guarantee, accept_gi, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}",
            BOOTCAMP_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(slugify(&input.name))
        .bind(&input.description)
        .bind(&input.website)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(location.map(Location::longitude))
        .bind(location.map(Location::latitude))
        .bind(location.and_then(|l| l.formatted_address.clone()))
        .bind(location.and_then(|l| l.street.clone()))
        .bind(location.and_then(|l| l.city.clone()))
        .bind(location.and_then(|l| l.state.clone()))
        .bind(location.and_then(|l| l.zipcode.clone()))
        .bind(location.and_then(|l| l.country.clone()))
        .bind(careers)
        .bind(input.average_rating)
        .bind(input.average_cost)
        .bind(input.housing)
        .bind(input.job_assistance)
        .bind(input.job_guarantee)
        .bind(input.accept_gi)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
        .map_err(map_write_error)?;

        let bootcamp = Bootcamp::try_from(row)?;
        debug!("created bootcamp {} ({})", bootcamp.id, bootcamp.slug);
        Ok(bootcamp)
    }

    /// Validate the supplied fields and apply them, returning the updated row.
    ///
    /// Fields left as `None` keep their stored value. A new name re-derives the
    /// slug. Returns NotFound if the id does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        mut changes: UpdateBootcamp,
        location: Option<Location>,
    ) -> BootcampResult<Bootcamp> {
        if let Some(name) = changes.name.as_mut() {
            *name = name.trim().to_string();
        }
        changes.validate().map_err(validation_error)?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE bootcamps SET ");
        let mut assignments = builder.separated(", ");
        let mut any = false;

        macro_rules! assign {
            ($column:literal, $value:expr) => {
                if let Some(value) = $value {
                    assignments.push(concat!($column, " = "));
                    assignments.push_bind_unseparated(value);
                    any = true;
                }
            };
        }

        assign!("slug", changes.name.as_deref().map(slugify));
        assign!("name", changes.name);
        assign!("description", changes.description);
        assign!("website", changes.website);
        assign!("phone", changes.phone);
        assign!("email", changes.email);
        assign!(
            "careers",
            changes
                .careers
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?
        );
        assign!("average_rating", changes.average_rating);
        assign!("average_cost", changes.average_cost);
        assign!("housing", changes.housing);
        assign!("job_assistance", changes.job_assistance);
        assign!("job_guarantee", changes.job_guarantee);
        assign!("accept_gi", changes.accept_gi);
        if let Some(location) = location {
            assign!("location_lng", Some(location.longitude()));
            assign!("location_lat", Some(location.latitude()));
            assign!("location_formatted_address", Some(location.formatted_address));
            assign!("location_street", Some(location.street));
            assign!("location_city", Some(location.city));
            assign!("location_state", Some(location.state));
            assign!("location_zipcode", Some(location.zipcode));
            assign!("location_country", Some(location.country));
        }

        if !any {
            return self.get(id).await;
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {}", BOOTCAMP_COLUMNS));

        let row: BootcampRow = builder
            .build_query_as()
            .fetch_optional(&*self.db)
            .await
            .map_err(map_write_error)?
            .ok_or(BootcampError::NotFound(id))?;

        Ok(Bootcamp::try_from(row)?)
    }

    /// Delete a bootcamp; its courses go with it (`ON DELETE CASCADE`).
    ///
    /// Returns NotFound if the id does not exist.
    pub async fn delete(&self, id: Uuid) -> BootcampResult<()> {
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BootcampError::NotFound(id));
        }

        debug!("deleted bootcamp {}", id);
        Ok(())
    }

    /// Bootcamps whose location lies inside the spherical cap.
    ///
    /// SQLite narrows candidates to the cap's latitude band; the exact
    /// great-circle test runs on the fetched rows.
    pub async fn within_radius(&self, cap: SphericalCap) -> BootcampResult<Vec<Bootcamp>> {
        let (min_lat, max_lat) = cap.latitude_bounds();
        debug!(
            lat = cap.center.latitude,
            lng = cap.center.longitude,
            radius = cap.radius,
            "radius search"
        );

        let rows = sqlx::query_as::<_, BootcampRow>(&format!(
            "SELECT {} FROM bootcamps
             WHERE location_lat IS NOT NULL AND location_lng IS NOT NULL
               AND location_lat BETWEEN ? AND ?
             ORDER BY created_at DESC",
            BOOTCAMP_COLUMNS
        ))
        .bind(min_lat)
        .bind(max_lat)
        .fetch_all(&*self.db)
        .await?;

        let mut matches = Vec::new();
        for row in rows {
            let bootcamp = Bootcamp::try_from(row)?;
            let inside = bootcamp.location.as_ref().is_some_and(|l| {
                cap.contains(&GeoPoint::new(l.latitude(), l.longitude()))
            });
            if inside {
                matches.push(bootcamp);
            }
        }
        Ok(matches)
    }

    /// Record the stored photo filename. Returns NotFound if the id does not exist.
    pub async fn set_photo(&self, id: Uuid, filename: &str) -> BootcampResult<()> {
        let result = sqlx::query("UPDATE bootcamps SET photo = ? WHERE id = ?")
            .bind(filename)
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BootcampError::NotFound(id));
        }
        Ok(())
    }
}

/// Flatten validator output into one message, fields in name order.
fn validation_error(errors: ValidationErrors) -> BootcampError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid value for {}", field),
            })
        })
        .collect();

    BootcampError::Validation(messages.join(", "))
}

fn map_write_error(err: sqlx::Error) -> BootcampError {
    if is_unique_violation(&err) {
        BootcampError::Duplicate
    } else {
        BootcampError::Sqlx(err)
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::{
            bootcamp::Career,
            geo::{GeoPoint, radius_from_distance},
        },
        test_support::{location_at, sample_bootcamp},
    };

    async fn service() -> BootcampService {
        BootcampService::new(Arc::new(db::test_pool().await))
    }

    fn list_query(raw: &[(&str, &str)]) -> ListQuery {
        let pairs: Vec<(String, String)> = raw
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ListQuery::from_pairs(&pairs).unwrap()
    }

    async fn backdate(service: &BootcampService, id: Uuid, created_at: &str) {
        sqlx::query("UPDATE bootcamps SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(id)
            .execute(&*service.db)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let service = service().await;
        let mut input = sample_bootcamp("  Devworks Bootcamp ");
        input.average_cost = Some(9000.0);
        input.housing = true;

        let created = service
            .create(input, Some(location_at(42.35, -71.1)))
            .await
            .unwrap();
        assert_eq!(created.name, "Devworks Bootcamp");
        assert_eq!(created.slug, "devworks-bootcamp");
        assert_eq!(created.photo, "no-photo.jpg");
        assert!(created.housing);

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        let location = fetched.location.unwrap();
        assert_eq!(location.coordinates, [-71.1, 42.35]);
        assert_eq!(location.kind, "Point");
    }

    #[tokio::test]
    async fn create_rejects_invalid_and_duplicate_input() {
        let service = service().await;

        let mut invalid = sample_bootcamp("Bad");
        invalid.careers.clear();
        invalid.email = Some("nope".into());
        match service.create(invalid, None).await {
            Err(BootcampError::Validation(msg)) => {
                assert_eq!(msg, "Please add at least one career, Please add a valid email");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        service.create(sample_bootcamp("Twin"), None).await.unwrap();
        assert!(matches!(
            service.create(sample_bootcamp("Twin"), None).await,
            Err(BootcampError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let service = service().await;
        let id = Uuid::new_v4();
        assert!(matches!(service.get(id).await, Err(BootcampError::NotFound(x)) if x == id));
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let service = service().await;
        let created = service.create(sample_bootcamp("Codemasters"), None).await.unwrap();

        let updated = service
            .update(
                created.id,
                UpdateBootcamp {
                    name: Some("Codemasters Plus".into()),
                    careers: Some(vec![Career::DataScience]),
                    job_guarantee: Some(true),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Codemasters Plus");
        assert_eq!(updated.slug, "codemasters-plus");
        assert_eq!(updated.careers, vec![Career::DataScience]);
        assert!(updated.job_guarantee);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_clears_contact_fields_set_to_null() {
        let service = service().await;
        let created = service.create(sample_bootcamp("Contactable"), None).await.unwrap();
        assert!(created.website.is_some());

        let updated = service
            .update(
                created.id,
                UpdateBootcamp {
                    website: Some(None),
                    email: Some(None),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.website, None);
        assert_eq!(updated.email, None);
        assert_eq!(updated.phone, created.phone);
    }

    #[tokio::test]
    async fn update_runs_validators_and_reports_missing() {
        let service = service().await;
        let created = service.create(sample_bootcamp("Validated"), None).await.unwrap();

        let bad = UpdateBootcamp {
            average_rating: Some(0.5),
            ..Default::default()
        };
        assert!(matches!(
            service.update(created.id, bad, None).await,
            Err(BootcampError::Validation(_))
        ));

        let missing = Uuid::new_v4();
        let change = UpdateBootcamp {
            housing: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            service.update(missing, change, None).await,
            Err(BootcampError::NotFound(_))
        ));
        assert!(matches!(
            service.update(missing, UpdateBootcamp::default(), None).await,
            Err(BootcampError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_to_courses() {
        let service = service().await;
        let created = service.create(sample_bootcamp("Cascade"), None).await.unwrap();

        sqlx::query(
            "INSERT INTO courses (id, bootcamp_id, title, description, weeks, tuition,
                                  minimum_skill, scholarship_available, created_at)
             VALUES (?, ?, 'Front End', 'HTML and CSS', 8, 8000, 'beginner', 0, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(created.id)
        .bind(Utc::now())
        .execute(&*service.db)
        .await
        .unwrap();

        service.delete(created.id).await.unwrap();

        let courses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(&*service.db)
            .await
            .unwrap();
        assert_eq!(courses, 0);
        assert!(matches!(
            service.delete(created.id).await,
            Err(BootcampError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_sorts_and_pages() {
        let service = service().await;
        for (name, cost, date) in [
            ("Alpha", 5000.0, "2024-01-01T00:00:00+00:00"),
            ("Bravo", 12000.0, "2024-02-01T00:00:00+00:00"),
            ("Charlie", 8000.0, "2024-03-01T00:00:00+00:00"),
        ] {
            let mut input = sample_bootcamp(name);
            input.average_cost = Some(cost);
            let created = service.create(input, None).await.unwrap();
            backdate(&service, created.id, date).await;
        }

        let names = |bootcamps: Vec<Bootcamp>| -> Vec<String> {
            bootcamps.into_iter().map(|b| b.name).collect()
        };

        let newest_first = service.list(&list_query(&[])).await.unwrap();
        assert_eq!(names(newest_first), ["Charlie", "Bravo", "Alpha"]);

        let cheap = service
            .list(&list_query(&[("averageCost[lte]", "10000"), ("sort", "name")]))
            .await
            .unwrap();
        assert_eq!(names(cheap), ["Alpha", "Charlie"]);

        let second_page = service
            .list(&list_query(&[("sort", "averageCost"), ("page", "2"), ("limit", "2")]))
            .await
            .unwrap();
        assert_eq!(names(second_page), ["Bravo"]);

        assert_eq!(service.count_all().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn list_matches_careers_membership() {
        let service = service().await;
        let mut web = sample_bootcamp("Web Only");
        web.careers = vec![Career::WebDevelopment];
        service.create(web, None).await.unwrap();
        let mut mixed = sample_bootcamp("Mixed");
        mixed.careers = vec![Career::Business, Career::UiUx];
        service.create(mixed, None).await.unwrap();

        let ui = service
            .list(&list_query(&[("careers", "UI/UX")]))
            .await
            .unwrap();
        assert_eq!(ui.len(), 1);
        assert_eq!(ui[0].name, "Mixed");

        let either = service
            .list(&list_query(&[("careers[in]", "Web Development,Business")]))
            .await
            .unwrap();
        assert_eq!(either.len(), 2);
    }

    #[tokio::test]
    async fn within_radius_keeps_points_inside_cap() {
        let service = service().await;
        let near = service
            .create(sample_bootcamp("Near"), Some(location_at(34.05, -118.2)))
            .await
            .unwrap();
        service
            .create(sample_bootcamp("Far"), Some(location_at(40.7, -74.0)))
            .await
            .unwrap();
        service.create(sample_bootcamp("Nowhere"), None).await.unwrap();

        let cap = SphericalCap::new(GeoPoint::new(34.0, -118.2), radius_from_distance(10.0));
        let found = service.within_radius(cap).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, near.id);
    }

    #[tokio::test]
    async fn set_photo_persists_filename() {
        let service = service().await;
        let created = service.create(sample_bootcamp("Photogenic"), None).await.unwrap();
        service.set_photo(created.id, "BOOTCAMP_x_20240101.png").await.unwrap();
        assert_eq!(
            service.get(created.id).await.unwrap().photo,
            "BOOTCAMP_x_20240101.png"
        );
        assert!(matches!(
            service.set_photo(Uuid::new_v4(), "x.png").await,
            Err(BootcampError::NotFound(_))
        ));
    }
}
