//! Translation of the list endpoint's query string into a typed query:
//! filter conditions, projection, sort order and page window.

pub mod fields;
pub mod filter;

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};
use std::fmt;
use thiserror::Error;

pub use fields::Field;
pub use filter::Filter;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 1000;
pub const DEFAULT_SORT: &str = "-createdAt";

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Unknown field `{0}`")]
    UnknownField(String),
    #[error("Unknown operator `{op}` on field `{field}`")]
    UnknownOperator { field: String, op: String },
    #[error("Operator `{op}` can not be applied to field `{field}`")]
    InvalidOperator { field: String, op: String },
    #[error("Invalid value `{value}` for field `{field}`")]
    InvalidValue { field: String, value: String },
    #[error("Duplicate `{op}` condition on field `{field}`")]
    DuplicateCondition { field: String, op: &'static str },
    #[error("Malformed query key `{0}`")]
    MalformedKey(String),
    #[error("`{param}` must be a whole number, got `{value}`")]
    InvalidPageParam { param: &'static str, value: String },
}

/// Top-level key selectable as a whole, alongside its `location.*` fields.
const LOCATION: &str = "location";

/// Keys to keep in each returned entity (`select=name,description`).
/// `id` is always kept. Entries are `(key, "")` for top-level keys and
/// `(parent, child)` for nested ones.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    paths: Vec<(&'static str, &'static str)>,
}

impl Projection {
    fn parse(raw: &str) -> Result<Option<Self>, QueryError> {
        let mut paths = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let path = match name {
                "id" => continue,
                LOCATION => (LOCATION, ""),
                _ => Field::from_name(name)
                    .ok_or_else(|| QueryError::UnknownField(name.to_string()))?
                    .path(),
            };
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok((!paths.is_empty()).then_some(Self { paths }))
    }

    /// Reduce a serialized entity to the projected keys.
    pub fn apply(&self, value: Value) -> Value {
        let Value::Object(source) = value else {
            return value;
        };

        let mut out = Map::new();
        if let Some(id) = source.get("id") {
            out.insert("id".into(), id.clone());
        }
        for (parent, child) in self.paths.iter().copied() {
            if child.is_empty() {
                if let Some(v) = source.get(parent) {
                    out.insert(parent.into(), v.clone());
                }
                continue;
            }
            // whole parent already selected
            if self.paths.contains(&(parent, "")) {
                continue;
            }
            let Some(v) = source.get(parent).and_then(|p| p.get(child)) else {
                continue;
            };
            let entry = out
                .entry(parent)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = entry {
                nested.insert(child.into(), v.clone());
            }
        }
        Value::Object(out)
    }
}

/// Space-separated projection spec, e.g. `name location.city`.
impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .paths
            .iter()
            .map(|(parent, child)| match *child {
                "" => parent.to_string(),
                child => format!("{}.{}", parent, child),
            })
            .collect();
        write!(f, "{}", names.join(" "))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SortKey {
    pub field: Field,
    pub descending: bool,
}

fn parse_sort(raw: &str) -> Result<Vec<SortKey>, QueryError> {
    let mut keys = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, descending) = match part.strip_prefix('-') {
            Some(name) => (name, true),
            None => (part, false),
        };
        let field =
            Field::from_name(name).ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
        keys.push(SortKey { field, descending });
    }
    if keys.is_empty() {
        return parse_sort(DEFAULT_SORT);
    }
    Ok(keys)
}

/// `page`/`limit` pair; both are at least 1 and `limit` is at most [`MAX_LIMIT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageWindow {
    pub fn skip(&self) -> i64 {
        (i64::from(self.page) - 1).saturating_mul(i64::from(self.limit))
    }

    /// `next` when entities remain past this page, `prev` when this is not
    /// the first page.
    pub fn pagination(&self, total: i64) -> Pagination {
        let end = i64::from(self.page).saturating_mul(i64::from(self.limit));
        Pagination {
            next: (end < total).then(|| PageRef {
                page: self.page.saturating_add(1),
                limit: self.limit,
            }),
            prev: (self.page > 1).then(|| PageRef {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }
}

fn parse_page_param(param: &'static str, raw: &str) -> Result<u32, QueryError> {
    raw.trim()
        .parse::<u32>()
        .map(|n| n.max(1))
        .map_err(|_| QueryError::InvalidPageParam {
            param,
            value: raw.to_string(),
        })
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRef {
    pub page: u32,
    pub limit: u32,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Everything the list endpoint extracts from its query string.
#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub sort: Vec<SortKey>,
    pub window: PageWindow,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            projection: None,
            sort: vec![SortKey {
                field: Field::CreatedAt,
                descending: true,
            }],
            window: PageWindow::default(),
        }
    }
}

impl ListQuery {
    /// Split control keys (`select`, `sort`, `page`, `limit`) from filter keys
    /// and parse each part.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, QueryError> {
        let mut query = Self::default();
        let mut filter_pairs = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "select" => query.projection = Projection::parse(value)?,
                "sort" => query.sort = parse_sort(value)?,
                "page" => query.window.page = parse_page_param("page", value)?,
                "limit" => query.window.limit = parse_page_param("limit", value)?.min(MAX_LIMIT),
                _ => filter_pairs.push((key.as_str(), value.as_str())),
            }
        }

        query.filter = Filter::parse(filter_pairs)?;
        Ok(query)
    }

    /// Append ` ORDER BY ... LIMIT ? OFFSET ?`.
    pub fn push_order_and_window(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" ORDER BY ");
        for (i, key) in self.sort.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(key.field.column());
            builder.push(if key.descending { " DESC" } else { " ASC" });
        }
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(self.window.limit));
        builder.push(" OFFSET ");
        builder.push_bind(self.window.skip());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_newest_first_and_first_page() {
        let query = ListQuery::from_pairs(&[]).unwrap();
        assert_eq!(
            query.sort,
            vec![SortKey {
                field: Field::CreatedAt,
                descending: true
            }]
        );
        assert_eq!(query.window, PageWindow { page: 1, limit: 20 });
        assert_eq!(query.window.skip(), 0);
        assert!(query.filter.is_empty());
        assert!(query.projection.is_none());
    }

    #[test]
    fn control_keys_are_not_filters() {
        let query = ListQuery::from_pairs(&pairs(&[
            ("select", "name,description"),
            ("sort", "name,-averageCost"),
            ("page", "3"),
            ("limit", "5"),
            ("housing", "true"),
        ]))
        .unwrap();

        assert_eq!(query.filter.conditions().len(), 1);
        assert_eq!(query.filter.to_document(), json!({ "housing": true }));
        assert_eq!(
            query.projection.as_ref().map(ToString::to_string).as_deref(),
            Some("name description")
        );
        assert_eq!(
            query.sort,
            vec![
                SortKey {
                    field: Field::Name,
                    descending: false
                },
                SortKey {
                    field: Field::AverageCost,
                    descending: true
                },
            ]
        );
        assert_eq!(query.window.skip(), 10);
    }

    #[test]
    fn empty_sort_falls_back_to_default() {
        let query = ListQuery::from_pairs(&pairs(&[("sort", " , ")])).unwrap();
        assert_eq!(query.sort, ListQuery::default().sort);
    }

    #[test]
    fn page_params_must_be_numeric_and_are_raised_to_one() {
        assert!(matches!(
            ListQuery::from_pairs(&pairs(&[("page", "two")])),
            Err(QueryError::InvalidPageParam { param: "page", .. })
        ));
        assert!(matches!(
            ListQuery::from_pairs(&pairs(&[("limit", "-1")])),
            Err(QueryError::InvalidPageParam { param: "limit", .. })
        ));
        let query = ListQuery::from_pairs(&pairs(&[("page", "0"), ("limit", "0")])).unwrap();
        assert_eq!(query.window, PageWindow { page: 1, limit: 1 });
    }

    #[test]
    fn largest_page_and_limit_do_not_overflow() {
        let max = u32::MAX.to_string();
        let query = ListQuery::from_pairs(&pairs(&[("page", &max), ("limit", &max)])).unwrap();
        assert_eq!(
            query.window,
            PageWindow {
                page: u32::MAX,
                limit: MAX_LIMIT
            }
        );
        assert_eq!(
            query.window.skip(),
            (i64::from(u32::MAX) - 1) * i64::from(MAX_LIMIT)
        );

        let links = query.window.pagination(3);
        assert_eq!(links.next, None);
        assert_eq!(
            links.prev,
            Some(PageRef {
                page: u32::MAX - 1,
                limit: MAX_LIMIT
            })
        );

        let unclamped = PageWindow {
            page: u32::MAX,
            limit: u32::MAX,
        };
        assert_eq!(unclamped.skip(), i64::MAX);
        assert_eq!(unclamped.pagination(i64::MAX).next, None);
    }

    #[test]
    fn pagination_links_follow_window_and_total() {
        let first = PageWindow { page: 1, limit: 2 };
        assert_eq!(
            first.pagination(5),
            Pagination {
                next: Some(PageRef { page: 2, limit: 2 }),
                prev: None
            }
        );

        let middle = PageWindow { page: 2, limit: 2 };
        let links = middle.pagination(5);
        assert_eq!(links.next, Some(PageRef { page: 3, limit: 2 }));
        assert_eq!(links.prev, Some(PageRef { page: 1, limit: 2 }));

        let last = PageWindow { page: 3, limit: 2 };
        assert_eq!(last.pagination(5).next, None);

        // page * limit == total: nothing left
        let exact = PageWindow { page: 1, limit: 5 };
        assert_eq!(exact.pagination(5), Pagination::default());
    }

    #[test]
    fn empty_pagination_serializes_as_empty_object() {
        assert_eq!(serde_json::to_value(Pagination::default()).unwrap(), json!({}));
    }

    #[test]
    fn projection_keeps_id_and_nested_fields() {
        let projection = Projection::parse("name,location.city").unwrap().unwrap();
        let entity = json!({
            "id": "abc",
            "name": "Devworks",
            "description": "long text",
            "location": { "city": "Boston", "state": "MA" }
        });
        assert_eq!(
            projection.apply(entity),
            json!({ "id": "abc", "name": "Devworks", "location": { "city": "Boston" } })
        );
    }

    #[test]
    fn projection_can_select_whole_location() {
        let projection = Projection::parse("location.city,location").unwrap().unwrap();
        assert_eq!(projection.to_string(), "location.city location");
        let entity = json!({
            "id": "abc",
            "name": "Devworks",
            "location": { "city": "Boston", "state": "MA" }
        });
        assert_eq!(
            projection.apply(entity),
            json!({ "id": "abc", "location": { "city": "Boston", "state": "MA" } })
        );

        // bootcamps without a location serialize it as null
        let unlocated = json!({ "id": "def", "name": "Remote", "location": null });
        assert_eq!(
            projection.apply(unlocated),
            json!({ "id": "def", "location": null })
        );
    }

    #[test]
    fn projection_rejects_unknown_fields() {
        assert_eq!(
            Projection::parse("name,secret"),
            Err(QueryError::UnknownField("secret".into()))
        );
        assert_eq!(Projection::parse("id"), Ok(None));
    }

    #[test]
    fn order_and_window_sql() {
        let query = ListQuery::from_pairs(&pairs(&[("sort", "-averageRating,name")])).unwrap();
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM bootcamps WHERE 1 = 1");
        query.push_order_and_window(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT id FROM bootcamps WHERE 1 = 1 ORDER BY average_rating DESC, name ASC LIMIT ? OFFSET ?"
        );
    }
}
