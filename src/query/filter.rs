//! Typed filter DSL for the list endpoint.
//!
//! Query keys take the form `field=value` (equality) or `field[op]=value`
//! where `op` is one of `gt`, `gte`, `lt`, `lte`, `in`. Every key is resolved
//! against [`Field`] and every value is parsed to the field's type before any
//! SQL is produced, so request input only ever reaches the database as a
//! bound parameter.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};

use super::{
    QueryError,
    fields::{Field, FieldKind},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    /// Parse the bare keyword found between brackets, e.g. `lte` in `averageCost[lte]`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    /// Operator name in document form.
    pub fn operator(self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::In => "$in",
        }
    }

    fn applies_to(self, kind: FieldKind) -> bool {
        match self {
            FilterOp::Eq | FilterOp::In => true,
            _ => matches!(
                kind,
                FieldKind::Text | FieldKind::Number | FieldKind::Timestamp
            ),
        }
    }

    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => " = ",
            FilterOp::Gt => " > ",
            FilterOp::Gte => " >= ",
            FilterOp::Lt => " < ",
            FilterOp::Lte => " <= ",
            FilterOp::In => " IN ",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<FilterValue>),
}

impl FilterValue {
    fn parse(field: Field, raw: &str) -> Result<Self, QueryError> {
        let invalid = || QueryError::InvalidValue {
            field: field.name().to_string(),
            value: raw.to_string(),
        };

        match field.kind() {
            FieldKind::Text | FieldKind::TextList => Ok(FilterValue::Text(raw.to_string())),
            FieldKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FilterValue::Number)
                .ok_or_else(invalid),
            FieldKind::Bool => match raw.trim() {
                "true" | "1" => Ok(FilterValue::Bool(true)),
                "false" | "0" => Ok(FilterValue::Bool(false)),
                _ => Err(invalid()),
            },
            FieldKind::Timestamp => parse_timestamp(raw.trim())
                .map(FilterValue::Timestamp)
                .ok_or_else(invalid),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::Number(n) => serde_json::json!(n),
            FilterValue::Bool(b) => Value::Bool(*b),
            FilterValue::Timestamp(t) => Value::String(t.to_rfc3339()),
            FilterValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    fn push_bind(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            FilterValue::Text(s) => {
                builder.push_bind(s.clone());
            }
            FilterValue::Number(n) => {
                builder.push_bind(*n);
            }
            FilterValue::Bool(b) => {
                builder.push_bind(*b);
            }
            FilterValue::Timestamp(t) => {
                builder.push_bind(*t);
            }
            FilterValue::List(items) => {
                builder.push("(");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    item.push_bind(builder);
                }
                builder.push(")");
            }
        }
    }
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Condition {
    fn push_sql(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if self.field.kind() == FieldKind::TextList {
            builder.push(format!(
                "EXISTS (SELECT 1 FROM json_each(bootcamps.{}) WHERE json_each.value",
                self.field.column()
            ));
            builder.push(self.op.sql());
            self.value.push_bind(builder);
            builder.push(")");
        } else {
            builder.push(self.field.column());
            builder.push(self.op.sql());
            self.value.push_bind(builder);
        }
    }
}

/// Conjunction of conditions parsed from the query string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Parse `(key, value)` pairs that are not pagination or projection controls.
    ///
    /// Repeated `in` keys for the same field, and comma-separated `in` values,
    /// are merged into one list.
    pub fn parse<'a, I>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut conditions: Vec<Condition> = Vec::new();

        for (key, raw) in pairs {
            let (name, keyword) = split_key(key)?;
            let field =
                Field::from_name(name).ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
            let op = match keyword {
                None => FilterOp::Eq,
                Some(keyword) => {
                    FilterOp::from_keyword(keyword).ok_or_else(|| QueryError::UnknownOperator {
                        field: name.to_string(),
                        op: keyword.to_string(),
                    })?
                }
            };
            if !op.applies_to(field.kind()) {
                return Err(QueryError::InvalidOperator {
                    field: name.to_string(),
                    op: keyword.unwrap_or_default().to_string(),
                });
            }

            if op != FilterOp::In {
                if conditions.iter().any(|c| c.field == field && c.op == op) {
                    return Err(QueryError::DuplicateCondition {
                        field: name.to_string(),
                        op: op.operator(),
                    });
                }
                conditions.push(Condition {
                    field,
                    op,
                    value: FilterValue::parse(field, raw)?,
                });
                continue;
            }

            let values = raw
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| FilterValue::parse(field, v))
                .collect::<Result<Vec<_>, _>>()?;
            if values.is_empty() {
                return Err(QueryError::InvalidValue {
                    field: name.to_string(),
                    value: raw.to_string(),
                });
            }

            match conditions
                .iter_mut()
                .find(|c| c.field == field && c.op == FilterOp::In)
            {
                Some(Condition {
                    value: FilterValue::List(existing),
                    ..
                }) => existing.extend(values),
                _ => conditions.push(Condition {
                    field,
                    op,
                    value: FilterValue::List(values),
                }),
            }
        }

        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as a query document: `{"averageCost": {"$lte": 10000}}`.
    ///
    /// A lone equality is rendered as a bare value.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for field in Field::ALL {
            let matching: Vec<&Condition> = self
                .conditions
                .iter()
                .filter(|c| c.field == field)
                .collect();
            match matching.as_slice() {
                [] => {}
                [only] if only.op == FilterOp::Eq => {
                    doc.insert(field.name().to_string(), only.value.to_json());
                }
                many => {
                    let ops = many
                        .iter()
                        .map(|c| (c.op.operator().to_string(), c.value.to_json()))
                        .collect::<Map<_, _>>();
                    doc.insert(field.name().to_string(), Value::Object(ops));
                }
            }
        }
        Value::Object(doc)
    }

    /// Append ` AND <condition>` for every condition. The builder must already
    /// contain a `WHERE` clause.
    pub fn push_sql(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for condition in &self.conditions {
            builder.push(" AND ");
            condition.push_sql(builder);
        }
    }
}

fn split_key(key: &str) -> Result<(&str, Option<&str>), QueryError> {
    match key.find('[') {
        None => Ok((key, None)),
        Some(start) if key.ends_with(']') && start + 1 < key.len() - 1 => {
            Ok((&key[..start], Some(&key[start + 1..key.len() - 1])))
        }
        Some(_) => Err(QueryError::MalformedKey(key.to_string())),
    }
}
