//! Bootcamp fields addressable from the list query string.

/// Value type a field holds, which decides how filter values are parsed
/// and which operators apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Timestamp,
    /// JSON array of strings (`careers`).
    TextList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Slug,
    Description,
    Website,
    Phone,
    Email,
    Careers,
    AverageRating,
    AverageCost,
    Photo,
    Housing,
    JobAssistance,
    JobGuarantee,
    AcceptGi,
    City,
    State,
    Zipcode,
    Country,
    CreatedAt,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::Name,
        Field::Slug,
        Field::Description,
        Field::Website,
        Field::Phone,
        Field::Email,
        Field::Careers,
        Field::AverageRating,
        Field::AverageCost,
        Field::Photo,
        Field::Housing,
        Field::JobAssistance,
        Field::JobGuarantee,
        Field::AcceptGi,
        Field::City,
        Field::State,
        Field::Zipcode,
        Field::Country,
        Field::CreatedAt,
    ];

    /// Look a field up by its public (JSON) name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Public name, as it appears in responses and query strings.
    pub fn name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Slug => "slug",
            Field::Description => "description",
            Field::Website => "website",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Careers => "careers",
            Field::AverageRating => "averageRating",
            Field::AverageCost => "averageCost",
            Field::Photo => "photo",
            Field::Housing => "housing",
            Field::JobAssistance => "jobAssistance",
            Field::JobGuarantee => "jobGuarantee",
            Field::AcceptGi => "acceptGi",
            Field::City => "location.city",
            Field::State => "location.state",
            Field::Zipcode => "location.zipcode",
            Field::Country => "location.country",
            Field::CreatedAt => "createdAt",
        }
    }

    /// Column in the `bootcamps` table. Only ever interpolated from this
    /// fixed set, never from request input.
    pub fn column(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Slug => "slug",
            Field::Description => "description",
            Field::Website => "website",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Careers => "careers",
            Field::AverageRating => "average_rating",
            Field::AverageCost => "average_cost",
            Field::Photo => "photo",
            Field::Housing => "housing",
            Field::JobAssistance => "job_assistance",
            Field::JobGuarantee => "job_guarantee",
            Field::AcceptGi => "accept_gi",
            Field::City => "location_city",
            Field::State => "location_state",
            Field::Zipcode => "location_zipcode",
            Field::Country => "location_country",
            Field::CreatedAt => "created_at",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Careers => FieldKind::TextList,
            Field::AverageRating | Field::AverageCost => FieldKind::Number,
            Field::Housing | Field::JobAssistance | Field::JobGuarantee | Field::AcceptGi => {
                FieldKind::Bool
            }
            Field::CreatedAt => FieldKind::Timestamp,
            _ => FieldKind::Text,
        }
    }

    /// `("location", "city")` for nested fields, `(name, "")` otherwise.
    pub fn path(self) -> (&'static str, &'static str) {
        self.name().split_once('.').unwrap_or((self.name(), ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_lookup() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("average_cost"), None);
        assert_eq!(Field::from_name("id; DROP TABLE bootcamps"), None);
    }

    #[test]
    fn nested_fields_split_into_path() {
        assert_eq!(Field::City.path(), ("location", "city"));
        assert_eq!(Field::AverageCost.path(), ("averageCost", ""));
    }
}
