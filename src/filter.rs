use serde::Deserialize;

use crate::model::Clinic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClinicField {
    Name,
    ContactPerson,
    Address,
    Region,
    Specialties,
    MediaItems,
}

impl ClinicField {
    fn value(self, c: &Clinic) -> Option<&str> {
        match self {
            ClinicField::Name => Some(c.name.as_str()),
            ClinicField::ContactPerson => c.contact_person.as_deref(),
            ClinicField::Address => c.address.as_deref(),
            ClinicField::Region => c.region.as_deref(),
            ClinicField::Specialties => c.specialties.as_deref(),
            ClinicField::MediaItems => c.media_items.as_deref(),
        }
    }
}

/// Raw query-string parameters. Empty means "no constraint".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub search: String,
    pub region: String,
    pub specialty: String,
    pub media_item: String,
}

/// Which fields participate in a filter.
#[derive(Debug, Clone, Copy)]
pub struct FilterProfile {
    search_fields: &'static [ClinicField],
    media_item: bool,
}

/// Catalog listing: `search` covers name and contact person.
pub const LISTING: FilterProfile = FilterProfile {
    search_fields: &[ClinicField::Name, ClinicField::ContactPerson],
    media_item: false,
};

/// Export: `search` also covers the address, and `media_item` applies.
pub const EXPORT: FilterProfile = FilterProfile {
    search_fields: &[
        ClinicField::Name,
        ClinicField::Address,
        ClinicField::ContactPerson,
    ],
    media_item: true,
};

#[derive(Debug, Clone)]
enum Constraint {
    // Case-sensitive substring match against the raw stored text of any field.
    Contains {
        fields: &'static [ClinicField],
        needle: String,
    },
    Equals {
        field: ClinicField,
        value: String,
    },
}

impl Constraint {
    fn holds(&self, c: &Clinic) -> bool {
        match self {
            Constraint::Contains { fields, needle } => fields
                .iter()
                .filter_map(|f| f.value(c))
                .any(|v| v.contains(needle.as_str())),
            Constraint::Equals { field, value } => field.value(c) == Some(value.as_str()),
        }
    }
}

/// Conjunction of the constraints built from non-empty parameters.
#[derive(Debug, Clone, Default)]
pub struct ClinicFilter {
    constraints: Vec<Constraint>,
}

impl ClinicFilter {
    pub fn build(params: &FilterParams, profile: FilterProfile) -> Self {
        let mut constraints = Vec::new();
        if !params.search.is_empty() {
            constraints.push(Constraint::Contains {
                fields: profile.search_fields,
                needle: params.search.clone(),
            });
        }
        if !params.region.is_empty() {
            constraints.push(Constraint::Equals {
                field: ClinicField::Region,
                value: params.region.clone(),
            });
        }
        if !params.specialty.is_empty() {
            constraints.push(Constraint::Contains {
                fields: &[ClinicField::Specialties],
                needle: params.specialty.clone(),
            });
        }
        if profile.media_item && !params.media_item.is_empty() {
            constraints.push(Constraint::Contains {
                fields: &[ClinicField::MediaItems],
                needle: params.media_item.clone(),
            });
        }
        Self { constraints }
    }

    pub fn matches(&self, c: &Clinic) -> bool {
        self.constraints.iter().all(|k| k.holds(c))
    }

    /// Keeps matching records in their original order.
    pub fn apply(&self, clinics: Vec<Clinic>) -> Vec<Clinic> {
        clinics.into_iter().filter(|c| self.matches(c)).collect()
    }
}
