use chrono::NaiveDateTime;
use serde::Deserialize;

/// Negative value of the two-valued flag columns; the default when absent.
pub const FLAG_NO: &str = "否";

pub const TAG_DELIMITER: char = ',';

/// A persisted clinic record.
///
/// `specialties` and `media_items` hold delimiter-joined tag lists exactly as
/// stored; use [`split_tags`] to read them as tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Clinic {
    pub id: i64,
    pub region: Option<String>,
    pub district: Option<String>,
    pub name: String,
    pub health_mall: String,
    pub hundred_position: String,
    pub media_items: Option<String>,
    pub specialties: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub contact_person: Option<String>,
    pub business_hours: Option<String>,
    pub note: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Field values for a create, an update, or a staged import row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewClinic {
    pub region: Option<String>,
    pub district: Option<String>,
    pub name: String,
    pub health_mall: Option<String>,
    pub hundred_position: Option<String>,
    pub media_items: Option<String>,
    pub specialties: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub contact_person: Option<String>,
    pub business_hours: Option<String>,
    pub note: Option<String>,
}

impl NewClinic {
    pub fn health_mall_or_default(&self) -> &str {
        flag_or_default(self.health_mall.as_deref())
    }

    pub fn hundred_position_or_default(&self) -> &str {
        flag_or_default(self.hundred_position.as_deref())
    }
}

fn flag_or_default(v: Option<&str>) -> &str {
    match v {
        Some(s) if !s.trim().is_empty() => s,
        _ => FLAG_NO,
    }
}

/// Splits a multi-valued tag field, trimming each piece and dropping empties.
pub fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Treats `None` and the empty string alike.
pub fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}
