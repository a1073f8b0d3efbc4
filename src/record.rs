use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The seven district labels a resident can live on. Closed set; serde
/// round-trips the label text itself so stored JSON stays human-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum StreetNumber {
    #[serde(rename = "零番街")]
    Zero,
    #[serde(rename = "壱番街")]
    First,
    #[serde(rename = "弐番街")]
    Second,
    #[serde(rename = "参番街")]
    Third,
    #[serde(rename = "肆番街")]
    Fourth,
    #[serde(rename = "伍番街")]
    Fifth,
    #[serde(rename = "陸番街")]
    Sixth,
}

impl StreetNumber {
    pub const ALL: [StreetNumber; 7] = [
        StreetNumber::Zero,
        StreetNumber::First,
        StreetNumber::Second,
        StreetNumber::Third,
        StreetNumber::Fourth,
        StreetNumber::Fifth,
        StreetNumber::Sixth,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StreetNumber::Zero => "零番街",
            StreetNumber::First => "壱番街",
            StreetNumber::Second => "弐番街",
            StreetNumber::Third => "参番街",
            StreetNumber::Fourth => "肆番街",
            StreetNumber::Fifth => "伍番街",
            StreetNumber::Sixth => "陸番街",
        }
    }

    pub fn parse(label: &str) -> Option<StreetNumber> {
        Self::ALL.iter().copied().find(|s| s.label() == label)
    }
}

impl std::fmt::Display for StreetNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One issued resident card. Immutable after creation: an "update" appends a
/// fresh record with a new id rather than mutating this one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: String,
    pub owner_id: String,
    pub resident_number: u32,
    pub name: String,
    pub photo_url: String,
    pub street_number: StreetNumber,
    pub address_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apartment_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submitted fields before the store assigns id, number and timestamps.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub owner_id: String,
    pub name: String,
    pub photo_url: String,
    pub street_number: StreetNumber,
    pub address_line: String,
    pub apartment_info: Option<String>,
}

impl NewRecord {
    /// Required text fields must be non-empty before a record is stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        if self.address_line.trim().is_empty() {
            return Err("addressLine is required".into());
        }
        if self.owner_id.trim().is_empty() {
            return Err("userId is required".into());
        }
        Ok(())
    }
}
