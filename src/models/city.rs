use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A supported civic-tech vendor platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Primegov,
    Granicus,
    Civicplus,
    Civicclerk,
    Legistar,
    Novusagenda,
    Iqm2,
    Boarddocs,
    Escribe,
    Swagit,
    Municode,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primegov => "primegov",
            Self::Granicus => "granicus",
            Self::Civicplus => "civicplus",
            Self::Civicclerk => "civicclerk",
            Self::Legistar => "legistar",
            Self::Novusagenda => "novusagenda",
            Self::Iqm2 => "iqm2",
            Self::Boarddocs => "boarddocs",
            Self::Escribe => "escribe",
            Self::Swagit => "swagit",
            Self::Municode => "municode",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primegov" => Some(Self::Primegov),
            "granicus" => Some(Self::Granicus),
            "civicplus" => Some(Self::Civicplus),
            "civicclerk" => Some(Self::Civicclerk),
            "legistar" => Some(Self::Legistar),
            "novusagenda" => Some(Self::Novusagenda),
            "iqm2" => Some(Self::Iqm2),
            "boarddocs" => Some(Self::Boarddocs),
            "escribe" => Some(Self::Escribe),
            "swagit" => Some(Self::Swagit),
            "municode" => Some(Self::Municode),
            _ => None,
        }
    }

    /// Default per-vendor rate-limit delay between requests to the same
    /// vendor: primegov 3s, granicus 4s, civicplus 8s + jitter, 5s default.
    pub fn rate_limit_delay_ms(&self) -> u64 {
        match self {
            Self::Primegov => 3_000,
            Self::Granicus => 4_000,
            Self::Civicplus => 8_000,
            _ => 5_000,
        }
    }

    /// Civicplus additionally jitters 0-2s on top of its base delay.
    pub fn jitter_ms(&self) -> u64 {
        match self {
            Self::Civicplus => 2_000,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityStatus {
    Active,
    Inactive,
    Suspended,
}

impl CityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            _ => Self::Inactive,
        }
    }
}

/// A municipality tracked by the system. Primary key is `banana` = slug +
/// state (e.g. `paloaltoCA`) everywhere else in the schema.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct City {
    pub banana: String,
    pub display_name: String,
    pub state: String,
    pub vendor: String,
    pub vendor_slug: String,
    pub timezone: String,
    pub county: Option<String>,
    pub status: String,
    pub population: Option<i64>,
    /// GeoJSON or similar, opaque to the core.
    pub geometry: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl City {
    pub fn vendor_enum(&self) -> Option<Vendor> {
        Vendor::parse(&self.vendor)
    }

    pub fn status_enum(&self) -> CityStatus {
        CityStatus::parse(&self.status)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status_enum(), CityStatus::Active)
    }
}
