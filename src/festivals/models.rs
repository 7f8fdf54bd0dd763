use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FestivalKind {
    /// Campus festivals, always listed before external ones.
    School,
    External,
}

impl FestivalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FestivalKind::School => "school",
            FestivalKind::External => "external",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "school" => Some(FestivalKind::School),
            "external" => Some(FestivalKind::External),
            _ => None,
        }
    }
}

/// A festival row. Dates are kept as the text they were stored with and
/// only interpreted by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Festival {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub start_date: String,
    pub end_date: Option<String>,
    /// `None` when the stored type is not one we know.
    #[serde(rename = "type")]
    pub kind: Option<FestivalKind>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub ticket_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Temporal state of a festival, also used to select a listing tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FestivalPhase {
    Upcoming,
    Ongoing,
    Ended,
}

impl Default for FestivalPhase {
    fn default() -> Self {
        FestivalPhase::Upcoming
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FestivalStatus {
    pub phase: FestivalPhase,
    /// `D-<n>`, `D-Day`, `NOW` or `END`.
    pub d_day: String,
    pub starts_at: DateTime<Utc>,
    pub effective_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedFestival {
    #[serde(flatten)]
    pub festival: Festival,
    pub status: FestivalStatus,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewFestival {
    pub name: String,
    pub location: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub kind: FestivalKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub ticket_url: Option<String>,
}
