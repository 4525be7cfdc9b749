use serde::{Deserialize, Serialize};

use super::{repo_types::KarmaEntry, services::TodaySummary};

/// Request body for `POST /karma`. `type` stays a raw string so that bad
/// values are reported as a validation error.
#[derive(Debug, Default, Deserialize)]
pub struct AddKarmaRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub entry: KarmaEntry,
}

#[derive(Debug, Serialize)]
pub struct KarmaOverview {
    pub history: Vec<KarmaEntry>,
    pub today: TodaySummary,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
