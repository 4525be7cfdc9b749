use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KarmaType {
    Good,
    Bad,
}

impl KarmaType {
    /// Points recorded for an entry of this type.
    pub fn points(self) -> i32 {
        match self {
            KarmaType::Good => 1,
            KarmaType::Bad => -2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KarmaType::Good => "good",
            KarmaType::Bad => "bad",
        }
    }
}

impl fmt::Display for KarmaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid karma type {0:?}")]
pub struct InvalidKarmaType(pub String);

/// Exact match only: `"Good"` or `" good"` are rejected.
impl FromStr for KarmaType {
    type Err = InvalidKarmaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(KarmaType::Good),
            "bad" => Ok(KarmaType::Bad),
            other => Err(InvalidKarmaType(other.to_string())),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct KarmaEntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub points: i32,
    pub created_at: OffsetDateTime,
}

/// One immutable ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KarmaEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: KarmaType,
    pub points: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<KarmaEntryRow> for KarmaEntry {
    type Error = InvalidKarmaType;

    fn try_from(r: KarmaEntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            kind: r.kind.parse()?,
            points: r.points,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewKarmaEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: KarmaType,
    pub points: i32,
    pub created_at: OffsetDateTime,
}

impl NewKarmaEntry {
    pub fn new(user_id: Uuid, kind: KarmaType, created_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            points: kind.points(),
            created_at,
        }
    }
}
