use serde::Serialize;
use time::{OffsetDateTime, Time, UtcOffset};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    karma::repo_types::{KarmaEntry, KarmaType, NewKarmaEntry},
    state::AppState,
};

/// `[midnight at the configured offset, now)`. Summary and reset both go
/// through this so they always agree on which entries are "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodayWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TodayWindow {
    pub fn at(now: OffsetDateTime, offset: UtcOffset) -> Self {
        let start = now.to_offset(offset).replace_time(Time::MIDNIGHT);
        Self { start, end: now }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodaySummary {
    pub good: u32,
    pub bad: u32,
    pub points: i64,
}

impl TodaySummary {
    /// Sums the stored `points` rather than recomputing them from the type.
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a KarmaEntry>) -> Self {
        entries
            .into_iter()
            .fold(TodaySummary::default(), |mut acc, entry| {
                match entry.kind {
                    KarmaType::Good => acc.good += 1,
                    KarmaType::Bad => acc.bad += 1,
                }
                acc.points += i64::from(entry.points);
                acc
            })
    }
}

fn today_window(st: &AppState) -> TodayWindow {
    TodayWindow::at(OffsetDateTime::now_utc(), st.config.karma.day_offset)
}

pub async fn append(
    st: &AppState,
    user_id: Uuid,
    kind: Option<&str>,
) -> Result<KarmaEntry, AppError> {
    let kind = match kind.map(str::parse::<KarmaType>) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            warn!(user_id = %user_id, error = %e, "rejected karma entry");
            return Err(AppError::Validation("Invalid type".into()));
        }
        None => return Err(AppError::Validation("Invalid type".into())),
    };

    let entry = st
        .karma
        .insert(NewKarmaEntry::new(user_id, kind, OffsetDateTime::now_utc()))
        .await?;
    info!(user_id = %user_id, entry_id = %entry.id, kind = %entry.kind, "karma recorded");
    Ok(entry)
}

pub async fn history(st: &AppState, user_id: Uuid) -> Result<Vec<KarmaEntry>, AppError> {
    Ok(st.karma.list_by_user(user_id).await?)
}

pub async fn today_summary(st: &AppState, user_id: Uuid) -> Result<TodaySummary, AppError> {
    let window = today_window(st);
    let entries = st
        .karma
        .list_between(user_id, window.start, window.end)
        .await?;
    Ok(TodaySummary::tally(&entries))
}

/// Irreversibly deletes today's entries; earlier days are untouched.
pub async fn reset_today(st: &AppState, user_id: Uuid) -> Result<u64, AppError> {
    let window = today_window(st);
    let removed = st
        .karma
        .delete_between(user_id, window.start, window.end)
        .await?;
    info!(user_id = %user_id, removed, "today's karma reset");
    Ok(removed)
}
