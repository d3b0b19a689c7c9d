use crate::dates;
use crate::errors::AppError;
use crate::models::{
    AddCoffeeRequest, CoffeeData, CoffeeEntry, HabitsResponse, RegisterResponse, SessionResponse,
    StatsResponse, Theme, ThemeRequest, ThemeResponse, TimeRange, UserRequest,
};
use crate::state::{AppState, Session};
use crate::stats;
use crate::storage;
use crate::streak::compute_streak;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn normalize_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::bad_request("username must not be empty"));
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid || username.len() > 32 {
        return Err(AppError::bad_request(
            "username may only contain up to 32 letters, digits, '-', '_' or '.'",
        ));
    }
    Ok(username)
}

// Registration is the duplicate-username decision point: an existing name
// comes back with its data so the caller can choose to load it (switch) or
// pick a different identity. Only a fresh name becomes the active session.
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<UserRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let username = normalize_username(&payload.username)?;

    if let Some(backend) = &state.backend {
        match backend.exists(&username).await {
            Ok(true) => {
                let data = match backend.load(&username).await {
                    Ok(record) => record.map(|record| record.data),
                    Err(err) => {
                        warn!("failed to load existing record for {username}: {err}");
                        None
                    }
                };
                return Ok(Json(RegisterResponse { exists: true, data }));
            }
            Ok(false) => {}
            Err(err) => warn!("username lookup failed, treating {username} as new: {err}"),
        }
    }

    let data = CoffeeData::new(&username, Local::now());
    *state.session.lock().await = Some(Session::new(data.clone(), Theme::default()));
    state.schedule_sync();

    Ok(Json(RegisterResponse {
        exists: false,
        data: Some(data),
    }))
}

pub async fn switch_user(
    State(state): State<AppState>,
    Json(payload): Json<UserRequest>,
) -> Result<Json<CoffeeData>, AppError> {
    let username = normalize_username(&payload.username)?;
    let session = load_session(&state, &username).await;
    let data = session.data.clone();

    *state.session.lock().await = Some(session);
    state.schedule_sync();

    Ok(Json(data))
}

// Remote first, local cache when the remote fails or is not configured,
// fresh empty collection otherwise.
async fn load_session(state: &AppState, username: &str) -> Session {
    if let Some(backend) = &state.backend {
        match backend.load(username).await {
            Ok(Some(record)) => return Session::from_record(record),
            Ok(None) => {
                return Session::new(CoffeeData::new(username, Local::now()), Theme::default());
            }
            Err(err) => warn!("remote load failed for {username}, trying the local cache: {err}"),
        }
    }

    match storage::load_cached(&state.data_dir, username).await {
        Some(record) => Session::from_record(record),
        None => Session::new(CoffeeData::new(username, Local::now()), Theme::default()),
    }
}

pub async fn current_user(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.session.lock().await;
    let session = session
        .as_ref()
        .ok_or_else(|| AppError::not_found("no active user"))?;

    Ok(Json(SessionResponse {
        username: session.username.clone(),
        created_at: session.data.created_at,
        entry_count: session.data.entries.len(),
        theme: session.theme,
        last_sync: session.last_sync,
    }))
}

pub async fn delete_user(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let session = state
        .session
        .lock()
        .await
        .take()
        .ok_or_else(|| AppError::not_found("no active user"))?;

    storage::remove_cached(&state.data_dir, &session.username).await?;
    if let Some(backend) = &state.backend {
        if let Err(err) = backend.delete(&session.username).await {
            warn!("remote delete failed for {}: {err}", session.username);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_coffee(
    State(state): State<AppState>,
    Json(payload): Json<AddCoffeeRequest>,
) -> Result<Json<CoffeeEntry>, AppError> {
    let now = Local::now();
    let date = payload
        .date
        .unwrap_or_else(|| now.date_naive().to_string());
    dates::parse_day_key(&date).map_err(|err| AppError::bad_request(err.to_string()))?;

    let entry = CoffeeEntry {
        id: uuid::Uuid::new_v4().to_string(),
        kind: payload.kind,
        timestamp: now,
        date: Some(date),
        notes: payload.notes,
    };

    {
        let mut session = state.session.lock().await;
        let session = session
            .as_mut()
            .ok_or_else(|| AppError::not_found("no active user"))?;
        session.data.push(entry.clone());
    }
    state.schedule_sync();

    Ok(Json(entry))
}

pub async fn remove_coffee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    {
        let mut session = state.session.lock().await;
        let session = session
            .as_mut()
            .ok_or_else(|| AppError::not_found("no active user"))?;
        if !session.data.remove(&id) {
            return Err(AppError::not_found("no entry with that id"));
        }
    }
    state.schedule_sync();

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub date: Option<String>,
    pub month: Option<String>,
}

pub async fn list_coffees(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CoffeeEntry>>, AppError> {
    let session = state.session.lock().await;
    let session = session
        .as_ref()
        .ok_or_else(|| AppError::not_found("no active user"))?;

    let entries = if let Some(raw) = query.date {
        let day = dates::parse_day_key(&raw).map_err(|err| AppError::bad_request(err.to_string()))?;
        session.data.entries_on(day)
    } else if let Some(raw) = query.month {
        let (year, month) = parse_month_key(&raw)?;
        session.data.entries_in_month(year, month)
    } else {
        session.data.entries.clone()
    };

    Ok(Json(entries))
}

fn parse_month_key(raw: &str) -> Result<(i32, u32), AppError> {
    let invalid = || AppError::bad_request(format!("'{raw}' is not a valid YYYY-MM month"));
    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let session = state.session.lock().await;
    let session = session
        .as_ref()
        .ok_or_else(|| AppError::not_found("no active user"))?;

    let now = Local::now();
    let totals = stats::compute_totals(&session.data.entries, now);
    Ok(Json(StatsResponse {
        today: totals.today,
        month: totals.month,
        year: totals.year,
        streak: compute_streak(&session.data.entries, now.date_naive()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HabitsQuery {
    #[serde(default)]
    pub range: TimeRange,
}

pub async fn get_habits(
    State(state): State<AppState>,
    Query(query): Query<HabitsQuery>,
) -> Result<Json<HabitsResponse>, AppError> {
    let session = state.session.lock().await;
    let session = session
        .as_ref()
        .ok_or_else(|| AppError::not_found("no active user"))?;

    Ok(Json(stats::build_habits(
        &session.data.entries,
        query.range,
        Local::now(),
    )))
}

pub async fn get_theme(State(state): State<AppState>) -> Result<Json<ThemeResponse>, AppError> {
    let session = state.session.lock().await;
    let session = session
        .as_ref()
        .ok_or_else(|| AppError::not_found("no active user"))?;

    Ok(Json(ThemeResponse {
        theme: session.theme,
    }))
}

pub async fn set_theme(
    State(state): State<AppState>,
    Json(payload): Json<ThemeRequest>,
) -> Result<Json<ThemeResponse>, AppError> {
    {
        let mut session = state.session.lock().await;
        let session = session
            .as_mut()
            .ok_or_else(|| AppError::not_found("no active user"))?;
        session.theme = payload.theme;
    }
    state.schedule_sync();

    Ok(Json(ThemeResponse {
        theme: payload.theme,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_trimmed_and_lowercased() {
        assert_eq!(normalize_username("  Ana.Maria  ").unwrap(), "ana.maria");
        assert!(normalize_username("").is_err());
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username("ana maria").is_err());
        assert!(normalize_username("../escape").is_err());
        assert!(normalize_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn month_keys_parse_strictly() {
        assert_eq!(parse_month_key("2026-03").unwrap(), (2026, 3));
        assert!(parse_month_key("2026").is_err());
        assert!(parse_month_key("2026-13").is_err());
        assert!(parse_month_key("abcd-ef").is_err());
    }
}
