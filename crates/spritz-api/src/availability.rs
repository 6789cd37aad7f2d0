use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use spritz_db::models::{AvailabilityRow, NewAvailability};
use spritz_types::api::{
    AvailabilityListResponse, AvailabilityRequest, AvailabilityResponse, SlotsResponse,
    SuccessResponse,
};
use spritz_types::models::normalize_any;

use crate::calendar::{AddressQuery, PROVIDER_GOOGLE, fresh_access_token};
use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::google;
use crate::scheduling::{compute_slots, day_of_week, format_time, parse_time};
use crate::state::{AppState, read_or_empty, with_db};

const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_SLOT_MINUTES: i64 = 30;
const MAX_SLOT_MINUTES: i64 = 8 * 60;
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Check a window and bring its times into `HH:MM` form.
fn validate_window(
    wallet_address: String,
    day_of_week: Option<i64>,
    start_time: Option<&str>,
    end_time: Option<&str>,
    timezone: Option<String>,
    name: Option<String>,
) -> ApiResult<NewAvailability> {
    let day = day_of_week.ok_or_else(|| ApiError::bad_request("dayOfWeek is required"))?;
    if !(0..=6).contains(&day) {
        return Err(ApiError::bad_request("dayOfWeek must be between 0 and 6"));
    }

    let start = start_time
        .and_then(parse_time)
        .ok_or_else(|| ApiError::bad_request("startTime must be HH:MM"))?;
    let end = end_time
        .and_then(parse_time)
        .ok_or_else(|| ApiError::bad_request("endTime must be HH:MM"))?;
    if end <= start {
        return Err(ApiError::bad_request("endTime must be after startTime"));
    }

    Ok(NewAvailability {
        wallet_address,
        name: name.filter(|n| !n.trim().is_empty()),
        day_of_week: day,
        start_time: format_time(start),
        end_time: format_time(end),
        timezone: timezone
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
    })
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<AvailabilityListResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);

    let rows = read_or_empty(&state, "availability_windows", move |db| db.list_availability(&address)).await?;

    Ok(Json(AvailabilityListResponse {
        windows: rows.into_iter().map(AvailabilityRow::into_view).collect(),
    }))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> ApiResult<impl IntoResponse> {
    let address = normalize_any(&required(req.user_address, "User address is required")?);
    let window = validate_window(
        address,
        req.day_of_week,
        req.start_time.as_deref(),
        req.end_time.as_deref(),
        req.timezone,
        req.name,
    )?;

    let row = with_db(&state, move |db| db.insert_availability(&window)).await?;
    debug!("Availability window {} created for {}", row.id, row.wallet_address);

    Ok((
        StatusCode::CREATED,
        Json(AvailabilityResponse {
            window: row.into_view(),
        }),
    ))
}

/// Fields left out of the body keep their stored values; the merged window
/// is validated as a whole.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let address = normalize_any(&required(req.user_address, "User address is required")?);

    let lookup = id.clone();
    let existing = with_db(&state, move |db| db.get_availability(&lookup))
        .await?
        .filter(|w| w.is_active && w.wallet_address == address)
        .ok_or_else(|| ApiError::not_found("Availability window not found"))?;

    let window = validate_window(
        address,
        req.day_of_week.or(Some(existing.day_of_week)),
        Some(req.start_time.as_deref().unwrap_or(&existing.start_time)),
        Some(req.end_time.as_deref().unwrap_or(&existing.end_time)),
        req.timezone.or(Some(existing.timezone)),
        req.name.or(existing.name),
    )?;

    let row = with_db(&state, move |db| db.update_availability(&id, &window))
        .await?
        .ok_or_else(|| ApiError::not_found("Availability window not found"))?;

    Ok(Json(AvailabilityResponse {
        window: row.into_view(),
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);

    let removed = with_db(&state, move |db| db.deactivate_availability(&id, &address)).await?;
    if !removed {
        return Err(ApiError::not_found("Availability window not found"));
    }
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsQuery {
    pub user_address: Option<String>,
    pub date: Option<String>,
    pub duration_minutes: Option<i64>,
    pub utc_offset_minutes: Option<i32>,
}

/// Bookable slots on one date: the weekday's windows minus busy time from a
/// connected Google calendar. A calendar that cannot be read is skipped.
pub async fn slots(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SlotsQuery>,
) -> ApiResult<Json<SlotsResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);
    let raw_date = required(query.date, "Date is required")?;
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("date must be YYYY-MM-DD"))?;

    let duration_minutes = query.duration_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
    if !(1..=MAX_SLOT_MINUTES).contains(&duration_minutes) {
        return Err(ApiError::bad_request("durationMinutes is out of range"));
    }
    let offset_minutes = query.utc_offset_minutes.unwrap_or(0);
    let offset = Some(offset_minutes)
        .filter(|m| (-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(m))
        .and_then(|m| FixedOffset::east_opt(m * 60))
        .ok_or_else(|| ApiError::bad_request("utcOffsetMinutes is out of range"))?;

    let weekday = day_of_week(date) as i64;
    let who = address.clone();
    let rows = read_or_empty(&state, "availability_windows", move |db| db.list_availability(&who)).await?;
    let windows: Vec<_> = rows
        .iter()
        .filter(|w| w.day_of_week == weekday)
        .filter_map(|w| Some((parse_time(&w.start_time)?, parse_time(&w.end_time)?)))
        .collect();

    let busy = if windows.is_empty() {
        vec![]
    } else {
        busy_intervals(&state, &address, date, offset).await
    };

    let slots = compute_slots(
        date,
        offset,
        &windows,
        &busy,
        Duration::minutes(duration_minutes),
        Utc::now(),
    );

    Ok(Json(SlotsResponse {
        date: raw_date,
        duration_minutes,
        slots,
    }))
}

async fn busy_intervals(
    state: &AppState,
    address: &str,
    date: NaiveDate,
    offset: FixedOffset,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let Some(cfg) = state.config.google.as_ref() else {
        return vec![];
    };

    let who = address.to_string();
    let row = match read_or_empty(state, "calendar_connections", move |db| {
        db.get_calendar_connection(&who, PROVIDER_GOOGLE)
    })
    .await
    {
        Ok(Some(row)) if row.is_active => row,
        Ok(_) => return vec![],
        Err(e) => {
            warn!("Calendar lookup failed for {}: {}", address, e);
            return vec![];
        }
    };

    let Some(day_start) = offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
    else {
        return vec![];
    };
    let day_end = day_start + Duration::days(1);

    let result = async {
        let token = fresh_access_token(state, cfg, &row).await?;
        let calendar_id = row.calendar_id.as_deref().unwrap_or("primary");
        let busy = google::free_busy(&state.http, cfg, &token, calendar_id, day_start, day_end).await?;
        let id = row.id.clone();
        with_db(state, move |db| db.mark_calendar_synced(&id)).await?;
        anyhow::Ok(busy)
    }
    .await;

    result.unwrap_or_else(|e| {
        warn!("Could not read busy times for {}: {:#}", address, e);
        vec![]
    })
}
