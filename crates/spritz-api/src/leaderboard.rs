use axum::{Json, extract::State};
use serde::Deserialize;

use spritz_types::api::LeaderboardResponse;
use spritz_types::models::{LeaderboardEntry, normalize_any};

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::{AppState, read_or_empty};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
    pub user_address: Option<String>,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let user = query
        .user_address
        .filter(|a| !a.trim().is_empty())
        .map(|a| normalize_any(&a));

    let (rows, user_rank) = read_or_empty(&state, "users", move |db| {
        let rows = db.leaderboard(limit)?;
        let rank = match user {
            Some(address) => db.user_rank(&address)?,
            None => None,
        };
        Ok((rows, rank))
    })
    .await?;

    let leaderboard = rows
        .into_iter()
        .zip(1..)
        .map(|(row, rank)| LeaderboardEntry {
            rank,
            wallet_address: row.wallet_address,
            username: row.username,
            ens_name: row.ens_name,
            points: row.points,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        leaderboard,
        user_rank,
    }))
}
