use crate::app_state::AppState;
use crate::error::{success, AppError, Result};
use crate::middleware::UserId;
use crate::models::VoteDirection;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Deserializer};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct VoteRequest {
    #[validate(length(min = 1, max = 32))]
    pub post_id: String,
    /// -1, 0 or 1; accepted as a JSON number or a numeric string.
    #[serde(deserialize_with = "number_or_string")]
    #[validate(range(min = -1, max = 1))]
    pub direction: i64,
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom("direction must be an integer")),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom("direction must be an integer")),
        _ => Err(D::Error::custom("direction must be an integer")),
    }
}

/// POST /api/v1/vote
pub async fn cast_vote(
    state: web::Data<AppState>,
    user: UserId,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse> {
    let request = body.into_inner();
    request.validate()?;

    let direction = i8::try_from(request.direction)
        .ok()
        .and_then(|value| VoteDirection::try_from(value).ok())
        .ok_or_else(|| AppError::InvalidParam("direction must be -1, 0 or 1".to_string()))?;

    let receipt = state
        .engine
        .cast_vote(user.0, request.post_id.trim(), direction)
        .await?;

    Ok(success(receipt))
}
