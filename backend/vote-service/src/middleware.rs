use crate::error::AppError;
use actix_web::{FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// Header the gateway sets after authenticating the caller.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Verified caller identity. Extraction fails with `NeedLogin` when the header is
/// missing or not a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

impl FromRequest for UserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.headers()
                .get(USER_ID_HEADER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<i64>().ok())
                .filter(|id| *id > 0)
                .map(UserId)
                .ok_or(AppError::NeedLogin),
        )
    }
}
