/// Error types and response envelope for vote-service
///
/// Every HTTP response is `{"code": <ResCode>, "msg": <text>, "data": <payload|null>}`.
use crate::services::{ListingError, PostStoreError, VoteError};
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Stable business codes carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResCode {
    Success = 1000,
    InvalidParam = 1001,
    ServerBusy = 1005,
    NeedLogin = 1006,
    VoteTimeExpire = 1009,
    VoteRepeated = 1010,
    PostNotFound = 1011,
}

impl ResCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn msg(self) -> &'static str {
        match self {
            ResCode::Success => "success",
            ResCode::InvalidParam => "invalid parameter",
            ResCode::ServerBusy => "server busy",
            ResCode::NeedLogin => "login required",
            ResCode::VoteTimeExpire => "voting window has closed",
            ResCode::VoteRepeated => "vote already recorded",
            ResCode::PostNotFound => "post not found",
        }
    }
}

#[derive(Serialize)]
pub struct ResponseData<T: Serialize> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

/// 200 with the success envelope around `data`.
pub fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ResponseData {
        code: ResCode::Success.code(),
        msg: ResCode::Success.msg().to_string(),
        data: Some(data),
    })
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Login required")]
    NeedLogin,

    #[error("Server busy: {0}")]
    ServerBusy(String),

    #[error("Voting window has closed")]
    VotingWindowExpired,

    #[error("Vote already recorded")]
    DuplicateVote,

    #[error("Post not found")]
    PostNotFound,
}

impl AppError {
    pub fn res_code(&self) -> ResCode {
        match self {
            AppError::InvalidParam(_) => ResCode::InvalidParam,
            AppError::NeedLogin => ResCode::NeedLogin,
            AppError::ServerBusy(_) => ResCode::ServerBusy,
            AppError::VotingWindowExpired => ResCode::VoteTimeExpire,
            AppError::DuplicateVote => ResCode::VoteRepeated,
            AppError::PostNotFound => ResCode::PostNotFound,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidParam(_) => StatusCode::BAD_REQUEST,
            AppError::NeedLogin => StatusCode::UNAUTHORIZED,
            AppError::ServerBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::VotingWindowExpired => StatusCode::FORBIDDEN,
            AppError::DuplicateVote => StatusCode::CONFLICT,
            AppError::PostNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = self.res_code();
        // Infrastructure detail stays in the logs.
        let msg = match self {
            AppError::InvalidParam(detail) => format!("{}: {}", code.msg(), detail),
            _ => code.msg().to_string(),
        };

        HttpResponse::build(self.status_code()).json(ResponseData::<()> {
            code: code.code(),
            msg,
            data: None,
        })
    }
}

impl From<VoteError> for AppError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::VotingWindowExpired => AppError::VotingWindowExpired,
            VoteError::DuplicateVote => AppError::DuplicateVote,
            VoteError::PostNotFound => AppError::PostNotFound,
            VoteError::StoreUnavailable(e) => AppError::ServerBusy(e.to_string()),
        }
    }
}

impl From<ListingError> for AppError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::InvalidCommunity(raw) => {
                AppError::InvalidParam(format!("community_id {:?} is not a number", raw))
            }
            ListingError::Store(e) => AppError::ServerBusy(e.to_string()),
            ListingError::Posts(e) => AppError::ServerBusy(e.to_string()),
        }
    }
}

impl From<PostStoreError> for AppError {
    fn from(err: PostStoreError) -> Self {
        AppError::ServerBusy(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidParam(errors.to_string())
    }
}
