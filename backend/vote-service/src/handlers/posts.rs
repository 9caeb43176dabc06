use crate::app_state::AppState;
use crate::error::{success, AppError, Result};
use crate::services::ListQuery;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

/// Raw listing parameters; normalized by [`ListQuery::from_raw`].
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub order: Option<String>,
    pub community_id: Option<String>,
}

impl ListParams {
    fn to_query(&self, state: &AppState) -> Result<ListQuery> {
        ListQuery::from_raw(
            self.page.as_deref(),
            self.size.as_deref(),
            self.order.as_deref(),
            self.community_id.as_deref(),
            state.listing.config(),
        )
        .map_err(AppError::from)
    }
}

/// GET /api/v1/posts2
pub async fn list_posts(
    state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let query = params.to_query(&state)?;
    let page = state.listing.list_posts(&query).await.map_err(|e| {
        tracing::error!(error = %e, "Listing posts failed");
        AppError::from(e)
    })?;
    Ok(success(page))
}

/// GET /api/v1/posts2/ids
pub async fn list_post_ids(
    state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let query = params.to_query(&state)?;
    let ids = state.listing.list_post_ids(&query).await.map_err(|e| {
        tracing::error!(error = %e, "Listing post ids failed");
        AppError::from(e)
    })?;
    Ok(success(ids))
}

#[derive(Debug, Serialize)]
struct PostSeeded {
    post_id: String,
    community_id: String,
}

/// POST /internal/v1/posts/{post_id}/created
///
/// Called once the post row is committed; safe to repeat.
pub async fn post_created(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    let community_id = state
        .posts
        .post_community(&post_id)
        .await?
        .ok_or(AppError::PostNotFound)?;

    state.engine.on_post_created(&post_id, community_id).await?;

    Ok(success(PostSeeded {
        post_id,
        community_id: community_id.to_string(),
    }))
}
