use super::ledger::VoteLedger;
use super::posts::{PostStore, PostStoreError};
use crate::metrics::listing as listing_metrics;
use crate::models::{PostDetail, PostOrder, PostPage};
use crate::store::{ScoreStore, StoreError, StoreKey};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Score store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Post store unavailable: {0}")]
    Posts(#[from] PostStoreError),

    #[error("Invalid community_id: {0}")]
    InvalidCommunity(String),
}

/// A normalized listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub size: u64,
    pub order: PostOrder,
    pub community_id: Option<i64>,
}

impl ListQuery {
    /// Normalize raw query values. `page`/`size` below 1 or unparsable fall back to
    /// the defaults, `size` is capped, unknown orders mean `time` and a community of
    /// 0 means "all communities". Only a non-numeric community is rejected.
    pub fn from_raw(
        page: Option<&str>,
        size: Option<&str>,
        order: Option<&str>,
        community_id: Option<&str>,
        config: &ListingConfig,
    ) -> Result<Self, ListingError> {
        let page = positive(page).unwrap_or(DEFAULT_PAGE);
        let size = positive(size)
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size.max(1));

        let community_id = match community_id.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(0) => None,
                Ok(id) => Some(id),
                Err(_) => return Err(ListingError::InvalidCommunity(raw.to_string())),
            },
        };

        Ok(Self {
            page,
            size,
            order: PostOrder::parse_or_default(order),
            community_id,
        })
    }

    pub fn offset(&self) -> usize {
        let offset = self.page.saturating_sub(1).saturating_mul(self.size);
        usize::try_from(offset).unwrap_or(usize::MAX)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
            order: PostOrder::Time,
            community_id: None,
        }
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|value| *value >= 1)
}

/// Ranked pages of post IDs out of the score/time indexes, hydrated from the
/// relational store.
#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn ScoreStore>,
    posts: Arc<dyn PostStore>,
    ledger: VoteLedger,
    config: ListingConfig,
}

impl ListingService {
    pub fn new(
        store: Arc<dyn ScoreStore>,
        posts: Arc<dyn PostStore>,
        config: ListingConfig,
    ) -> Self {
        Self {
            ledger: VoteLedger::new(store.clone()),
            store,
            posts,
            config,
        }
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    pub async fn list_post_ids(&self, query: &ListQuery) -> Result<Vec<String>, ListingError> {
        let index = match query.order {
            PostOrder::Time => StoreKey::PostTime,
            PostOrder::Score => StoreKey::PostScore,
        };
        let (offset, limit) = (query.offset(), query.size as usize);

        let ids = match query.community_id {
            Some(community_id) => {
                self.store
                    .range_desc_within(&index, &StoreKey::community(community_id), offset, limit)
                    .await?
            }
            None => match query.order {
                PostOrder::Time => self.store.range_by_time_desc(&index, offset, limit).await?,
                PostOrder::Score => self.store.range_by_score_desc(&index, offset, limit).await?,
            },
        };

        debug!(
            order = query.order.as_str(),
            page = query.page,
            size = query.size,
            community_id = ?query.community_id,
            count = ids.len(),
            "Listed post ids"
        );
        Ok(ids)
    }

    /// IDs from [`ListingService::list_post_ids`] hydrated in index order. Posts the
    /// relational store no longer has are dropped and counted.
    pub async fn list_posts(&self, query: &ListQuery) -> Result<PostPage, ListingError> {
        let started = Instant::now();
        let ids = self.list_post_ids(query).await?;

        let posts = if ids.is_empty() {
            Vec::new()
        } else {
            self.hydrate(&ids).await?
        };

        let missing = ids.len() - posts.len();
        if missing > 0 {
            listing_metrics::record_hydration_misses(missing);
            warn!(
                requested = ids.len(),
                missing,
                order = query.order.as_str(),
                "Indexed posts missing from relational store"
            );
        }
        listing_metrics::observe_list_duration(query.order.as_str(), started);

        Ok(PostPage {
            order: query.order,
            page: query.page,
            size: query.size,
            requested: ids.len(),
            returned: posts.len(),
            posts,
        })
    }

    /// Tallies come from the live ledger, or from the archive once a closed post's
    /// ledger has been frozen and dropped.
    async fn hydrate(&self, ids: &[String]) -> Result<Vec<PostDetail>, ListingError> {
        let records = self.posts.hydrate_posts(ids).await?;
        let scores = self.store.get_scores(&StoreKey::PostScore, ids).await?;
        let live = self.ledger.tallies(ids).await?;
        let archived = self.posts.archived_tallies(ids).await?;

        Ok(records
            .into_iter()
            .zip(scores)
            .zip(live.into_iter().zip(archived))
            .filter_map(|((record, score), (live, archived))| {
                let tally = archived.unwrap_or(live);
                record.map(|record| PostDetail::from_record(record, score.unwrap_or(0.0), tally))
            })
            .collect())
    }
}
