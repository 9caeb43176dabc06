//! Shared handles injected into every request handler.

use crate::services::{ListingConfig, ListingService, PostStore, VoteEngine, VoteEngineConfig};
use crate::store::ScoreStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScoreStore>,
    pub posts: Arc<dyn PostStore>,
    pub engine: VoteEngine,
    pub listing: ListingService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ScoreStore>,
        posts: Arc<dyn PostStore>,
        vote_config: VoteEngineConfig,
        listing_config: ListingConfig,
    ) -> Self {
        Self {
            engine: VoteEngine::new(store.clone(), vote_config),
            listing: ListingService::new(store.clone(), posts.clone(), listing_config),
            store,
            posts,
        }
    }
}
