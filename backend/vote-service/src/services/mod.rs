pub mod ledger;
pub mod listing;
pub mod posts;
pub mod vote_engine;

pub use ledger::VoteLedger;
pub use listing::{ListQuery, ListingConfig, ListingError, ListingService};
pub use posts::{PgPostStore, PostStore, PostStoreError};
pub use vote_engine::{score_delta, VoteEngine, VoteEngineConfig, VoteError};
