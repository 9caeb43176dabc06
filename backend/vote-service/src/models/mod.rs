/// Data models for vote-service
///
/// - `VoteDirection`: the three values a voter can hold on a post
/// - `PostOrder`: the two ranked listing orders
/// - `PostRecord` / `PostDetail`: relational post rows and their listing view
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A voter's stance on a post. `Retract` is both "cancel my vote" and "never voted".
/// Serialized as -1 / 0 / 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteDirection {
    Down,
    Retract,
    Up,
}

impl VoteDirection {
    pub fn value(self) -> i8 {
        match self {
            VoteDirection::Down => -1,
            VoteDirection::Retract => 0,
            VoteDirection::Up => 1,
        }
    }

    /// Score stored in the ledger sorted set.
    pub fn as_score(self) -> f64 {
        f64::from(self.value())
    }

    /// Inverse of [`VoteDirection::as_score`]; `None` for anything that is not -1, 0 or 1.
    pub fn from_score(score: f64) -> Option<Self> {
        if score == -1.0 {
            Some(VoteDirection::Down)
        } else if score == 0.0 {
            Some(VoteDirection::Retract)
        } else if score == 1.0 {
            Some(VoteDirection::Up)
        } else {
            None
        }
    }
}

impl TryFrom<i8> for VoteDirection {
    type Error = InvalidDirection;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteDirection::Down),
            0 => Ok(VoteDirection::Retract),
            1 => Ok(VoteDirection::Up),
            other => Err(InvalidDirection(other)),
        }
    }
}

impl From<VoteDirection> for i8 {
    fn from(direction: VoteDirection) -> Self {
        direction.value()
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDirection(pub i8);

impl fmt::Display for InvalidDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vote direction must be -1, 0 or 1, got {}", self.0)
    }
}

impl std::error::Error for InvalidDirection {}

/// Listing order. Unknown values fall back to `Time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostOrder {
    #[default]
    Time,
    Score,
}

impl PostOrder {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("score") => PostOrder::Score,
            _ => PostOrder::Time,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostOrder::Time => "time",
            PostOrder::Score => "score",
        }
    }
}

/// Outcome of an accepted vote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoteReceipt {
    pub previous: VoteDirection,
    pub next: VoteDirection,
    pub score_delta: f64,
}

/// Up/down vote counts held in a post's ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub up_votes: u64,
    pub down_votes: u64,
}

/// Row from the relational `post` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PostRecord {
    pub post_id: i64,
    pub author_id: i64,
    pub community_id: i64,
    pub status: i32,
    pub title: String,
    pub content: String,
    pub create_time: DateTime<Utc>,
}

/// Post as returned by ranked listings. IDs are strings so 64-bit values survive JSON clients.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post_id: String,
    pub author_id: String,
    pub community_id: String,
    pub status: i32,
    pub title: String,
    pub content: String,
    pub create_time: DateTime<Utc>,
    pub score: f64,
    pub up_votes: u64,
    pub down_votes: u64,
}

impl PostDetail {
    pub fn from_record(record: PostRecord, score: f64, tally: VoteTally) -> Self {
        Self {
            post_id: record.post_id.to_string(),
            author_id: record.author_id.to_string(),
            community_id: record.community_id.to_string(),
            status: record.status,
            title: record.title,
            content: record.content,
            create_time: record.create_time,
            score,
            up_votes: tally.up_votes,
            down_votes: tally.down_votes,
        }
    }
}

/// A hydrated listing page. `requested` counts IDs taken from the index, `returned`
/// the posts the relational store could still resolve.
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub order: PostOrder,
    pub page: u64,
    pub size: u64,
    pub requested: usize,
    pub returned: usize,
    pub posts: Vec<PostDetail>,
}
