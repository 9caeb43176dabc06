//! Periodic background jobs.

pub mod vote_archiver;
