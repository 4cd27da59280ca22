//! Student eligibility filtering for placement drives.
//!
//! The server side turns loosely typed criteria into a [`criteria::Predicate`],
//! runs it against a [`store::StudentStore`] and summarises the matches with
//! [`stats::compute_stats`]. The client side ([`portal`]) drives the same API
//! from the terminal and exports results as CSV.

pub mod api;
pub mod client;
pub mod config;
pub mod criteria;
pub mod db;
pub mod export;
pub mod models;
pub mod portal;
pub mod report;
pub mod stats;
pub mod store;
