//! Pressroom: post storage, live published feed and operator authoring.

pub mod application;
pub mod changefeed;
pub mod config;
pub mod domain;
pub mod infra;
