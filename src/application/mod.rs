//! Application services layer.

pub mod admin;
pub mod assets;
pub mod error;
pub mod feed;
pub mod identity;
pub mod pagination;
pub mod repos;
