pub mod assets;
pub mod entities;
pub mod error;
pub mod posts;
