//! Application services for the operator-facing surface.

pub mod list;
pub mod notices;
pub mod posts;
pub mod search;

pub use list::{OperatorPostList, PostStatusCounts};
pub use posts::AuthoringSession;
