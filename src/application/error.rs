use std::error::Error as StdError;

use thiserror::Error;

use crate::application::admin::posts::AuthoringError;
use crate::application::feed::FeedError;
use crate::application::repos::RepoError;
use crate::config::LoadError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

/// Messages of an error and each of its sources, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<FeedError> for AppError {
    fn from(error: FeedError) -> Self {
        match error {
            FeedError::NotFound => AppError::NotFound,
            FeedError::Repo(err) => AppError::Repo(err),
        }
    }
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Domain(DomainError::NotFound { .. })
            | AppError::Repo(RepoError::NotFound)
            | AppError::Authoring(AuthoringError::NotFound)
            | AppError::NotFound => 3,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Repo(RepoError::Validation { .. })
            | AppError::Authoring(AuthoringError::Validation { .. })
            | AppError::Validation(_) => 4,
            AppError::Config(_) | AppError::Infra(InfraError::Configuration { .. }) => 78,
            AppError::Authoring(AuthoringError::Cancelled) => 0,
            _ => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
