use crate::archive::ArchiveError;
use crate::catalog::CatalogError;
use crate::custom::{CustomPartError, ValidationError};
use crate::selection::SelectionError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    CustomPart(#[from] CustomPartError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("unknown part category '{0}' for the current answers")]
    UnknownPart(String),
    #[error("no option named '{option}' for {part}")]
    UnknownOption { part: String, option: String },
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::CustomPart(CustomPartError::Invalid(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
