//! Error types for ledger construction and selection

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("invalid genesis block: {0}")]
    InvalidGenesis(String),

    #[error("selection replay failed: {0}")]
    SelectionReplay(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;
