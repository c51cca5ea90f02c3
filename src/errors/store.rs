use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Progress file error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown challenge index {0}")]
    UnknownChallenge(usize),
}

pub type StoreResult<T> = Result<T, StoreError>;
