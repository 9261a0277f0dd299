use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reasons an input path contributes nothing to the candidate set.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("not a file or directory: {}", .0.display())]
    NotFileOrDir(PathBuf),
    #[error("cannot list directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single candidate. Never aborts the batch.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("decode error: {0}")]
    Decode(#[source] BoxError),
    #[error("engine error: {0}")]
    Engine(#[source] BoxError),
    #[error("write error: {0}")]
    Write(#[from] std::io::Error),
}

impl ItemError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Decode(_) => FailureKind::Decode,
            Self::Engine(_) => FailureKind::Engine,
            Self::Write(_) => FailureKind::Write,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Decode,
    Engine,
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decode => "DecodeError",
            Self::Engine => "EngineError",
            Self::Write => "WriteError",
        })
    }
}

/// Fatal: nothing to process.
#[derive(Debug, Error)]
#[error("no candidate images found")]
pub struct NoCandidatesFound;
