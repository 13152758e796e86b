use std::{
    io,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Load(e) => e.is_retryable(),
            Error::Save(e) => e.is_retryable(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse '{}' as json: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl LoadError {
    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_owned(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.to_owned(),
            source,
        }
    }

    /// A read fault may clear up on its own; a corrupt document will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Read { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            LoadError::Read { path, .. } | LoadError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("{message}")]
    Serialization {
        path: PathBuf,
        message: String,
        source: EncodeError,
    },
    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl SaveError {
    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        let source = if source.kind() == io::ErrorKind::CrossesDevices {
            io::Error::new(
                io::ErrorKind::CrossesDevices,
                format!(
                    "temporary file is not on the same filesystem as the target, refusing a non-atomic replace: {source}"
                ),
            )
        } else {
            source
        };
        Self::Write {
            path: path.to_owned(),
            source,
        }
    }

    /// A cross-filesystem setup is a misconfiguration and will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SaveError::Write { source, .. } => source.kind() != io::ErrorKind::CrossesDevices,
            SaveError::Serialization { .. } => false,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SaveError::Serialization { path, .. } | SaveError::Write { path, .. } => path,
        }
    }
}

/// Why a [`Node`](crate::Node) could not be turned into JSON.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EncodeError {
    #[error("float {0} is not valid json")]
    NonFiniteFloat(f64),
    #[error("key '{0}' is not a valid json object key")]
    InvalidKey(String),
    #[error("value of type {0} is not json serializable")]
    Unsupported(String),
    #[error("encoder fallback for {0} did not terminate")]
    FallbackLoop(String),
    #[error("{0}")]
    Custom(String),
}

impl serde::ser::Error for EncodeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        EncodeError::Custom(msg.to_string())
    }
}
