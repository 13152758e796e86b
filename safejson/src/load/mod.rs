use std::{fs, io, path::Path};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Dispatch, dispatcher};

use crate::{LoadResult, error::LoadError};

/// Load a JSON document, falling back to `default` when the file is absent.
///
/// A missing file is not an error. Anything else that goes wrong is.
pub fn json<P, T>(path: P, default: T) -> LoadResult<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "json file not found, using default");
            return Ok(default);
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "json file reading failed");
            return Err(LoadError::read(path, e));
        }
    };

    // utf-8 is validated by the parser
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "could not parse json content");
        LoadError::parse(path, e)
    })
}

/// Untyped load. The default default is an empty object.
pub fn document<P>(path: P, default: Option<Value>) -> LoadResult<Value>
where
    P: AsRef<Path>,
{
    json(path, default.unwrap_or_else(|| Value::Object(Default::default())))
}

pub fn json_or_default<P, T>(path: P) -> LoadResult<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned + Default,
{
    json(path, T::default())
}

/// The loader with its own log sink.
#[derive(Clone)]
pub struct Loader {
    dispatch: Dispatch,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Logs to the dispatcher that is current at construction.
    pub fn new() -> Self {
        Self::with_dispatch(dispatcher::get_default(|current| current.clone()))
    }

    pub fn with_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    pub fn document<P>(&self, path: P, default: Option<Value>) -> LoadResult<Value>
    where
        P: AsRef<Path>,
    {
        dispatcher::with_default(&self.dispatch, || document(path, default))
    }

    pub fn json<P, T>(&self, path: P, default: T) -> LoadResult<T>
    where
        P: AsRef<Path>,
        T: DeserializeOwned,
    {
        dispatcher::with_default(&self.dispatch, || json(path, default))
    }

    pub fn json_or_default<P, T>(&self, path: P) -> LoadResult<T>
    where
        P: AsRef<Path>,
        T: DeserializeOwned + Default,
    {
        dispatcher::with_default(&self.dispatch, || json_or_default(path))
    }
}
