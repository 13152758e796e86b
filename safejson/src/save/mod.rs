use std::{
    borrow::Cow,
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::Path,
    sync::Arc,
};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::TempPath;
use tracing::{Dispatch, dispatcher};

use crate::{
    SaveResult,
    diagnose::{Diagnoser, format_report},
    encode::{self, Encoder, Strict},
    error::{EncodeError, SaveError},
    node::{Node, to_node},
};

const INDENT: &[u8] = b"    ";

#[derive(Clone)]
pub struct SaveOptions {
    private: bool,
    encoder: Arc<dyn Encoder>,
    durable: bool,
    create_dirs: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            private: false,
            encoder: Arc::new(Strict),
            durable: true,
            create_dirs: false,
        }
    }
}

impl fmt::Debug for SaveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveOptions")
            .field("private", &self.private)
            .field("durable", &self.durable)
            .field("create_dirs", &self.create_dirs)
            .finish_non_exhaustive()
    }
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the file readable by its owner only (0600) instead of 0644.
    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn encoder<E>(mut self, encoder: E) -> Self
    where
        E: Encoder + 'static,
    {
        self.encoder = Arc::new(encoder);
        self
    }

    /// fsync the temporary file before it replaces the target.
    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    pub fn is_private(&self) -> bool {
        self.private
    }
}

/// Render `value` as 4-space indented JSON.
pub fn to_string(value: &Node, encoder: &dyn Encoder) -> Result<String, EncodeError> {
    let value = encode::to_value(value, encoder)?;
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value
        .serialize(&mut ser)
        .map_err(|e| EncodeError::Custom(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| EncodeError::Custom(e.to_string()))
}

/// Atomically replace the contents of `path` with `value`.
///
/// Either the whole new document lands at `path` or the previous file is left
/// as it was. Writers to the same path are not coordinated, see
/// [`PathLocks`](crate::PathLocks).
pub fn json<P>(path: P, value: &Node, options: &SaveOptions) -> SaveResult<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let encoder = options.encoder.as_ref();

    let text = match to_string(value, encoder) {
        Ok(text) => text,
        Err(cause) => {
            let report = Diagnoser::new(encoder).find_unserializable(value);
            let bad_data = if report.is_empty() {
                cause.to_string()
            } else {
                format_report(&report)
            };
            let message = format!(
                "Failed to serialize to JSON: {}. Bad data at {bad_data}",
                path.display()
            );
            tracing::error!("{message}");
            return Err(SaveError::Serialization {
                path: path.to_owned(),
                message,
                source: cause,
            });
        }
    };

    write_atomic(path, text.as_bytes(), options).inspect_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "saving json file failed");
    })?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "saved json file");
    Ok(())
}

/// Save any serde value. It is captured as a [`Node`] first so failures get
/// the same diagnostics as [`json`].
pub fn serialized<P, T>(path: P, value: &T, options: &SaveOptions) -> SaveResult<()>
where
    P: AsRef<Path>,
    T: ?Sized + Serialize,
{
    let path = path.as_ref();
    let node = to_node(value).map_err(|cause| {
        let message = format!("Failed to serialize to JSON: {}. {cause}", path.display());
        tracing::error!("{message}");
        SaveError::Serialization {
            path: path.to_owned(),
            message,
            source: cause,
        }
    })?;
    json(path, &node, options)
}

fn write_atomic(path: &Path, contents: &[u8], options: &SaveOptions) -> SaveResult<()> {
    // the temp file must share the target's filesystem for the rename to be atomic
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if options.create_dirs {
        fs::create_dir_all(dir).map_err(|e| SaveError::write(path, e))?;
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or(Cow::Borrowed("json"));
    let temp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| SaveError::write(path, e))?;

    let (file, temp_path) = temp.into_parts();
    let result = replace(file, &temp_path, path, contents, options);
    discard(temp_path);
    result
}

fn replace(
    mut file: File,
    temp_path: &Path,
    path: &Path,
    contents: &[u8],
    options: &SaveOptions,
) -> SaveResult<()> {
    file.write_all(contents)
        .map_err(|e| SaveError::write(path, e))?;
    if options.durable {
        file.sync_all().map_err(|e| SaveError::write(path, e))?;
    }
    drop(file);

    // temp files start out as 0600
    if !options.private {
        make_world_readable(temp_path).map_err(|e| SaveError::write(path, e))?;
    }

    fs::rename(temp_path, path).map_err(|e| SaveError::write(path, e))
}

/// Delete the temp file unless the rename already consumed it. Failures here
/// are logged only so they never mask the outcome of the save.
fn discard(temp_path: TempPath) {
    if !temp_path.exists() {
        let _ = temp_path.keep();
        return;
    }

    let temp_display = temp_path.display().to_string();
    if let Err(e) = temp_path.close() {
        tracing::error!(path = %temp_display, error = %e, "json replacement cleanup failed");
    }
}

#[cfg(unix)]
fn make_world_readable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn make_world_readable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// The saver with its own log sink.
#[derive(Clone)]
pub struct Saver {
    dispatch: Dispatch,
}

impl Default for Saver {
    fn default() -> Self {
        Self::new()
    }
}

impl Saver {
    /// Logs to the dispatcher that is current at construction.
    pub fn new() -> Self {
        Self::with_dispatch(dispatcher::get_default(|current| current.clone()))
    }

    pub fn with_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    pub fn json<P>(&self, path: P, value: &Node, options: &SaveOptions) -> SaveResult<()>
    where
        P: AsRef<Path>,
    {
        dispatcher::with_default(&self.dispatch, || json(path, value, options))
    }

    pub fn serialized<P, T>(&self, path: P, value: &T, options: &SaveOptions) -> SaveResult<()>
    where
        P: AsRef<Path>,
        T: ?Sized + Serialize,
    {
        dispatcher::with_default(&self.dispatch, || serialized(path, value, options))
    }
}
