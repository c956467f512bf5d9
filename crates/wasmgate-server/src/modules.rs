use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use thiserror::Error;

pub const MODULE_EXTENSION: &str = "wasm";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid module name {0:?}")]
    InvalidName(String),

    #[error("unable to find module {}", .0.display())]
    NotFound(PathBuf),

    #[error("unable to read module {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves module names to bytecode files under one directory.
#[derive(Debug, Clone)]
pub struct ModuleStore {
    root: PathBuf,
}

impl ModuleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `name` to `<root>/<name>.wasm`.
    ///
    /// # Errors
    /// Returns [`ResolveError::InvalidName`] for names that could escape the
    /// module directory.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, ResolveError> {
        if !is_valid_name(name) {
            return Err(ResolveError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{name}.{MODULE_EXTENSION}")))
    }

    /// Reads the bytecode for `name`. Every call reads the file afresh.
    ///
    /// # Errors
    /// Returns [`ResolveError::NotFound`] if no such module exists.
    pub async fn load(&self, name: &str) -> Result<Bytes, ResolveError> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ResolveError::NotFound(path)),
            Err(source) => Err(ResolveError::Io { path, source }),
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
