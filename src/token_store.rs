use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::model::Token;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("No token stored for project '{0}'")]
    NotFound(String),

    #[error("'{0}' cannot be used as a token file name")]
    InvalidName(String),

    #[error("Failed to access token file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-project token cache, one file per project holding the raw token text.
///
/// A file that exists is trusted as-is: it is never checked against the
/// server, so a revoked token only shows up when a scan is rejected.
#[derive(Debug, Clone)]
pub struct TokenStore {
    root: PathBuf,
}

impl TokenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, project: &str) -> Result<PathBuf, TokenError> {
        if !is_valid_name(project) {
            return Err(TokenError::InvalidName(project.to_string()));
        }
        Ok(self.root.join(project))
    }

    pub fn get(&self, project: &str) -> Result<Token, TokenError> {
        let path = self.path_for(project)?;
        match fs::read_to_string(&path) {
            Ok(value) => {
                debug!(project, path = %path.display(), "using cached token");
                Ok(Token { name: project.to_string(), value })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(TokenError::NotFound(project.to_string()))
            }
            Err(source) => Err(TokenError::File { path, source }),
        }
    }

    pub fn put(&self, project: &str, token: &Token) -> Result<PathBuf, TokenError> {
        let path = self.path_for(project)?;
        fs::create_dir_all(&self.root)
            .map_err(|source| TokenError::File { path: self.root.clone(), source })?;
        fs::write(&path, token.value.as_bytes())
            .map_err(|source| TokenError::File { path: path.clone(), source })?;
        debug!(project, path = %path.display(), "stored token");
        Ok(path)
    }
}

fn is_valid_name(project: &str) -> bool {
    !project.is_empty()
        && project != "."
        && project != ".."
        && !project.contains(['/', '\\', '\0'])
}
