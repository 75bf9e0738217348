//! Compilation options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read options file `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed options file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for one compilation. Every field has a default, so an options file
/// only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Name of the module being compiled, recorded in its emitted header.
    pub module: String,

    /// Directories searched, in order, for headers of imported modules.
    pub header_dirs: Vec<PathBuf>,

    /// File extension of header files.
    pub header_extension: String,

    /// Treat every warning as blocking at each checkpoint.
    pub warnings_as_errors: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self {
            module: "main".to_string(),
            header_dirs: vec![PathBuf::from(".")],
            header_extension: "splh".to_string(),
            warnings_as_errors: false,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Adds a header directory ahead of the existing ones.
    pub fn with_header_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.header_dirs.insert(0, dir.into());
        self
    }

    pub fn with_header_extension(mut self, extension: impl Into<String>) -> Self {
        self.header_extension = extension.into();
        self
    }

    pub fn with_warnings_as_errors(mut self, deny: bool) -> Self {
        self.warnings_as_errors = deny;
        self
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text)
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new()
    }
}
