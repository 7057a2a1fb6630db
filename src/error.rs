use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GlossaryError {
    #[error("glossary request failed: {0}")]
    Http(String),

    #[error("chunk {chunk} returned status {status}: {message}")]
    HttpStatus {
        chunk: u32,
        status: u16,
        message: String,
    },

    #[error("first glossary chunk not found on the data host")]
    #[diagnostic(help("check `base_url` in glossary.json"))]
    MissingFirstChunk,

    #[error("glossary data is malformed: {0}")]
    MalformedData(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid entry id: {0}")]
    InvalidEntryId(String),

    #[error("a glossary load is already in progress")]
    LoadInProgress,

    #[error("export failed: {0}")]
    Export(String),
}

impl GlossaryError {
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            GlossaryError::Http(_)
                | GlossaryError::HttpStatus { .. }
                | GlossaryError::MissingFirstChunk
                | GlossaryError::MalformedData(_)
        )
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, GlossaryError::Storage(_) | GlossaryError::Filesystem(_))
    }
}
