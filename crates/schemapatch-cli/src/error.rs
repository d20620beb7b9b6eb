use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schemapatch(#[from] schemapatch::error::Error),

    #[error("cannot read {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("cannot parse {path} as {format}: {reason}")]
    FileParse {
        path: String,
        format: &'static str,
        reason: String,
    },

    #[error("cannot write {path}: {reason}")]
    FileWrite { path: String, reason: String },

    #[error("cannot start logger: {0}")]
    LoggerStart(String),
}
