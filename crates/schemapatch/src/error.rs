use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("patch shape contradicts schema at {path}: expected {expected}, got {got}")]
    SchemaShape {
        path: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("overlay key '{key}' at {path} is not declared in schema and preserveUnknownFields is false")]
    SchemaMismatch { path: String, key: String },

    #[error("expression failed to compile: {0}")]
    ExpressionCompile(String),

    #[error("expression evaluation failed: {0}")]
    ExpressionEval(String),

    #[error("removal path '{0}' descends into a sequence, which is not supported")]
    RemovalUnsupported(String),

    #[error("removal path is empty")]
    RemovalPathEmpty,

    #[error("patch is missing required key 'mutation'")]
    MissingMutationKey,
}
