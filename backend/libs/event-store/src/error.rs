use thiserror::Error;

/// Ingestion failures. Every variant names the record that caused it so a
/// broken dataset can be fixed without bisecting the input files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{record} references unknown post {post_id}")]
    UnknownPost { post_id: String, record: String },

    #[error("{record} references unknown user {user_id}")]
    UnknownUser { user_id: String, record: String },

    #[error("post {0} appears more than once")]
    DuplicatePost(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
