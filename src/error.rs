use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Faults that can escape the catalog and walker. Absence of a row or a
/// neighbor is never an error; those surface as `Option::None`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),
}
