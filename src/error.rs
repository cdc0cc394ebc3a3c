use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CbzError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("no chapter directories found in {0}")]
    NoChapters(PathBuf),
    #[error("no CBZ files found in {0}")]
    NoArchives(PathBuf),
    #[error("could not extract chapter number from filename: {0}")]
    InvalidArchiveName(String),
    #[error("source directory '{0}' does not exist")]
    SourceMissing(PathBuf),
    #[error("operation cancelled by user")]
    Cancelled,
}

pub type Result<T, E = CbzError> = std::result::Result<T, E>;
