use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("store image {path} is {found} bytes, expected {expected}")]
    ImageSize {
        path: String,
        expected: usize,
        found: usize,
    },
    #[error("store capacity must be > 0")]
    ZeroCapacity,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
