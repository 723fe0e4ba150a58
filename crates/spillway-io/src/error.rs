use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage config: {0}")]
    Config(String),

    #[error(transparent)]
    Mem(#[from] spillway_mem::Error),
}
