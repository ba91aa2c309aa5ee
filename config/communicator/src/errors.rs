use rayon::ThreadPoolBuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("the MPI environment is already initialized in this process")]
    AlreadyInitialized,

    #[error("the MPI environment has already been finalized in this process")]
    Finalized,

    #[error("Unknown string `{0}` for transport type")]
    UnknownTransport(String),

    #[error("transport `{0}` is not compiled in, rebuild with `--features {0}`")]
    TransportUnavailable(&'static str),

    #[error("a process group needs at least one rank, got {0}")]
    InvalidGroupSize(usize),

    #[error("thread pool error: {0:?}")]
    ThreadPoolError(#[from] ThreadPoolBuildError),
}
