use std::{fmt, str::FromStr};

use crate::CommError;

/// Which transport backs a process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Ranks are threads of the current process.
    #[default]
    Local,
    /// Ranks are MPI processes of `MPI_COMM_WORLD`.
    Mpi,
}

impl TransportKind {
    pub const MPI_FEATURE: &'static str = "mpi";

    /// Whether this transport is compiled into the current build.
    #[inline]
    pub fn is_available(&self) -> bool {
        match self {
            TransportKind::Local => true,
            TransportKind::Mpi => cfg!(feature = "mpi"),
        }
    }

    pub fn ensure_available(&self) -> Result<(), CommError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CommError::TransportUnavailable(Self::MPI_FEATURE))
        }
    }
}

impl FromStr for TransportKind {
    type Err = CommError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "thread" | "threads" => Ok(TransportKind::Local),
            "mpi" => Ok(TransportKind::Mpi),
            _ => Err(CommError::UnknownTransport(s.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Local => write!(f, "local"),
            TransportKind::Mpi => write!(f, "mpi"),
        }
    }
}
