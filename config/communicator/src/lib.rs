//! Process groups for the block distribution layer.
//!
//! - `Transport`: the byte-level services a group is built on (point-to-point,
//!   variable-count scatter/gather/all-gather, broadcast, sum reduction, clock)
//! - `Group`: a typed handle over a transport, one per rank
//! - `LocalTransport`: ranks simulated by threads of the current process
//! - `MpiTransport` (feature `mpi`): ranks are the processes of `MPI_COMM_WORLD`

mod common;

mod config;
pub use config::TransportKind;

mod errors;
pub use errors::CommError;

mod group;
pub use group::Group;

mod local_transport;
pub use local_transport::{run_local, LocalTransport};

#[cfg(feature = "mpi")]
mod mpi_transport;
#[cfg(feature = "mpi")]
pub use mpi_transport::MpiTransport;

mod traits;
pub use traits::{NumericKind, SumElement, Transport};
