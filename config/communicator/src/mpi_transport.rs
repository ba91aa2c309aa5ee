use std::fmt::Debug;

use bytemuck::Pod;
use mpi::{
    collective::SystemOperation,
    datatype::{Equivalence, Partition, PartitionMut},
    environment::{self, Universe},
    topology::SimpleCommunicator,
    traits::*,
    Count,
};

use crate::{CommError, Group, NumericKind, Transport};

/// `MPI_COMM_WORLD` of the current process.
///
/// MPI may be initialized once per process and never again after it has been
/// finalized; `init` reports both cases. Dropping the transport finalizes MPI.
pub struct MpiTransport {
    world: SimpleCommunicator,
    world_rank: usize,
    world_size: usize,
    // dropped last: finalizes MPI
    _universe: Universe,
}

impl Debug for MpiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpiTransport")
            .field("world_size", &self.world_size)
            .field("world_rank", &self.world_rank)
            .finish()
    }
}

impl MpiTransport {
    pub fn init() -> Result<Self, CommError> {
        if environment::is_finalized() {
            return Err(CommError::Finalized);
        }
        // None if MPI is already initialized
        let universe = mpi::initialize().ok_or(CommError::AlreadyInitialized)?;
        let world = universe.world();
        let world_rank = world.rank() as usize;
        let world_size = world.size() as usize;
        Ok(Self {
            world,
            world_rank,
            world_size,
            _universe: universe,
        })
    }

    fn all_reduce_sum_as<T: Pod + Equivalence>(&self, src: &[u8], dst: &mut [u8]) {
        let src: &[T] = bytemuck::cast_slice(src);
        let dst: &mut [T] = bytemuck::cast_slice_mut(dst);
        self.world
            .all_reduce_into(src, dst, SystemOperation::sum());
    }
}

/// Counts and displacements in MPI's `int` representation.
fn to_counts(values: &[usize]) -> Vec<Count> {
    values
        .iter()
        .map(|&v| {
            Count::try_from(v)
                .unwrap_or_else(|_| panic!("{v} bytes exceed the MPI count limit"))
        })
        .collect()
}

impl Transport for MpiTransport {
    #[inline(always)]
    fn rank(&self) -> usize {
        self.world_rank
    }

    #[inline(always)]
    fn size(&self) -> usize {
        self.world_size
    }

    fn send_bytes(&self, buf: &[u8], dest: usize) {
        self.world.process_at_rank(dest as i32).send(buf);
    }

    fn recv_bytes(&self, buf: &mut [u8], src: usize) {
        self.world.process_at_rank(src as i32).receive_into(buf);
    }

    fn broadcast_bytes(&self, buf: &mut [u8], root: usize) {
        self.world.process_at_rank(root as i32).broadcast_into(buf);
    }

    fn scatter_variable(
        &self,
        src: &[u8],
        counts: &[usize],
        offsets: &[usize],
        dst: &mut [u8],
        root: usize,
    ) {
        let root_process = self.world.process_at_rank(root as i32);
        if self.world_rank == root {
            let partition = Partition::new(src, to_counts(counts), to_counts(offsets));
            root_process.scatter_varcount_into_root(&partition, dst);
        } else {
            root_process.scatter_varcount_into(dst);
        }
    }

    fn gather_variable(
        &self,
        src: &[u8],
        dst: &mut [u8],
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    ) {
        let root_process = self.world.process_at_rank(root as i32);
        if self.world_rank == root {
            let mut partition = PartitionMut::new(dst, to_counts(counts), to_counts(offsets));
            root_process.gather_varcount_into_root(src, &mut partition);
        } else {
            root_process.gather_varcount_into(src);
        }
    }

    fn all_gather_variable(&self, src: &[u8], dst: &mut [u8], counts: &[usize], offsets: &[usize]) {
        let mut partition = PartitionMut::new(dst, to_counts(counts), to_counts(offsets));
        self.world.all_gather_varcount_into(src, &mut partition);
    }

    fn reduce_sum_all(&self, src: &[u8], dst: &mut [u8], kind: NumericKind) {
        match kind {
            NumericKind::F32 => self.all_reduce_sum_as::<f32>(src, dst),
            NumericKind::F64 => self.all_reduce_sum_as::<f64>(src, dst),
            NumericKind::I32 => self.all_reduce_sum_as::<i32>(src, dst),
            NumericKind::I64 => self.all_reduce_sum_as::<i64>(src, dst),
            NumericKind::U32 => self.all_reduce_sum_as::<u32>(src, dst),
            NumericKind::U64 => self.all_reduce_sum_as::<u64>(src, dst),
        }
    }

    #[inline]
    fn barrier(&self) {
        self.world.barrier();
    }

    #[inline(always)]
    fn now(&self) -> f64 {
        environment::time()
    }
}

impl Group<MpiTransport> {
    /// Join `MPI_COMM_WORLD`. At most one such group may exist per process.
    pub fn init() -> Result<Self, CommError> {
        Ok(Self::new(MpiTransport::init()?))
    }
}
