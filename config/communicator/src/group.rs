use std::fmt::Debug;

use bytemuck::Pod;
use log::{info, trace};
use utils::Clock;

use crate::{SumElement, Transport};

/// A fixed-size, fixed-membership process group.
///
/// The group owns its transport; dropping the group tears the transport down.
/// Everything that communicates borrows the group explicitly, there is no
/// process-wide lookup. A group is driven by a single thread.
pub struct Group<C: Transport> {
    world_rank: usize,
    world_size: usize,
    transport: C,
}

impl<C: Transport> Debug for Group<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("world_size", &self.world_size)
            .field("world_rank", &self.world_rank)
            .finish()
    }
}

// Note: compares position only, handles at the same rank of equally sized
// groups are equal
impl<C: Transport> PartialEq for Group<C> {
    fn eq(&self, other: &Self) -> bool {
        self.world_rank == other.world_rank && self.world_size == other.world_size
    }
}

impl<C: Transport> Group<C> {
    /// The root of every rooted operation unless told otherwise.
    pub const ROOT_RANK: usize = 0;

    pub fn new(transport: C) -> Self {
        let world_size = transport.size();
        let world_rank = transport.rank();
        assert!(world_size >= 1, "a process group needs at least one rank");
        assert!(
            world_rank < world_size,
            "rank {world_rank} out of range for a group of {world_size}"
        );
        info!("group initialized, rank {} of {}", world_rank, world_size);
        Self {
            world_rank,
            world_size,
            transport,
        }
    }

    #[inline(always)]
    pub fn rank(&self) -> usize {
        self.world_rank
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.world_size
    }

    #[inline(always)]
    pub fn is_root_rank(rank: usize) -> bool {
        rank == Self::ROOT_RANK
    }

    #[inline(always)]
    pub fn is_root(&self) -> bool {
        Self::is_root_rank(self.world_rank)
    }

    #[inline(always)]
    pub fn is_single_process(&self) -> bool {
        self.world_size == 1
    }

    #[inline(always)]
    pub fn transport(&self) -> &C {
        &self.transport
    }

    /// Panic unless `rank` names a member of this group.
    #[inline]
    pub fn check_rank(&self, rank: usize) {
        assert!(
            rank < self.world_size,
            "rank {rank} out of range for a group of {}",
            self.world_size
        );
    }

    /// Send all of `data` to `dest`. Sending to oneself, or sending nothing,
    /// does not touch the transport.
    pub fn send<T: Pod>(&self, data: &[T], dest: usize) {
        self.check_rank(dest);
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if !bytes.is_empty() && dest != self.world_rank {
            trace!("{} sent {} bytes to {}", self.world_rank, bytes.len(), dest);
            self.transport.send_bytes(bytes, dest);
        }
    }

    /// Receive `data.len()` elements from `src`. Receiving from oneself, or
    /// receiving nothing, does not touch the transport.
    pub fn receive<T: Pod>(&self, data: &mut [T], src: usize) {
        self.check_rank(src);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
        if !bytes.is_empty() && src != self.world_rank {
            self.transport.recv_bytes(bytes, src);
            trace!("{} got {} bytes from {}", self.world_rank, bytes.len(), src);
        }
    }

    /// Every rank ends with `root`'s `data`; `root`'s copy is left as is.
    pub fn broadcast<T: Pod>(&self, data: &mut [T], root: usize) {
        self.check_rank(root);
        if self.is_single_process() || data.is_empty() {
            return;
        }
        self.transport
            .broadcast_bytes(bytemuck::cast_slice_mut(data), root);
    }

    /// Element-wise sum of every rank's `src`, written into `dst` on all ranks.
    ///
    /// The summation order is up to the transport, so floating point results
    /// need not be bit-identical across group sizes.
    pub fn reduce_sum_all<T: SumElement>(&self, src: &[T], dst: &mut [T]) {
        assert!(
            dst.len() >= src.len(),
            "reduction destination holds {} elements, {} required",
            dst.len(),
            src.len()
        );
        let dst = &mut dst[..src.len()];
        if self.is_single_process() {
            dst.copy_from_slice(src);
            return;
        }
        self.transport.reduce_sum_all(
            bytemuck::cast_slice(src),
            bytemuck::cast_slice_mut(dst),
            T::KIND,
        );
    }

    #[inline]
    pub fn barrier(&self) {
        if !self.is_single_process() {
            self.transport.barrier();
        }
    }

    #[inline(always)]
    pub fn now(&self) -> f64 {
        self.transport.now()
    }
}

impl<C: Transport> Clock for Group<C> {
    #[inline(always)]
    fn now(&self) -> f64 {
        self.transport.now()
    }
}

impl<C: Transport> Drop for Group<C> {
    fn drop(&mut self) {
        info!(
            "group finalized, rank {} of {}",
            self.world_rank, self.world_size
        );
    }
}
