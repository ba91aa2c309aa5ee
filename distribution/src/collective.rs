//! Scatter, gather and all-gather of a block-distributed array.
//!
//! The global buffer holds `total()` elements, a rank's local buffer holds
//! `count()` elements, both at the distribution's current scale. Buffers may be
//! longer than that; only the leading part is read or written. Shorter buffers
//! panic. Every rank of the group must take part in each call.

use bytemuck::Pod;
use communicator::Transport;
use log::debug;

use crate::BlockDistribution;

fn local_prefix<'a, T>(buf: &'a [T], count: usize, op: &str) -> &'a [T] {
    assert!(
        buf.len() >= count,
        "{op}: local buffer holds {} elements, {count} required",
        buf.len()
    );
    &buf[..count]
}

fn local_prefix_mut<'a, T>(buf: &'a mut [T], count: usize, op: &str) -> &'a mut [T] {
    assert!(
        buf.len() >= count,
        "{op}: local buffer holds {} elements, {count} required",
        buf.len()
    );
    &mut buf[..count]
}

fn global_prefix<'a, T>(buf: &'a [T], total: usize, op: &str) -> &'a [T] {
    assert!(
        buf.len() >= total,
        "{op}: global buffer holds {} elements, {total} required",
        buf.len()
    );
    &buf[..total]
}

fn global_prefix_mut<'a, T>(buf: &'a mut [T], total: usize, op: &str) -> &'a mut [T] {
    assert!(
        buf.len() >= total,
        "{op}: global buffer holds {} elements, {total} required",
        buf.len()
    );
    &mut buf[..total]
}

/// Split `root`'s `global_src` by the distribution and deliver each block into
/// the owning rank's `local_dst`, the root's own block included.
///
/// `global_src` is only read on `root`; other ranks may pass an empty slice.
pub fn scatter<T: Pod, C: Transport>(
    distribution: &BlockDistribution<'_, T, C>,
    root: usize,
    global_src: &[T],
    local_dst: &mut [T],
) {
    let group = distribution.group();
    group.check_rank(root);
    let local_dst = local_prefix_mut(local_dst, distribution.count(), "scatter");
    let global_src: &[T] = if group.rank() == root {
        global_prefix(global_src, distribution.total(), "scatter")
    } else {
        &[]
    };
    debug!(
        "scatter from {}, {} bytes, {}",
        root,
        distribution.byte_total(),
        distribution
    );

    if group.is_single_process() {
        local_dst.copy_from_slice(global_src);
        return;
    }
    group.transport().scatter_variable(
        bytemuck::cast_slice(global_src),
        &distribution.byte_counts(),
        &distribution.byte_offsets(),
        bytemuck::cast_slice_mut(local_dst),
        root,
    );
}

/// Place every rank's `local_src` block into `root`'s `global_dst` at the
/// block's offset.
///
/// `global_dst` is only written on `root`; other ranks may pass an empty slice.
pub fn gather<T: Pod, C: Transport>(
    distribution: &BlockDistribution<'_, T, C>,
    root: usize,
    local_src: &[T],
    global_dst: &mut [T],
) {
    let group = distribution.group();
    group.check_rank(root);
    let local_src = local_prefix(local_src, distribution.count(), "gather");
    let global_dst: &mut [T] = if group.rank() == root {
        global_prefix_mut(global_dst, distribution.total(), "gather")
    } else {
        &mut []
    };
    debug!(
        "gather to {}, {} bytes, {}",
        root,
        distribution.byte_total(),
        distribution
    );

    if group.is_single_process() {
        global_dst.copy_from_slice(local_src);
        return;
    }
    group.transport().gather_variable(
        bytemuck::cast_slice(local_src),
        bytemuck::cast_slice_mut(global_dst),
        &distribution.byte_counts(),
        &distribution.byte_offsets(),
        root,
    );
}

/// As `gather`, but every rank ends up with the whole array in `global_dst`.
pub fn gather_all<T: Pod, C: Transport>(
    distribution: &BlockDistribution<'_, T, C>,
    local_src: &[T],
    global_dst: &mut [T],
) {
    let group = distribution.group();
    let local_src = local_prefix(local_src, distribution.count(), "gather_all");
    let global_dst = global_prefix_mut(global_dst, distribution.total(), "gather_all");
    debug!(
        "gather_all, {} bytes, {}",
        distribution.byte_total(),
        distribution
    );

    if group.is_single_process() {
        global_dst.copy_from_slice(local_src);
        return;
    }
    group.transport().all_gather_variable(
        bytemuck::cast_slice(local_src),
        bytemuck::cast_slice_mut(global_dst),
        &distribution.byte_counts(),
        &distribution.byte_offsets(),
    );
}

impl<T: Pod, C: Transport> BlockDistribution<'_, T, C> {
    #[inline]
    pub fn scatter(&self, root: usize, global_src: &[T], local_dst: &mut [T]) {
        scatter(self, root, global_src, local_dst)
    }

    #[inline]
    pub fn gather(&self, root: usize, local_src: &[T], global_dst: &mut [T]) {
        gather(self, root, local_src, global_dst)
    }

    #[inline]
    pub fn gather_all(&self, local_src: &[T], global_dst: &mut [T]) {
        gather_all(self, local_src, global_dst)
    }
}
