use std::{fmt, marker::PhantomData, mem::size_of, ops::Range};

use communicator::{Group, Transport};
use itertools::izip;
use log::{trace, warn};

/// Split `total` elements into `ranks` contiguous blocks.
///
/// Ranks `0..total % ranks` get `total / ranks + 1` elements, the rest get
/// `total / ranks`. Returns `(counts, offsets)`, with `offsets` the running
/// prefix sum of `counts`.
pub fn block_partition(total: usize, ranks: usize) -> (Vec<usize>, Vec<usize>) {
    assert!(ranks >= 1, "cannot partition over an empty group");
    let per_rank = total / ranks;
    let remainder = total % ranks;

    let counts: Vec<usize> = (0..ranks)
        .map(|rank| per_rank + usize::from(rank < remainder))
        .collect();
    let offsets: Vec<usize> = counts
        .iter()
        .scan(0usize, |acc, &count| {
            let offset = *acc;
            *acc += count;
            Some(offset)
        })
        .collect();
    (counts, offsets)
}

/// Cumulative scale applied to a distribution, kept as a reduced fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFactor {
    numer: u128,
    denom: u128,
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self { numer: 1, denom: 1 }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl ScaleFactor {
    #[inline(always)]
    pub fn numer(&self) -> u128 {
        self.numer
    }

    #[inline(always)]
    pub fn denom(&self) -> u128 {
        self.denom
    }

    #[inline(always)]
    pub fn is_identity(&self) -> bool {
        self.numer == self.denom
    }

    // Cancelling against the other side first keeps the fraction reduced, so
    // `None` means the product itself does not fit.
    fn checked_mul(self, k: usize) -> Option<Self> {
        let k = k as u128;
        let g = gcd(k, self.denom);
        Some(Self {
            numer: self.numer.checked_mul(k / g)?,
            denom: self.denom / g,
        })
    }

    fn checked_div(self, k: usize) -> Option<Self> {
        let k = k as u128;
        let g = gcd(k, self.numer);
        Some(Self {
            numer: self.numer / g,
            denom: self.denom.checked_mul(k / g)?,
        })
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom == 1 {
            write!(f, "x{}", self.numer)
        } else {
            write!(f, "x{}/{}", self.numer, self.denom)
        }
    }
}

/// The block partition of a logical array of `T` over a process group.
///
/// Every rank computes the same counts and offsets without communicating. The
/// distribution owns its arrays and borrows the group, so it cannot outlive it.
/// It is never implicitly copied; use `clone` to get an independent one.
pub struct BlockDistribution<'g, T, C: Transport> {
    group: &'g Group<C>,
    counts: Vec<usize>,
    offsets: Vec<usize>,
    scale: ScaleFactor,
    _element: PhantomData<fn() -> T>,
}

impl<'g, T, C: Transport> BlockDistribution<'g, T, C> {
    pub fn new(group: &'g Group<C>, total: usize) -> Self {
        let (counts, offsets) = block_partition(total, group.size());
        trace!(
            "rank {}: distributing {} elements over {} ranks",
            group.rank(),
            total,
            group.size()
        );
        Self {
            group,
            counts,
            offsets,
            scale: ScaleFactor::default(),
            _element: PhantomData,
        }
    }

    #[inline(always)]
    pub fn group(&self) -> &'g Group<C> {
        self.group
    }

    /// Rank of the calling process.
    #[inline(always)]
    pub fn rank(&self) -> usize {
        self.group.rank()
    }

    /// Number of ranks the array is distributed over.
    #[inline(always)]
    pub fn ranks(&self) -> usize {
        self.group.size()
    }

    #[inline]
    pub fn count_of(&self, rank: usize) -> usize {
        self.group.check_rank(rank);
        self.counts[rank]
    }

    #[inline]
    pub fn offset_of(&self, rank: usize) -> usize {
        self.group.check_rank(rank);
        self.offsets[rank]
    }

    /// Elements held by the calling rank.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.counts[self.rank()]
    }

    /// Position of the calling rank's block in the global array.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offsets[self.rank()]
    }

    #[inline]
    pub fn range_of(&self, rank: usize) -> Range<usize> {
        let offset = self.offset_of(rank);
        offset..offset + self.counts[rank]
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.range_of(self.rank())
    }

    #[inline(always)]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    #[inline(always)]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Length of the global array, recomputed from the last block.
    #[inline]
    pub fn total(&self) -> usize {
        let last = self.counts.len() - 1;
        self.offsets[last] + self.counts[last]
    }

    #[inline(always)]
    pub fn scale_factor(&self) -> ScaleFactor {
        self.scale
    }

    #[inline]
    pub fn byte_count_of(&self, rank: usize) -> usize {
        self.count_of(rank) * size_of::<T>()
    }

    #[inline]
    pub fn byte_offset_of(&self, rank: usize) -> usize {
        self.offset_of(rank) * size_of::<T>()
    }

    #[inline]
    pub fn byte_total(&self) -> usize {
        self.total() * size_of::<T>()
    }

    pub(crate) fn byte_counts(&self) -> Vec<usize> {
        self.counts.iter().map(|c| c * size_of::<T>()).collect()
    }

    pub(crate) fn byte_offsets(&self) -> Vec<usize> {
        self.offsets.iter().map(|o| o * size_of::<T>()).collect()
    }

    /// A non-empty block bounds the reduced fraction by its own count, so only a
    /// distribution of zero elements can scale past what `ScaleFactor` holds.
    /// Its blocks stay empty whatever the factor; the bookkeeping stops there.
    fn tracked_scale(&self, next: Option<ScaleFactor>, factor: isize) -> ScaleFactor {
        match next {
            Some(next) => next,
            None => {
                warn!(
                    "scale {} by {} is not representable, keeping {}",
                    self.scale, factor, self.scale
                );
                self.scale
            }
        }
    }

    /// Reinterpret the partition at a different granularity, in place.
    ///
    /// `factor > 1` multiplies every count and offset, `factor < -1` divides
    /// them by `|factor|`, and `-1`, `0`, `1` leave them alone. Dividing by a
    /// factor that does not divide every count and offset panics.
    pub fn scale(&mut self, factor: isize) {
        if (-1..=1).contains(&factor) {
            return;
        }
        let k = factor.unsigned_abs();
        if factor > 1 {
            for v in self.counts.iter_mut().chain(self.offsets.iter_mut()) {
                let scaled = match v.checked_mul(k) {
                    Some(scaled) => scaled,
                    None => panic!("scaling {} by {} overflows", v, k),
                };
                *v = scaled;
            }
            self.scale = self.tracked_scale(self.scale.checked_mul(k), factor);
        } else {
            assert!(
                self.counts.iter().chain(&self.offsets).all(|v| v % k == 0),
                "scale factor {} does not divide {}",
                factor,
                self
            );
            for v in self.counts.iter_mut().chain(self.offsets.iter_mut()) {
                *v /= k;
            }
            self.scale = self.tracked_scale(self.scale.checked_div(k), factor);
        }
    }
}

impl<T, C: Transport> Clone for BlockDistribution<'_, T, C> {
    fn clone(&self) -> Self {
        Self {
            group: self.group,
            counts: self.counts.clone(),
            offsets: self.offsets.clone(),
            scale: self.scale,
            _element: PhantomData,
        }
    }
}

// Same blocks; the scale factor is not compared
impl<T, C: Transport> PartialEq for BlockDistribution<'_, T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts && self.offsets == other.offsets
    }
}

impl<T, C: Transport> fmt::Debug for BlockDistribution<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockDistribution")
            .field("rank", &self.rank())
            .field("counts", &self.counts)
            .field("offsets", &self.offsets)
            .field("scale", &self.scale)
            .finish()
    }
}

impl<T, C: Transport> fmt::Display for BlockDistribution<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Distribution:")?;
        for (count, offset) in izip!(&self.counts, &self.offsets) {
            write!(f, " {count}|{offset}")?;
        }
        Ok(())
    }
}
