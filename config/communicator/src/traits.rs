use std::mem::size_of;

use bytemuck::Pod;

/// Element kinds supported by `Transport::reduce_sum_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    F32,
    F64,
    I32,
    I64,
    U32,
    U64,
}

impl NumericKind {
    /// Size of one element in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        match self {
            NumericKind::F32 | NumericKind::I32 | NumericKind::U32 => 4,
            NumericKind::F64 | NumericKind::I64 | NumericKind::U64 => 8,
        }
    }

    /// Element-wise `acc += other`, both holding elements of this kind.
    ///
    /// Neither buffer needs to be aligned for the element type.
    pub fn accumulate(&self, acc: &mut [u8], other: &[u8]) {
        assert_eq!(
            acc.len(),
            other.len(),
            "reduction buffers differ in length"
        );
        assert_eq!(
            acc.len() % self.size(),
            0,
            "reduction buffer is not a whole number of {:?} elements",
            self
        );
        match self {
            NumericKind::F32 => accumulate_as::<f32>(acc, other),
            NumericKind::F64 => accumulate_as::<f64>(acc, other),
            NumericKind::I32 => accumulate_as::<i32>(acc, other),
            NumericKind::I64 => accumulate_as::<i64>(acc, other),
            NumericKind::U32 => accumulate_as::<u32>(acc, other),
            NumericKind::U64 => accumulate_as::<u64>(acc, other),
        }
    }
}

fn accumulate_as<T: SumElement>(acc: &mut [u8], other: &[u8]) {
    acc.chunks_exact_mut(size_of::<T>())
        .zip(other.chunks_exact(size_of::<T>()))
        .for_each(|(a, b)| {
            let sum = bytemuck::pod_read_unaligned::<T>(a).sum(bytemuck::pod_read_unaligned(b));
            a.copy_from_slice(bytemuck::bytes_of(&sum));
        });
}

/// Plain-old-data numbers that can be summed across a group.
///
/// Integer sums wrap on overflow, as MPI's `MPI_SUM` does.
pub trait SumElement: Pod {
    const KIND: NumericKind;

    fn sum(self, other: Self) -> Self;
}

macro_rules! impl_sum_element_float {
    ($t:ty, $kind:ident) => {
        impl SumElement for $t {
            const KIND: NumericKind = NumericKind::$kind;

            #[inline(always)]
            fn sum(self, other: Self) -> Self {
                self + other
            }
        }
    };
}

macro_rules! impl_sum_element_int {
    ($t:ty, $kind:ident) => {
        impl SumElement for $t {
            const KIND: NumericKind = NumericKind::$kind;

            #[inline(always)]
            fn sum(self, other: Self) -> Self {
                self.wrapping_add(other)
            }
        }
    };
}

impl_sum_element_float!(f32, F32);
impl_sum_element_float!(f64, F64);
impl_sum_element_int!(i32, I32);
impl_sum_element_int!(i64, I64);
impl_sum_element_int!(u32, U32);
impl_sum_element_int!(u64, U64);

/// The byte-level process-group services a `Group` is built on.
///
/// All buffers, counts and offsets are in bytes. Every method is blocking from
/// the caller's point of view and, apart from `send_bytes`/`recv_bytes`, is a
/// collective: every rank of the group must call it, in the same order, with
/// consistent arguments.
///
/// A transport never reports errors; a broken group panics.
pub trait Transport {
    /// Rank of the calling process, in `[0, size)`.
    fn rank(&self) -> usize;

    /// Number of processes in the group, at least one.
    fn size(&self) -> usize;

    /// Send `buf` to `dest`. `dest` is never the calling rank.
    fn send_bytes(&self, buf: &[u8], dest: usize);

    /// Receive a message of exactly `buf.len()` bytes from `src`. `src` is
    /// never the calling rank.
    fn recv_bytes(&self, buf: &mut [u8], src: usize);

    /// Replace `buf` on every rank with its content on `root`.
    fn broadcast_bytes(&self, buf: &mut [u8], root: usize);

    /// Deliver `src[offsets[r]..offsets[r] + counts[r]]` of `root` into `dst` on
    /// rank `r`. `src` is only read on `root`; `dst` is exactly `counts[rank]`
    /// bytes long.
    fn scatter_variable(
        &self,
        src: &[u8],
        counts: &[usize],
        offsets: &[usize],
        dst: &mut [u8],
        root: usize,
    );

    /// Place `src` of rank `r` at `dst[offsets[r]..offsets[r] + counts[r]]` on
    /// `root`. `dst` is only written on `root`.
    fn gather_variable(
        &self,
        src: &[u8],
        dst: &mut [u8],
        counts: &[usize],
        offsets: &[usize],
        root: usize,
    );

    /// As `gather_variable`, with every rank receiving the full `dst`.
    fn all_gather_variable(&self, src: &[u8], dst: &mut [u8], counts: &[usize], offsets: &[usize]);

    /// Element-wise sum of `src` over all ranks into every rank's `dst`.
    fn reduce_sum_all(&self, src: &[u8], dst: &mut [u8], kind: NumericKind);

    fn barrier(&self);

    /// Monotonic wall time in seconds.
    fn now(&self) -> f64;
}
