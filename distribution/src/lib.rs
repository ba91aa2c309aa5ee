//! Block distribution of a flat array over a process group, and the
//! collectives that move blocks between a global buffer and per-rank buffers.
//!
//! A `BlockDistribution` is derived from a `Group` and the length of the
//! logical array. `scatter`, `gather` and `gather_all` then move data according
//! to it through the group's transport.

mod collective;
pub use collective::{gather, gather_all, scatter};

mod distribution;
pub use distribution::{block_partition, BlockDistribution, ScaleFactor};

#[cfg(test)]
mod tests;
