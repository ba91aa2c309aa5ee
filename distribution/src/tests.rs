use ark_std::{rand::Rng, test_rng};
use communicator::{Group, LocalTransport};

use crate::{block_partition, BlockDistribution};

/// Group handles for every rank of a local group, without running any rank.
fn handles(size: usize) -> Vec<Group<LocalTransport>> {
    LocalTransport::group(size)
        .unwrap()
        .into_iter()
        .map(Group::new)
        .collect()
}

fn check_partition(total: usize, ranks: usize) {
    let (counts, offsets) = block_partition(total, ranks);
    assert_eq!(counts.len(), ranks);
    assert_eq!(offsets.len(), ranks);
    assert_eq!(counts.iter().sum::<usize>(), total);
    assert_eq!(offsets[0], 0);
    for r in 1..ranks {
        assert_eq!(offsets[r], offsets[r - 1] + counts[r - 1]);
    }

    let floor = total / ranks;
    let remainder = total % ranks;
    for (r, &count) in counts.iter().enumerate() {
        let expected = if r < remainder { floor + 1 } else { floor };
        assert_eq!(count, expected, "N={total} R={ranks} rank {r}");
    }
}

#[test]
fn test_partition_examples() {
    assert_eq!(block_partition(10, 3), (vec![4, 3, 3], vec![0, 4, 7]));
    assert_eq!(block_partition(100, 3), (vec![34, 33, 33], vec![0, 34, 67]));
    assert_eq!(block_partition(12, 4), (vec![3, 3, 3, 3], vec![0, 3, 6, 9]));
    assert_eq!(block_partition(7, 1), (vec![7], vec![0]));
}

#[test]
fn test_partition_fewer_elements_than_ranks() {
    assert_eq!(
        block_partition(2, 5),
        (vec![1, 1, 0, 0, 0], vec![0, 1, 2, 2, 2])
    );
}

#[test]
fn test_partition_empty() {
    assert_eq!(block_partition(0, 4), (vec![0; 4], vec![0; 4]));
}

#[test]
fn test_partition_exhaustive_small() {
    for ranks in 1..=9 {
        for total in 0..=50 {
            check_partition(total, ranks);
        }
    }
}

#[test]
fn test_partition_random() {
    let mut rng = test_rng();
    for _ in 0..500 {
        let ranks = rng.gen_range(1..=64);
        let total = rng.gen_range(0..=100_000);
        check_partition(total, ranks);
    }
}

#[test]
#[should_panic(expected = "empty group")]
fn test_partition_no_ranks() {
    block_partition(10, 0);
}

#[test]
fn test_every_rank_agrees() {
    let groups = handles(3);
    let distributions: Vec<BlockDistribution<u32, _>> = groups
        .iter()
        .map(|g| BlockDistribution::new(g, 100))
        .collect();

    for (rank, d) in distributions.iter().enumerate() {
        assert_eq!(d.rank(), rank);
        assert_eq!(d.ranks(), 3);
        assert_eq!(d.counts(), &[34, 33, 33]);
        assert_eq!(d.offsets(), &[0, 34, 67]);
        assert_eq!(d.total(), 100);
        assert_eq!(d, &distributions[0]);
    }
    assert_eq!(distributions[1].count(), 33);
    assert_eq!(distributions[1].offset(), 34);
    assert_eq!(distributions[2].range(), 67..100);
    assert_eq!(distributions[0].range_of(1), 34..67);
}

#[test]
fn test_byte_views() {
    let groups = handles(3);
    let d = BlockDistribution::<f64, _>::new(&groups[1], 10);
    assert_eq!(d.byte_count_of(0), 32);
    assert_eq!(d.byte_offset_of(1), 32);
    assert_eq!(d.byte_offset_of(2), 56);
    assert_eq!(d.byte_total(), 80);
}

#[test]
fn test_scale_round_trip() {
    let groups = handles(3);
    let original = BlockDistribution::<u8, _>::new(&groups[0], 10);
    for k in 2..20isize {
        let mut d = original.clone();
        d.scale(k);
        assert_eq!(d.total(), 10 * k as usize);
        assert_eq!(d.count_of(0), 4 * k as usize);
        assert_eq!(d.offset_of(2), 7 * k as usize);
        assert_eq!(d.scale_factor().numer(), k as u128);
        d.scale(-k);
        assert_eq!(d, original);
        assert!(d.scale_factor().is_identity());
    }
}

#[test]
fn test_scale_composes() {
    let groups = handles(4);
    let original = BlockDistribution::<u8, _>::new(&groups[2], 13);
    let mut d = original.clone();
    d.scale(6);
    d.scale(-2);
    assert_eq!(d.counts(), &[12, 9, 9, 9]);
    assert_eq!(d.scale_factor().to_string(), "x3");
    d.scale(-3);
    assert_eq!(d, original);
}

#[test]
fn test_scale_divides_below_construction() {
    let groups = handles(2);
    let mut d = BlockDistribution::<u8, _>::new(&groups[0], 10);
    d.scale(-5);
    assert_eq!(d.counts(), &[1, 1]);
    assert_eq!(d.offsets(), &[0, 1]);
    assert_eq!(d.total(), 2);
    assert_eq!(d.scale_factor().to_string(), "x1/5");
}

#[test]
fn test_scale_empty_round_trip() {
    let groups = handles(3);
    let original = BlockDistribution::<u8, _>::new(&groups[1], 0);
    let mut d = original.clone();
    d.scale(1 << 40);
    d.scale(1 << 40);
    assert_eq!(d.total(), 0);
    assert_eq!(d.scale_factor().numer(), 1 << 80);
    d.scale(-(1 << 40));
    d.scale(-(1 << 40));
    assert_eq!(d, original);
    assert!(d.scale_factor().is_identity());
}

#[test]
fn test_scale_empty_past_factor_range() {
    let groups = handles(2);
    let original = BlockDistribution::<u8, _>::new(&groups[0], 0);
    let mut d = original.clone();
    for _ in 0..3 {
        d.scale(1 << 62);
    }
    assert_eq!(d.counts(), &[0, 0]);
    for _ in 0..3 {
        d.scale(-(1 << 62));
    }
    assert_eq!(d, original);
}

#[test]
#[should_panic(expected = "overflows")]
fn test_scale_count_overflow() {
    let groups = handles(3);
    let mut d = BlockDistribution::<u8, _>::new(&groups[0], 10);
    d.scale(isize::MAX);
}

#[test]
fn test_scale_noops() {
    let groups = handles(3);
    let original = BlockDistribution::<u8, _>::new(&groups[0], 10);
    let mut d = original.clone();
    for factor in [-1, 0, 1] {
        d.scale(factor);
        assert_eq!(d, original);
    }
}

#[test]
#[should_panic(expected = "does not divide")]
fn test_scale_non_dividing() {
    let groups = handles(3);
    let mut d = BlockDistribution::<u8, _>::new(&groups[0], 10);
    d.scale(-2);
}

#[test]
fn test_clone_is_independent() {
    let groups = handles(2);
    let d = BlockDistribution::<i32, _>::new(&groups[0], 9);
    let mut scaled = d.clone();
    scaled.scale(4);
    assert_ne!(d, scaled);
    assert_eq!(d.total(), 9);
    assert_eq!(scaled.total(), 36);
}

#[test]
fn test_display() {
    let groups = handles(3);
    let d = BlockDistribution::<i32, _>::new(&groups[0], 10);
    assert_eq!(d.to_string(), "Distribution: 4|0 3|4 3|7");
}

#[test]
fn test_zero_total() {
    let groups = handles(3);
    let d = BlockDistribution::<i32, _>::new(&groups[2], 0);
    assert_eq!(d.total(), 0);
    assert_eq!(d.count(), 0);
    assert_eq!(d.offset(), 0);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_count_of_missing_rank() {
    let groups = handles(2);
    let d = BlockDistribution::<i32, _>::new(&groups[0], 9);
    d.count_of(2);
}
