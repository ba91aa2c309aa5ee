use communicator::{run_local, Group, LocalTransport};
use utils::Timer;

const GROUP_SIZES: [usize; 5] = [1, 2, 3, 4, 5];

#[test]
fn test_rank_and_size() {
    for size in GROUP_SIZES {
        let ranks = run_local(size, |group| {
            assert_eq!(group.size(), size);
            assert_eq!(group.is_root(), group.rank() == 0);
            group.rank()
        })
        .unwrap();
        assert_eq!(ranks, (0..size).collect::<Vec<_>>());
    }
}

#[test]
fn test_root_rank_is_zero() {
    assert!(Group::<LocalTransport>::is_root_rank(0));
    assert!(!Group::<LocalTransport>::is_root_rank(1));
}

#[test]
fn test_send_receive_hello() {
    let received = run_local(3, |group| {
        let mut msg = [0u8; 128];
        if group.is_root() {
            msg[..6].copy_from_slice(b"hello!");
            for to in 1..group.size() {
                group.send(&msg[..10], to);
            }
        } else {
            group.receive(&mut msg[..10], 0);
        }
        msg[..6].to_vec()
    })
    .unwrap();
    for msg in received {
        assert_eq!(msg, b"hello!");
    }
}

#[test]
fn test_self_send_is_noop() {
    let out = run_local(2, |group| {
        let data = [group.rank() as u32 + 1; 4];
        let mut sink = [0u32; 4];
        // would block forever if it went through the transport
        group.send(&data, group.rank());
        group.receive(&mut sink, group.rank());
        sink
    })
    .unwrap();
    assert_eq!(out, vec![[0u32; 4]; 2]);
}

#[test]
fn test_empty_send_is_noop() {
    run_local(2, |group| {
        let peer = 1 - group.rank();
        group.send::<u64>(&[], peer);
        group.receive::<u64>(&mut [], peer);
    })
    .unwrap();
}

#[test]
fn test_point_to_point_ring() {
    for size in [2, 3, 5] {
        let out = run_local(size, |group| {
            let next = (group.rank() + 1) % group.size();
            let prev = (group.rank() + group.size() - 1) % group.size();
            let payload: Vec<i64> = (0..16).map(|i| (group.rank() * 100 + i) as i64).collect();
            let mut incoming = vec![0i64; 16];
            group.send(&payload, next);
            group.receive(&mut incoming, prev);
            (prev, incoming)
        })
        .unwrap();
        for (prev, incoming) in out {
            let expected: Vec<i64> = (0..16).map(|i| (prev * 100 + i) as i64).collect();
            assert_eq!(incoming, expected);
        }
    }
}

#[test]
fn test_broadcast() {
    for size in GROUP_SIZES {
        for root in 0..size {
            let out = run_local(size, |group| {
                let mut data = if group.rank() == root {
                    vec![1.5f64, -2.0, 42.0]
                } else {
                    vec![0.0; 3]
                };
                group.broadcast(&mut data, root);
                data
            })
            .unwrap();
            assert!(out.iter().all(|d| d == &vec![1.5f64, -2.0, 42.0]));
        }
    }
}

#[test]
fn test_reduce_sum_all_f64() {
    const COUNT: usize = 128;
    for size in GROUP_SIZES {
        let out = run_local(size, |group| {
            let src = vec![group.rank() as f64; COUNT];
            let mut dst = vec![0.0f64; COUNT];
            group.reduce_sum_all(&src, &mut dst);
            dst
        })
        .unwrap();
        let expected = (size * (size - 1) / 2) as f64;
        for dst in out {
            assert!(dst.iter().all(|&v| v == expected));
        }
    }
}

#[test]
fn test_reduce_sum_all_i32() {
    for size in GROUP_SIZES {
        let out = run_local(size, |group| {
            let src: Vec<i32> = (0..10).map(|i| i * group.rank() as i32).collect();
            let mut dst = vec![0i32; 10];
            group.reduce_sum_all(&src, &mut dst);
            dst
        })
        .unwrap();
        let rank_sum = (size * (size - 1) / 2) as i32;
        let expected: Vec<i32> = (0..10).map(|i| i * rank_sum).collect();
        assert!(out.iter().all(|dst| dst == &expected));
    }
}

#[test]
fn test_barrier_and_clock() {
    run_local(4, |group| {
        let mut timer = Timer::with_clock(&group);
        timer.start();
        group.barrier();
        group.barrier();
        assert!(timer.stop() >= 0.0);
    })
    .unwrap();
}

#[test]
#[should_panic]
fn test_peer_panic_propagates() {
    run_local(2, |group| {
        if group.rank() == 1 {
            panic!("rank 1 gives up");
        }
        let mut buf = [0u8; 4];
        // rank 1 never sends; its channels close when it unwinds
        group.receive(&mut buf, 1);
    })
    .unwrap();
}

#[test]
#[should_panic(expected = "out of range")]
fn test_send_to_missing_rank() {
    let transport = LocalTransport::group(1).unwrap().pop().unwrap();
    let group = Group::new(transport);
    group.send(&[1u8], 3);
}

#[test]
#[should_panic(expected = "expected 8 bytes from rank 0, got 4")]
fn test_short_message_rejected() {
    run_local(2, |group| {
        if group.is_root() {
            group.send(&[7u32], 1);
        } else {
            let mut buf = [0u32; 2];
            group.receive(&mut buf, 0);
        }
    })
    .unwrap();
}
