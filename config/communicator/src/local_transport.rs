//! A process group simulated by threads of the current process.
//!
//! Every ordered pair of ranks is connected by an unbounded channel, so sends
//! never block. Point-to-point and collective traffic use separate channel sets
//! and cannot overtake one another. Collectives are built from point-to-point
//! messages; as long as every rank issues the same collectives in the same order,
//! per-pair FIFO delivery is all the matching that is needed.
//!
//! When a rank panics, its channels are dropped with it and any rank waiting on
//! it panics in turn instead of hanging.

use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex, PoisonError,
};

use itertools::izip;
use rayon::ThreadPoolBuilder;
use utils::{Clock, MonotonicClock};

use crate::{CommError, Group, NumericKind, Transport};

type Message = Vec<u8>;

#[derive(Debug)]
struct Mailbox {
    to: Vec<Sender<Message>>,
    from: Vec<Receiver<Message>>,
}

impl Mailbox {
    /// One mailbox per rank, fully connected.
    fn connect(size: usize) -> Vec<Mailbox> {
        let mut to: Vec<Vec<Sender<Message>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut from: Vec<Vec<Receiver<Message>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = mpsc::channel();
                to[src].push(tx);
                from[dst].push(rx);
            }
        }
        izip!(to, from)
            .map(|(to, from)| Mailbox { to, from })
            .collect()
    }

    #[inline]
    fn post(&self, dest: usize, msg: Message) {
        if self.to[dest].send(msg).is_err() {
            panic!("rank {dest} left the group");
        }
    }

    #[inline]
    fn fetch(&self, src: usize) -> Message {
        match self.from[src].recv() {
            Ok(msg) => msg,
            Err(_) => panic!("rank {src} left the group"),
        }
    }
}

/// One rank of an in-process group.
#[derive(Debug)]
pub struct LocalTransport {
    world_rank: usize,
    world_size: usize,
    p2p: Mailbox,
    collective: Mailbox,
    clock: MonotonicClock,
}

impl LocalTransport {
    /// The gathering rank of the composite collectives.
    const HUB_RANK: usize = 0;

    /// Create the endpoints of a group of `size` ranks, in rank order.
    pub fn group(size: usize) -> Result<Vec<LocalTransport>, CommError> {
        if size == 0 {
            return Err(CommError::InvalidGroupSize(size));
        }
        let clock = MonotonicClock::default();
        Ok(izip!(Mailbox::connect(size), Mailbox::connect(size))
            .enumerate()
            .map(|(world_rank, (p2p, collective))| LocalTransport {
                world_rank,
                world_size: size,
                p2p,
                collective,
                clock,
            })
            .collect())
    }

    fn check_len(&self, got: usize, expected: usize, src: usize) {
        assert_eq!(
            got, expected,
            "rank {} expected {} bytes from rank {}, got {}",
            self.world_rank, expected, src, got
        );
    }
}

impl Transport for LocalTransport {
    #[inline(always)]
    fn rank(&self) -> usize {
        self.world_rank
    }

    #[inline(always)]
    fn size(&self) -> usize {
        self.world_size
    }

    fn send_bytes(&self, buf: &[u8], dest: usize) {
        self.p2p.post(dest, buf.to_vec());
    }

    fn recv_bytes(&self, buf: &mut [u8], src: usize) {
        let msg = self.p2p.fetch(src);
        self.check_len(msg.len(), buf.len(), src);
        buf.copy_from_slice(&msg);
    }

    fn broadcast_bytes(&self, buf: &mut [u8], root: usize) {
        if self.world_rank == root {
            (0..self.world_size)
                .filter(|&r| r != root)
                .for_each(|r| self.collective.post(r, buf.to_vec()));
        } else {
            let msg = self.collective.fetch(root);
            self.check_len(msg.len(), buf.len(), root);
            buf.copy_from_slice(&msg);
        }
    }

    fn scatter_variable(
        &self,
        src: &[u8],
        counts: &[usize],
        offsets: &[usize],
        dst: &mut [u8],
        root: usize,
    ) {
        if self.world_rank == root {
            for (r, (&count, &offset)) in izip!(counts, offsets).enumerate() {
                let slice = &src[offset..offset + count];
                if r == root {
                    dst.copy_from_slice(slice);
                } else {
                    self.collective.post(r, slice.to_vec());
                }
            }
        } else {
            let msg = self.collective.fetch(root);
            self.check_len(msg.len(), dst.len(), root);
            dst.copy_from_slice(&msg);
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
        if self.world_rank == root {
            for (r, (&count, &offset)) in izip!(counts, offsets).enumerate() {
                let slot = &mut dst[offset..offset + count];
                if r == root {
                    slot.copy_from_slice(src);
                } else {
                    let msg = self.collective.fetch(r);
                    self.check_len(msg.len(), count, r);
                    slot.copy_from_slice(&msg);
                }
            }
        } else {
            self.collective.post(root, src.to_vec());
        }
    }

    fn all_gather_variable(&self, src: &[u8], dst: &mut [u8], counts: &[usize], offsets: &[usize]) {
        (0..self.world_size)
            .filter(|&r| r != self.world_rank)
            .for_each(|r| self.collective.post(r, src.to_vec()));
        for (r, (&count, &offset)) in izip!(counts, offsets).enumerate() {
            let slot = &mut dst[offset..offset + count];
            if r == self.world_rank {
                slot.copy_from_slice(src);
            } else {
                let msg = self.collective.fetch(r);
                self.check_len(msg.len(), count, r);
                slot.copy_from_slice(&msg);
            }
        }
    }

    fn reduce_sum_all(&self, src: &[u8], dst: &mut [u8], kind: NumericKind) {
        assert_eq!(src.len(), dst.len(), "reduction buffers differ in length");
        if self.world_rank == Self::HUB_RANK {
            dst.copy_from_slice(src);
            for r in (0..self.world_size).filter(|&r| r != Self::HUB_RANK) {
                let msg = self.collective.fetch(r);
                self.check_len(msg.len(), dst.len(), r);
                kind.accumulate(dst, &msg);
            }
        } else {
            self.collective.post(Self::HUB_RANK, src.to_vec());
        }
        self.broadcast_bytes(dst, Self::HUB_RANK);
    }

    fn barrier(&self) {
        let mut token: [u8; 0] = [];
        self.gather_variable(
            &[],
            &mut token,
            &vec![0; self.world_size],
            &vec![0; self.world_size],
            Self::HUB_RANK,
        );
        self.broadcast_bytes(&mut token, Self::HUB_RANK);
    }

    #[inline(always)]
    fn now(&self) -> f64 {
        self.clock.now()
    }
}

/// Run `f` once per rank of a fresh `size`-rank local group and collect the
/// per-rank results in rank order.
///
/// Every rank gets its own thread of a dedicated pool, so blocking collectives
/// cannot starve each other. A panic on any rank is re-raised here once all
/// ranks have returned.
pub fn run_local<F, R>(size: usize, f: F) -> Result<Vec<R>, CommError>
where
    F: Fn(Group<LocalTransport>) -> R + Sync,
    R: Send,
{
    let slots: Vec<Mutex<Option<LocalTransport>>> = LocalTransport::group(size)?
        .into_iter()
        .map(|t| Mutex::new(Some(t)))
        .collect();
    let pool = ThreadPoolBuilder::new()
        .num_threads(size)
        .thread_name(|i| format!("rank-{i}"))
        .build()?;

    Ok(pool.broadcast(|ctx| {
        let transport = slots[ctx.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match transport {
            Some(transport) => f(Group::new(transport)),
            None => unreachable!("rank {} joined twice", ctx.index()),
        }
    }))
}
