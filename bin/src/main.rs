//! Walk a process group through the block distribution collectives.
//!
//! With `--transport local` (the default) the ranks are threads of this
//! process. With `--transport mpi` the binary must be built with the `mpi`
//! feature and started under `mpiexec`; `--ranks` is then ignored.

use block_distribution::BlockDistribution;
use clap::Parser;
use communicator::{root_println, run_local, CommError, Group, Transport, TransportKind};
use log::{debug, info};
use utils::Timer;

/// Block distribution walkthrough over a local or MPI process group
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transport backing the group: local, mpi
    #[arg(short, long, default_value_t = TransportKind::Local)]
    transport: TransportKind,

    /// Number of ranks of a local group
    #[arg(short, long, default_value_t = 4)]
    ranks: usize,

    /// Number of elements to distribute
    #[arg(short = 'n', long, default_value_t = 100)]
    total: usize,
}

const HELLO: &[u8] = b"hello!";
const HELLO_LEN: usize = 10;

fn hello<C: Transport>(group: &Group<C>) {
    let mut msg = [0u8; HELLO_LEN];
    if group.is_root() {
        msg[..HELLO.len()].copy_from_slice(HELLO);
        for to in 1..group.size() {
            group.send(&msg, to);
        }
    } else {
        group.receive(&mut msg, Group::<C>::ROOT_RANK);
        assert_eq!(&msg[..HELLO.len()], HELLO);
        debug!("rank {} received {:?}", group.rank(), &msg[..HELLO.len()]);
    }
    root_println!(group, "hello sent to {} ranks", group.size() - 1);
}

fn reduce<C: Transport>(group: &Group<C>) {
    let src = vec![group.rank() as i32; 8];
    let mut dst = vec![0i32; 8];
    group.reduce_sum_all(&src, &mut dst);

    let size = group.size() as i32;
    let expected = size * (size - 1) / 2;
    assert!(dst.iter().all(|&v| v == expected));
    root_println!(group, "sum of ranks over {} ranks: {}", size, dst[0]);
}

fn distribute<C: Transport>(group: &Group<C>, total: usize) {
    let root = Group::<C>::ROOT_RANK;
    let d = BlockDistribution::<i64, _>::new(group, total);
    root_println!(group, "{}", d);

    let mut global: Vec<i64> = if group.is_root() {
        (0..total as i64).collect()
    } else {
        vec![]
    };
    let mut local = vec![0i64; d.count()];

    d.scatter(root, &global, &mut local);
    d.gather(root, &local, &mut global);
    if group.is_root() {
        assert!(global.iter().copied().eq(0..total as i64));
        root_println!(group, "scatter then gather returned the array unchanged");
        global.iter_mut().for_each(|v| *v += 1);
    }

    d.scatter(root, &global, &mut local);
    local.iter_mut().for_each(|v| *v += 1);
    let mut all = vec![0i64; d.total()];
    d.gather_all(&local, &mut all);
    assert!(all.iter().copied().eq(2..total as i64 + 2));
    info!("rank {} holds the updated array", group.rank());

    // the same partition, moved as raw bytes
    let mut bytes = BlockDistribution::<u8, _>::new(group, total);
    bytes.scale(std::mem::size_of::<i64>() as isize);
    assert_eq!(bytes.total(), d.byte_total());
    root_println!(group, "as bytes, {}", bytes);
}

fn run<C: Transport>(group: Group<C>, args: &Args) {
    let mut timer = Timer::with_clock(&group);
    timer.start();
    hello(&group);
    reduce(&group);
    distribute(&group, args.total);
    group.barrier();
    timer.stop();
    root_println!(group, "done in {}", timer);
}

fn main() -> Result<(), CommError> {
    env_logger::init();
    let args = Args::parse();
    args.transport.ensure_available()?;
    info!("transport {}, {} elements", args.transport, args.total);

    match args.transport {
        TransportKind::Local => {
            run_local(args.ranks, |group| run(group, &args))?;
        }
        #[cfg(feature = "mpi")]
        TransportKind::Mpi => run(Group::<communicator::MpiTransport>::init()?, &args),
        #[cfg(not(feature = "mpi"))]
        TransportKind::Mpi => unreachable!("checked by ensure_available"),
    }
    Ok(())
}
