// Reduce an LTS from a CSV file modulo simulation or ready simulation equivalence.

use std::env;
use std::ffi::OsStr;
use std::io;
use std::time::Instant;

use simequiv::*;
use simequiv::equivalence::{reduce, Equivalence};

fn csv_lts(fname: &OsStr, equivalence: Equivalence) -> io::Result<()> {
    let mut lts = TransitionSystem::from_csv_file(fname)?;
    println!("Number of states: {}", lts.n_states());
    println!("Number of transitions: {}", lts.n_transitions());
    println!("Number of labels: {}", lts.n_labels());

    let now = Instant::now();
    let mut full = lts.clone();
    let mut partitioner = SimPartitioner::new(&mut full);
    partitioner.run();
    println!("Computed simulation preorder in {:.5}s", now.elapsed().as_secs_f64());
    println!("Simulation classes: {}", partitioner.num_classes());
    println!("Rounds: {}", partitioner.rounds().len());

    let now = Instant::now();
    reduce(&mut lts, equivalence)?;
    println!("Reduced modulo {equivalence} in {:.5}s", now.elapsed().as_secs_f64());
    println!("\nReduced system:");
    for t in lts.transitions() {
        println!("{},{},\"{}\"", t.from, t.to, lts.label_name(t.label));
    }
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();
    let mut args = env::args_os().skip(1);
    let (Some(fname), eq) = (args.next(), args.next()) else {
        eprintln!("Invalid arguments. Usage: {} CSV-FILE [sim|ready-sim]",
                  env::args().next().unwrap_or_default());
        std::process::exit(2);
    };
    let equivalence = match eq {
        Some(name) => name.to_string_lossy().parse()?,
        None => Equivalence::Simulation,
    };
    csv_lts(&fname, equivalence)
}
