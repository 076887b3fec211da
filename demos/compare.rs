// Compare two processes with simulation and ready simulation.

use simequiv::{Result, TransitionSystem};
use simequiv::equivalence::{compare, compare_preorder, Equivalence, Preorder};

fn main() -> Result<()> {
    env_logger::init();

    // Milner's vending machines.
    // The first one chooses between b and c after a, the second one decides with a.
    let (a, b, c) = (0, 1, 2);
    let lts1 = TransitionSystem::from(vec![
     // (Start, End, Action)
        (0, 1, a),
        (1, 2, b),
        (1, 3, c),
    ]);
    let lts2 = TransitionSystem::from(vec![
        (0, 1, a),
        (1, 3, b),
        (0, 2, a),
        (2, 4, c),
    ]);

    for eq in [Equivalence::Simulation, Equivalence::ReadySimulation] {
        println!("{eq} equivalent: {}", compare(&lts1, &lts2, eq)?);
    }
    for pre in [Preorder::Simulation, Preorder::ReadySimulation] {
        println!("First {pre}-below second: {}", compare_preorder(&lts1, &lts2, pre)?);
        println!("Second {pre}-below first: {}", compare_preorder(&lts2, &lts1, pre)?);
    }

    // Selectors can also be given by name
    match compare(&lts1, &lts2, "bisim".parse()?) {
        Ok(equivalent) => println!("Bisimilar: {equivalent}"),
        Err(e) => println!("{e}"),
    }
    Ok(())
}
