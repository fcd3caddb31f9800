//! Onboarding Sequence
//!
//! This example steps an onboarding flow through its screens.
//!
//! Key concepts:
//! - Declaring phases with the phase_enum macro
//! - Auto-start and a single completion callback
//! - Rearming a finished run
//!
//! Run with: cargo run --example onboarding

use phaseline::phase_enum;
use phaseline::{RunOptions, Sequencer};
use std::cell::Cell;
use std::rc::Rc;

phase_enum! {
    enum Onboarding {
        Welcome,
        Permissions,
        Profile,
        Done,
    }
}

fn main() {
    println!("=== Onboarding Sequence Example ===\n");

    let finished = Rc::new(Cell::new(0));
    let counter = Rc::clone(&finished);
    let sequencer = Sequencer::new(
        Onboarding::sequence(),
        RunOptions::new().on_end(move || {
            counter.set(counter.get() + 1);
            println!("  -> onboarding finished");
        }),
    );
    let next = sequencer.advance_handle();

    println!("Walking through the screens:");
    while let Some(screen) = sequencer.phase() {
        println!("  showing {}", screen.name());
        next.call();
    }

    println!("\nState after the last screen: {}", sequencer.state());

    // Further advances are ignored until the machine is rearmed
    next.call();
    println!("Completion callbacks so far: {}", finished.get());

    sequencer.rearm().unwrap();
    println!(
        "\nRearmed, showing {:?} again",
        sequencer.phase().map(|screen| screen.name())
    );

    println!("\n=== Example Complete ===");
}
