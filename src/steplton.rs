/***
STEP'LTON: discrete-time simulation of polysome translation
    Copyright (C) 2026 Andrew T. Martens

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License, version 3,
    as published by the Free Software Foundation.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

e-mail: steplton@logical.bio
***/

/* steplton.rs: the core logic for stepping polysomes through fixed ticks. */

use anyhow::Result;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Bernoulli, Distribution};

use arrow2::array::*;
use arrow2::chunk::Chunk;

use std::sync::Arc;

use crate::config::SimulationConfig;
use crate::rates::gate_interval;

/// Lane position of a ribosome that is not bound to the transcript.
pub const UNBOUND: i64 = -1;

/// A ribosome on the polysome: where it sits (in codons, UNBOUND when off the
/// transcript) and for how many consecutive ticks it has sat there. Ribosomes
/// are never destroyed; termination recycles them back to UNBOUND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ribosome {
    pub position: i64,
    pub counter: u64,
}

impl Ribosome {
    fn unbound() -> Ribosome {
        Ribosome {
            position: UNBOUND,
            counter: 0,
        }
    }
}

/*
Collision check: any other bound ribosome strictly downstream within
`footprint_codons` blocks the move, and the scan stops at the first blocker.
Unbound ribosomes, upstream ribosomes and the ribosome itself never block.
An unbound ribosome passes through the same check, which is what blocks
initiation while a bound ribosome still sits within a footprint of the start
codon: from UNBOUND, a leader at position p blocks when p + 1 <= footprint.
*/
fn path_is_clear(ribosomes: &[Ribosome], index: usize, footprint_codons: i64) -> bool {
    let here = ribosomes[index].position;

    for (i, other) in ribosomes.iter().enumerate() {
        if (i == index) || (other.position == UNBOUND) {
            continue;
        }
        if (other.position > here) && (other.position - here <= footprint_codons) {
            return false;
        }
    }

    true
}

/// The one move rule behind initiation, elongation and termination. With the
/// path clear, a single Bernoulli trial decides the move: on success the
/// ribosome advances one codon and its counter resets to 1; a position past
/// `gene_length` recycles to UNBOUND within the same update. Every other
/// outcome leaves the ribosome in place with its counter incremented, and a
/// blocked ribosome consumes no trial at all.
fn attempt_move<R: Rng + ?Sized>(
    ribosomes: &mut [Ribosome],
    index: usize,
    gene_length: i64,
    move_trial: &Bernoulli,
    footprint_codons: i64,
    rng: &mut R,
) {
    if path_is_clear(ribosomes, index, footprint_codons) && move_trial.sample(rng) {
        let ribosome = &mut ribosomes[index];
        ribosome.position += 1;
        ribosome.counter = 1;

        // Termination: past the last codon the ribosome recycles immediately.
        if ribosome.position > gene_length {
            ribosome.position = UNBOUND;
        }
    } else {
        ribosomes[index].counter += 1;
    }
}

/// Resolve one tick for every ribosome, in list order. Updates within the
/// tick are visible to the eligibility checks of later ribosomes (sequential,
/// not a snapshot of the tick's start).
pub fn step_polysome<R: Rng + ?Sized>(
    ribosomes: &mut [Ribosome],
    t_step: u64,
    kI: f64,
    kE: f64,
    gene_length: i64,
    move_trial: &Bernoulli,
    footprint_codons: i64,
    resolution: u32,
    rng: &mut R,
) {
    let init_open = t_step % gate_interval(kI, resolution) == 0;
    let elongation_interval = gate_interval(kE, resolution);

    for index in 0..ribosomes.len() {
        let bound = ribosomes[index].position != UNBOUND;
        let elong_open = ribosomes[index].counter % elongation_interval == 0;

        /* Initiation & elongation are gated by independent rates, but both
           resolve through the same exclusion + Bernoulli rule once a gate is
           open. An initiation window is wasted on a bound ribosome, and an
           elongation window on an unbound one. */
        let may_attempt = match (init_open, elong_open) {
            (true, true) => true,
            (true, false) => !bound,
            (false, true) => bound,
            (false, false) => false,
        };

        if may_attempt {
            attempt_move(
                ribosomes,
                index,
                gene_length,
                move_trial,
                footprint_codons,
                rng,
            );
        } else {
            ribosomes[index].counter += 1;
        }
    }
}

/// Run one transcript for `time_seconds * resolution` ticks and return the
/// final ribosome states. The ribosome list is fixed for the whole run; its
/// order only sets the within-tick update order, never a spatial meaning.
pub fn simulate_transcript<R: Rng + ?Sized>(
    config: &SimulationConfig,
    gene_length: i64,
    rng: &mut R,
) -> Result<Vec<Ribosome>> {
    let move_trial = Bernoulli::new(config.move_probability)?;
    let floor = config.rate_floor();
    let footprint_codons = config.footprint_codons();

    let mut ribosomes = vec![Ribosome::unbound(); config.ribosome_count];

    for t_step in 0..config.total_steps() {
        // Both rates are recomputed every tick; they are cheap & stateless.
        let kI = config.kI.rate_at(t_step, floor);
        let kE = config.kE.rate_at(t_step, floor);

        step_polysome(
            &mut ribosomes,
            t_step,
            kI,
            kE,
            gene_length,
            &move_trial,
            footprint_codons,
            config.resolution,
            rng,
        );
    }

    Ok(ribosomes)
}

/// One complete transcript job: build the RNG, simulate, pack the final
/// snapshots into a chunk of (mRNA, ribosome, pos, counter) columns.
pub fn run_steplton(
    mRNA_number: u16,
    config: &SimulationConfig,
    gene_length: i64,
) -> Result<Chunk<Arc<dyn Array>>> {
    /* A seeded run must not depend on which pool thread picks up the job, so
       each mRNA derives its own StdRng stream from the user seed. */
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(mRNA_number as u64)),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let ribosomes = simulate_transcript(config, gene_length, &mut rng)?;

    // Return a "chunk" of arrays
    let num_columns = 4;
    let mut arrays: Vec<Arc<dyn Array>> = Vec::with_capacity(num_columns);

    let num_ribosomes = ribosomes.len();

    // Give every snapshot a copy of its mRNA simulation number, too.
    let mRNA_number_list: Vec<u16> = vec![mRNA_number; num_ribosomes];
    arrays.push(PrimitiveArray::from_vec(mRNA_number_list).arced());

    let ribosome_numbers: Vec<u16> = (0..num_ribosomes as u16).collect();
    arrays.push(PrimitiveArray::from_vec(ribosome_numbers).arced());

    let positions: Vec<i64> = ribosomes.iter().map(|r| r.position).collect();
    arrays.push(PrimitiveArray::from_vec(positions).arced());

    let counters: Vec<u64> = ribosomes.iter().map(|r| r.counter).collect();
    arrays.push(PrimitiveArray::from_vec(counters).arced());

    let snapshots = Chunk::try_new(arrays)?;

    Ok(snapshots)
}
