// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Sweep diagnostics over a synthetic corpus: conservation, displacement,
//! and window-occupancy statistics for the sequence randomizer.

use std::{collections::HashSet, env, process, sync::Arc};

use corpus_types::ChunkOrder;
use mem_source::{FixedChunkOrder, MemSource};
use sequence_randomizer::{RandomizerError, SequenceRandomizer};

fn main() {
    if let Err(err) = run() {
        eprintln!("sweep_diag failed: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), DiagError> {
    let args = CliArgs::parse()?;
    let source = Arc::new(MemSource::synthetic(
        args.corpus_seed,
        args.chunks,
        args.sequences,
        args.max_samples,
    ));
    let order = FixedChunkOrder::shuffled(&source, args.corpus_seed ^ 0x9e37, args.radius);
    let chunks = order.randomized_chunks();
    let mut randomizer = SequenceRandomizer::new(Arc::new(order), source.clone());

    println!(
        "corpus: {} chunks, {} sequences, {} samples (radius={}, batch={})",
        source.num_chunks(),
        source.total_sequences(),
        source.total_samples(),
        args.radius,
        args.batch
    );

    for sweep in 0..args.sweeps {
        randomizer.seek(0, sweep)?;

        let mut seen = HashSet::new();
        let mut delivered_samples = 0usize;
        let mut delivery_index = 0usize;
        let mut displacement = [0usize; 5];
        let mut high_water = 0usize;

        loop {
            let batch = randomizer.next_sequences(args.batch);
            high_water = high_water.max(randomizer.loaded_range().len());
            randomizer.release_chunks();
            if batch.is_empty() {
                break;
            }
            for sequence in &batch {
                let slot = chunks
                    .partition_point(|chunk| chunk.sequence_end() <= delivery_index);
                let moved = slot.abs_diff(sequence.origin_position);
                displacement[moved.min(displacement.len() - 1)] += 1;
                seen.insert(sequence.id);
                delivered_samples += sequence.num_samples as usize;
                delivery_index += 1;
            }
        }

        let conserved = seen.len() == source.total_sequences()
            && delivered_samples == source.total_samples();
        println!(
            "sweep {sweep}: sequences={:<6} samples={:<8} window_high_water={:<4} conserved={}",
            seen.len(),
            delivered_samples,
            high_water,
            conserved
        );
        print!("  displacement:");
        for (distance, count) in displacement.iter().enumerate() {
            if distance + 1 == displacement.len() {
                print!(" {distance}+ slots={count}");
            } else {
                print!(" {distance} slots={count}");
            }
        }
        println!();

        // Spot-check resume: seek to mid-sweep and make sure reading resumes
        // on a sequence boundary.
        let midpoint = source.total_samples() / 2;
        let adjusted = randomizer.seek(midpoint, sweep)?;
        let tail = randomizer.next_sequences(args.batch);
        println!(
            "  seek {midpoint} -> {adjusted} (+{} rounding), next batch {} sequences",
            adjusted - midpoint,
            tail.len()
        );
    }

    Ok(())
}

struct CliArgs {
    chunks: usize,
    sequences: u32,
    max_samples: u32,
    radius: usize,
    corpus_seed: u64,
    sweeps: u64,
    batch: usize,
}

impl CliArgs {
    fn parse() -> Result<Self, DiagError> {
        let mut parsed = Self {
            chunks: 64,
            sequences: 16,
            max_samples: 24,
            radius: 3,
            corpus_seed: 1,
            sweeps: 2,
            batch: 256,
        };
        for arg in env::args().skip(1) {
            if let Some(value) = arg.strip_prefix("--chunks=") {
                parsed.chunks = parse_number(&arg, value)?;
            } else if let Some(value) = arg.strip_prefix("--sequences=") {
                parsed.sequences = parse_number(&arg, value)?;
            } else if let Some(value) = arg.strip_prefix("--max-samples=") {
                parsed.max_samples = parse_number(&arg, value)?;
            } else if let Some(value) = arg.strip_prefix("--radius=") {
                parsed.radius = parse_number(&arg, value)?;
            } else if let Some(value) = arg.strip_prefix("--seed=") {
                parsed.corpus_seed = parse_number(&arg, value)?;
            } else if let Some(value) = arg.strip_prefix("--sweeps=") {
                parsed.sweeps = parse_number(&arg, value)?;
            } else if let Some(value) = arg.strip_prefix("--batch=") {
                parsed.batch = parse_number(&arg, value)?;
            } else {
                return Err(DiagError::UnknownArg(arg));
            }
        }
        if parsed.batch < parsed.max_samples as usize {
            return Err(DiagError::UnknownArg(format!(
                "--batch must be at least --max-samples ({})",
                parsed.max_samples
            )));
        }
        Ok(parsed)
    }
}

fn parse_number<T: std::str::FromStr>(arg: &str, value: &str) -> Result<T, DiagError> {
    value
        .parse()
        .map_err(|_| DiagError::UnknownArg(arg.to_string()))
}

#[derive(thiserror::Error, Debug)]
enum DiagError {
    #[error(transparent)]
    Randomizer(#[from] RandomizerError),
    #[error("unknown or invalid argument: {0}")]
    UnknownArg(String),
}
