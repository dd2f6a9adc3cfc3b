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

/* main.rs: command-line interface */

#![allow(non_snake_case)] // allow variables with "mRNA" in them

use polars::prelude::{ParquetReader, ParquetWriter, SerReader};

use threadpool::ThreadPool;

use std::fs::{create_dir_all, File, write, remove_file};
use std::io::{self, BufWriter, Write};
use std::path::{PathBuf, Path};

use clap::{Parser, Subcommand, ArgAction};

use arrow2::datatypes::{Schema, Field, DataType};
use arrow2::array::*;
use arrow2::chunk::Chunk;
use arrow2::io::parquet::write::{
    CompressionOptions, WriteOptions, FileWriter, Version, Encoding,
    RowGroupIterator
};

use anyhow::{Context, Result};

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::env;

mod config;
mod dataframe_operations;
mod rates;
mod steplton;
mod util;

use config::SimulationConfig;
use rates::{RateRamp, Window};

/* Simple struct for receiving results from a thread */
pub struct SimulationMessage {
    mRNA_number: u16,
    snapshots: Result<Chunk<Arc<dyn Array>>>,
}

#[derive(Parser)]
#[command(
    name = "steplton",
    version = "1.0.0",
    author = "Andrew T. Martens <andrew_martens@hms.harvard.edu>",
    about = "STEP'LTON -- STEpping Polysome TranslatiON",
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
	about = "Simulate ribosome traffic in fixed ticks, with the initiation \
		 & elongation rates following piecewise-linear ramps"
    )]
    Simulate {
        #[arg(
	    short = 'f',
	    long = "gene",
	    help = "Gene file: FASTA or a bare nucleotide listing",
	    required = true
	)]
        gene_path: String,

        #[arg(
	    short = 't',
	    long = "simulation-time",
	    help = "Time in seconds to run each transcript",
	    required = true
	)]
        simulation_time: u32,

        #[arg(
	    short = 'n',
	    long = "num-mRNA",
	    help = "How many transcripts to simulate",
	    required = true
	)]
        num_mRNA: u16,

        #[arg(
	    short = 'R',
	    long = "ribosomes",
	    default_value_t = 10,
	    help = "Ribosomes per transcript"
	)]
        ribosome_count: usize,

        #[arg(
	    short = 'p',
	    long = "move-prob",
	    default_value_t = 0.5,
	    help = "Per-attempt probability that an offered move succeeds"
	)]
        move_probability: f64,

        #[arg(
	    short = 'I',
	    long = "ki",
	    help = "Target initiation rate, in attempts per second",
	    required = true
	)]
        kI_target: f64,

        #[arg(
	    short = 'E',
	    long = "ke",
	    help = "Target elongation rate, in attempts per second",
	    required = true
	)]
        kE_target: f64,

	// Ramp windows, all optional. A missing rise snaps the rate to its
	// target at tick 0; a missing fall holds it there for the whole run.
        #[arg(
	    long = "ki-rise",
	    help = "Initiation ramp-up window, start:critical (in timesteps)"
	)]
        kI_rise: Option<String>,

        #[arg(
	    long = "ki-fall",
	    help = "Initiation ramp-down window, start:critical (in timesteps)"
	)]
        kI_fall: Option<String>,

        #[arg(
	    long = "ke-rise",
	    help = "Elongation ramp-up window, start:critical (in timesteps)"
	)]
        kE_rise: Option<String>,

        #[arg(
	    long = "ke-fall",
	    help = "Elongation ramp-down window, start:critical (in timesteps)"
	)]
        kE_fall: Option<String>,

	#[arg(
	    short = 'L',
	    long = "footprint-nt",
	    default_value_t = 30,
	    help = "Size of a ribosome footprint, in nucleotides"
	)]
        ribo_size_nt: usize,

	#[arg(
	    long = "resolution",
	    default_value_t = 100,
	    help = "Timesteps per simulated second"
	)]
        resolution: u32,

	#[arg(
	    long = "codon-size",
	    default_value_t = 3,
	    help = "Nucleotides per codon"
	)]
        codon_size: usize,

        #[arg(
	    short = 's',
	    long = "seed",
	    help = "RNG seed; a seeded run reproduces its occupancy dataset exactly"
	)]
        seed: Option<u64>,

        #[arg(
	    short = 'T',
	    long = "num-threads",
	    default_value_t = 1,
	    help = "Maximum number of threads"
	)]
        num_threads: usize,

        #[arg(
	    short = 'o',
	    long = "out-dir",
	    help = "Directory to write to",
	    required = false
	)]
        out_dir: Option<String>,

	#[arg(short, long, action = ArgAction::Count)]
	verbosity: u8,
    },

    #[command(
	about = "Aggregate an occupancy dataset: per-codon histogram counts, \
		 bound fractions by mRNA, and mean dwell counters"
    )]
    Occupancy {
        #[arg(
	    short = 't',
	    long = "occupancy_path",
	    default_value = "occupancy.pq",
	    help = "Occupancy snapshot file (parquet)",
	)]
        occupancy_path: String,

        #[arg(
	    short = 'n',
	    long = "num_mRNA",
	    help = "Number of transcripts in the dataset (must match value \
		    defined in simulation!)",
	    required = true
	)]
        num_mRNA: u16,

        #[arg(
	    short = 'o',
	    long = "out_dir",
	    default_value = "./",
	    help = "Output directory",
	    required = false
	)]
        out_dir: Option<String>,

	#[arg(short, long, action = ArgAction::Count)]
	verbosity: u8,
    },
}

/*
   Boilerplate function that starts the program and immediately calls run(),
   and takes care of error handling.
*/
fn main() -> Result<()> {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
    Ok(())
}

/*
   Process command-line arguments & invoke the corresponding subroutine.
*/
fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
	    gene_path, simulation_time, num_mRNA, ribosome_count,
	    move_probability, kI_target, kE_target, kI_rise, kI_fall, kE_rise,
	    kE_fall, ribo_size_nt, resolution, codon_size, seed, num_threads,
	    out_dir, verbosity
	} => {
	    let config = SimulationConfig {
		ribosome_count,
		time_seconds: simulation_time,
		ribo_size_nt,
		transcript_count: num_mRNA,
		move_probability,
		kI: build_ramp(kI_target, kI_rise, kI_fall)?,
		kE: build_ramp(kE_target, kE_rise, kE_fall)?,
		resolution,
		codon_size,
		seed,
	    };

	    run_simulation(config, gene_path, num_threads, out_dir, verbosity)
	}

        Commands::Occupancy {
	    occupancy_path, num_mRNA, out_dir, verbosity
	} => {
	    run_occupancy(occupancy_path, num_mRNA, out_dir, verbosity)
	}
    }
}

/* Assemble one rate schedule from the target & the optional window strings. */
fn build_ramp(
    target: f64,
    rise: Option<String>,
    fall: Option<String>
) -> Result<RateRamp> {
    let rise = match rise {
	Some(window) => util::parse_window(&window)?,
	None => Window { start: 0, critical: 0 },
    };
    let fall = match fall {
	Some(window) => util::parse_window(&window)?,
	None => Window::NEVER,
    };

    Ok(RateRamp { target, rise, fall })
}

// Does a directory exist? Is it writeable?
fn ensure_writable_dir<P: AsRef<Path>>(path: P, temp_filename : String) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", path.display());
        }

        // Check writability by trying to create a temp file
        let test_path = path.join(temp_filename);
        write(&test_path, b"test").context("Directory exists but is not writable")?;
        remove_file(&test_path).ok(); // Cleanup, ignore error
    } else {
        create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    Ok(())
}

fn run_simulation(
    config: SimulationConfig,
    gene_path: String,
    num_threads: usize,
    out_dir: Option<String>,
    verbosity: u8,
) -> Result<()> {
    // Reject bad parameters before touching any file
    config.validate()?;

    // The simulation is meaningless without a gene length, so a missing or
    // malformed gene file aborts the whole request.
    let gene = util::read_gene(&gene_path, config.codon_size)?;
    let gene_length = gene.num_codons as i64;

    if verbosity >= 1 {
	println!(
	    "Simulating {} mRNAs of '{}' ({} codons, {} ticks each)",
	    config.transcript_count, gene.label, gene.num_codons,
	    config.total_steps()
	);
    }

    // Did the user specify out_dir? If not, then default to current working
    // directory:
    let out_path : PathBuf;
    if let Some(out_dir) = out_dir {
	out_path = PathBuf::from(&out_dir);
    } else {
	out_path = env::current_dir()
	    .context("Failed to get current directory")?;
    }

    // Make sure that output directory exists and can be written to
    ensure_writable_dir(&out_path, "occupancy.pq".to_string())?;

    /* This channel is used to transfer information in & out of the
       threadpool. */
    let (tx_mRNA, rx_mRNA) = channel();

    let pool = ThreadPool::new(num_threads);

    let num_mRNA = config.transcript_count;
    let config = Arc::new(config);

    for current_mRNA in 0..num_mRNA {
	let tx_mRNA = tx_mRNA.clone();
	let config = Arc::clone(&config);

	/* call run steplton here */
	pool.execute(move || {
	    let snapshots = steplton::run_steplton(
		current_mRNA,
		&config,
		gene_length
	    );

	    let return_message = SimulationMessage {
		mRNA_number: current_mRNA,
		snapshots: snapshots,
	    };

	    tx_mRNA
		.send(return_message)
		.expect("Message channel should be open");
	});
    }

    drop(tx_mRNA);

    /* Parquet file creation for final ribosome snapshots */
    let num_columns = 4;
    let mut schema_vec: Vec<Field> = Vec::with_capacity(num_columns);
    schema_vec.push(Field::new("mRNA", DataType::UInt16, false));
    schema_vec.push(Field::new("ribosome", DataType::UInt16, false));
    schema_vec.push(Field::new("pos", DataType::Int64, false));
    schema_vec.push(Field::new("counter", DataType::UInt64, false));

    // Create the parquet file
    let schema = Schema::from(schema_vec);

    let options = WriteOptions {
	write_statistics: true,
	compression: CompressionOptions::Snappy,
	version: Version::V2,
	data_pagesize_limit: None,
    };

    let out_file = BufWriter::new(File::create(
	PathBuf::from(&out_path).join("occupancy.pq"),
    )?);

    let mut writer = FileWriter::try_new(out_file, schema.clone(), options)?;

    /* Done with occupancy parquet file creation */

    /* The encodings */
    /* NOTE: Since order of results isn't guaranteed, mRNA # & ribosome #
       mightn't be in sorted order. --> Use Plain for all columns. */
    let encodings_vec = vec![
	vec![Encoding::Plain], // mRNA #
	vec![Encoding::Plain], // ribosome #
	vec![Encoding::Plain], // pos
	vec![Encoding::Plain], // counter
    ];

    /* Process each message: a completed transcript simulation */
    let mut terminal = term::stdout().context("Failed to create stdout terminal")?;
    for message in rx_mRNA.iter() {
	terminal.carriage_return().context("Failed carriage return")?;
	terminal.delete_line().context("Failed delete line")?;

	// Handle errors on snapshots here, in the main thread
	let snapshots = message.snapshots?;
	if verbosity >= 1 {
	    write!(terminal, "mRNA # {}", message.mRNA_number)?;
	}

	// Write the incoming snapshots to the parquet file
	let row_groups = RowGroupIterator::try_new(
	    vec![Ok(snapshots)].into_iter(),
	    &schema,
	    options,
	    encodings_vec.clone(),
	)?;

	for group in row_groups {
	    writer.write(group?)?;
	}

	io::stdout().flush().context("Failed to flush stdout")?;
    }

    // Close the occupancy parquet file
    let _ = writer.end(None)?;

    // Write the run metadata beside the dataset
    util::write_gene_info(
	PathBuf::from(&out_path).join("gene_info.tsv"),
	&gene,
	num_mRNA
    )?;

    /* Simulations complete */
    if verbosity >= 1 {
	writeln!(terminal, "")?;
    }

    Ok(())
}

fn run_occupancy(
    occupancy_path : String,
    num_mRNA : u16,
    out_dir : Option<String>,
    verbosity : u8,
) -> Result<()> {
    // Did the user specify out_dir? If not, then default to current working directory:
    let out_dir = match out_dir {
	Some(out_dir) => out_dir,
	None => env::current_dir()
	    .context("Failed to get current directory")?
	    .to_string_lossy()
	    .into()
    };

    // Make sure that output directory exists and can be written to
    ensure_writable_dir(PathBuf::from(&out_dir), "occupancy_histogram.pq".to_string())?;

    // Read in the snapshots
    let r = File::open(&occupancy_path)
	.with_context(|| format!("Failed to open '{}'", occupancy_path))?;
    let df_snapshots = ParquetReader::new(r).finish()?;

    // Histogram counts
    if verbosity >= 1 {
	println!("Occupancy histogram");
    }
    let mut histogram = dataframe_operations::calculate_occupancy_histogram(
	&df_snapshots, num_mRNA
    )?;

    let mut out_path = PathBuf::from(&out_dir);
    out_path.push("occupancy_histogram.pq");
    let of = File::create(out_path)?;

    let writer = ParquetWriter::new(of);
    writer.finish(&mut histogram)?;

    // Bound fraction by mRNA
    if verbosity >= 1 {
	println!("Bound fractions");
    }
    let mut bound = dataframe_operations::calculate_bound_fraction(
	&df_snapshots
    )?;

    let mut out_path = PathBuf::from(&out_dir);
    out_path.push("bound_fraction.pq");
    let of = File::create(out_path)?;

    let writer = ParquetWriter::new(of);
    writer.finish(&mut bound)?;

    // Dwell counters
    if verbosity >= 1 {
	println!("Mean dwell counters");
    }
    let mut dwell = dataframe_operations::calculate_mean_dwell_counter(
	&df_snapshots
    )?;

    let mut out_path = PathBuf::from(&out_dir);
    out_path.push("dwell_counters.pq");
    let of = File::create(out_path)?;

    let writer = ParquetWriter::new(of);
    writer.finish(&mut dwell)?;

    Ok(())
}
