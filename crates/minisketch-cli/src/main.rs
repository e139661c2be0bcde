use std::path::{Path, PathBuf};
use std::process::Command;

use clap::{Parser, Subcommand};
use minisketch_lib::constants::{DEFAULT_SEED, DEFAULT_W};
use minisketch_lib::isolation::{run_in_child, run_isolated_or_exit, IsolatedJobs};
use minisketch_lib::{MinimizerIndex, MinimizerIndexBuilder, SketchConfiguration};
use tracing::{debug, info};

/// Job name under which `sketch --isolated` re-executes the binary
const SKETCH_JOB: &str = "sketch";

/// Extension of index files written by `sketch` when no output is given
const INDEX_EXTENSION: &str = "msk";

#[derive(Parser)]
#[command(name = "minisketch")]
#[command(version = "0.1.0")]
#[command(about = "Parallel minimizer sketching of sequencing reads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a minimizer index from a read file
    Sketch {
        /// Input FASTA/FASTQ file (may be gzipped)
        #[arg(short, long)]
        input: String,

        /// K-mer length
        #[arg(short, long)]
        k: usize,

        /// Window size in k-mers
        #[arg(short, long, default_value_t = DEFAULT_W)]
        w: usize,

        /// Output file
        #[arg(short, long)]
        output: Option<String>,

        /// Seed for the k-mer hash function
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Hash k-mers and their reverse complements to the same value
        #[arg(long, default_value = "false")]
        canonical: bool,

        /// Number of threads (0 = all available cores)
        #[arg(short = 't', long, default_value = "0")]
        threads: usize,

        /// Maximum number of reads per batch
        #[arg(long)]
        batch_items: Option<usize>,

        /// Maximum cumulative read length per batch
        #[arg(long)]
        batch_bytes: Option<usize>,

        /// Run the build in a child process
        #[arg(long, default_value = "false")]
        isolated: bool,
    },

    /// Print the header of a minimizer index
    Inspect {
        /// Index file
        #[arg(short, long)]
        input: String,

        /// Number of leading hashes to print
        #[arg(long, default_value = "0")]
        hashes: usize,
    },

    /// Run a command in a child process, failing if it crashes
    Isolate {
        /// Program and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Isolated children run their job and exit here
    IsolatedJobs::new()
        .register(SKETCH_JOB, sketch_job)
        .dispatch();

    run(Cli::parse())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Sketch {
            input,
            k,
            w,
            output,
            seed,
            canonical,
            threads,
            batch_items,
            batch_bytes,
            isolated,
        } => {
            if isolated {
                let args: Vec<String> = std::env::args()
                    .skip(1)
                    .filter(|arg| arg != "--isolated")
                    .collect();
                info!("Running sketch in an isolated child process");
                run_in_child(SKETCH_JOB, &args);
                return Ok(());
            }
            let mut config = SketchConfiguration::new(k, w)?;
            config.seed = seed;
            config.canonical = canonical;
            config.num_threads = threads;
            if let Some(items) = batch_items {
                config.max_batch_items = items;
            }
            if let Some(bytes) = batch_bytes {
                config.max_batch_bytes = bytes;
            }
            config.validate()?;
            sketch_command(&input, output, config)
        }
        Commands::Inspect { input, hashes } => inspect_command(&input, hashes),
        Commands::Isolate { command } => {
            isolate_command(&command);
            Ok(())
        }
    }
}

/// Entry point of the isolated child started by `sketch --isolated`
fn sketch_job(args: &[String]) -> anyhow::Result<()> {
    let cli = Cli::try_parse_from(std::iter::once("minisketch").chain(args.iter().map(String::as_str)))?;
    run(cli)
}

/// Build a minimizer index from FASTA/FASTQ input
fn sketch_command(input: &str, output: Option<String>, config: SketchConfiguration) -> anyhow::Result<()> {
    info!("Building minimizer index...");
    info!("  Input: {}", input);
    config.print();

    let builder = MinimizerIndexBuilder::new(config)?;
    let index = builder.build_from_file(input)?;
    index.statistics().print_summary();

    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(Path::new(input)));
    info!("Saving index to {}...", output_path.display());
    index.save(&output_path)?;

    info!("Index built successfully!");
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let mut path = input.to_path_buf();
    // reads.fq.gz -> reads.fq -> reads.msk
    if path.extension().is_some_and(|ext| ext == "gz") {
        path.set_extension("");
    }
    path.set_extension(INDEX_EXTENSION);
    path
}

/// Print the parameters and size of an index
fn inspect_command(input: &str, hashes: usize) -> anyhow::Result<()> {
    debug!("Loading index from {}...", input);
    let index = MinimizerIndex::load(input)?;

    println!("k = {}", index.k());
    println!("w = {}", index.w());
    println!("seed = {}", index.seed());
    println!("canonical = {}", index.canonical());
    println!("minimizers = {}", index.len());
    for hash in index.hashes().iter().take(hashes) {
        println!("{:016x}", hash);
    }
    Ok(())
}

/// Run an external command through the isolation helper
fn isolate_command(command: &[String]) {
    let Some((program, args)) = command.split_first() else {
        return;
    };
    let mut child = Command::new(program);
    child.args(args);
    run_isolated_or_exit(&mut child);
    info!("Child process finished successfully");
}
