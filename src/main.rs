use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tailmap::index::fm::{DEFAULT_OCC_STRIDE, DEFAULT_SA_STRIDE};
use tailmap::index::{store, Index, IndexMeta, Reference};
use tailmap::io::fasta::FastaReader;
use tailmap::io::fastq::FastqReader;
use tailmap::map::MapOpt;
use tailmap::TailmapError;

#[derive(Parser, Debug)]
#[command(
    name = "tailmap",
    author,
    version,
    about = "BWT-based genomic mapping with detection of non-templated 3' tails.\n\
             Reads are aligned by their longest exact prefix; any unmapped 3' suffix\n\
             is reported as a soft-clipped tail (TL:Z:). Mismatches, if allowed,\n\
             are reported in the MD tag.",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the dual-strand BWT index of a reference genome
    Build {
        /// Reference FASTA file
        #[arg(short = 'i', long)]
        input: String,
        /// Prefix for the index files (a trailing '.' is appended if absent)
        #[arg(short = 'p', long)]
        prefix: String,
    },
    /// Map FASTQ reads against an index, reporting 3' tails
    Map {
        /// Input FASTQ file
        #[arg(short = 'i', long)]
        input: String,
        /// Prefix of the index
        #[arg(short = 'p', long)]
        index: String,
        /// Output SAM file, stdout by default
        #[arg(short = 'o', long)]
        output: Option<String>,
        /// Number of threads; values above the core count are clamped
        #[arg(short = 'n', long, default_value_t = 1)]
        thread: usize,
        /// Minimal length of the matched prefix
        #[arg(short = 'l', long = "minLen", default_value_t = 18)]
        min_len: usize,
        /// Allow one mismatch in the middle of the query
        #[arg(short = 'v', long, default_value_t = false)]
        mismatch: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    // usage errors must exit 1 (2 is reserved for a damaged index)
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    std::process::exit(0)
                }
                _ => std::process::exit(1),
            }
        }
    };
    let result = match cli.command {
        Commands::Build { input, prefix } => run_build(&input, &prefix),
        Commands::Map { input, index, output, thread, min_len, mismatch } => {
            run_map(&input, &index, output.as_deref(), thread, min_len, mismatch)
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<TailmapError>()
            .map(|e| e.exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run_build(input: &str, prefix: &str) -> anyhow::Result<()> {
    let fh = File::open(input)
        .with_context(|| format!("cannot open reference FASTA '{}'", input))?;
    let reference = Reference::from_fasta(FastaReader::new(BufReader::new(fh)))?;

    log::info!(
        "reference: {} ({} sequences, {} bases after stripping ambiguous runs)",
        input,
        reference.chroms.len(),
        reference.forward_len
    );

    let meta = IndexMeta {
        reference_file: Some(input.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    };
    let index = Index::build(reference, DEFAULT_OCC_STRIDE, DEFAULT_SA_STRIDE, meta)?;
    store::save(&index, prefix)
        .with_context(|| format!("cannot write index under prefix '{}'", prefix))?;
    log::info!("index saved under prefix {}", store::normalize_prefix(prefix));
    Ok(())
}

fn run_map(
    input: &str,
    index_prefix: &str,
    output: Option<&str>,
    thread: usize,
    min_len: usize,
    mismatch: bool,
) -> anyhow::Result<()> {
    if !Path::new(input).exists() {
        anyhow::bail!("input fastq file '{}' does not exist", input);
    }

    let index = store::load(index_prefix)
        .context("index files appear to be damaged, please rebuild them")?;

    let fq = File::open(input)
        .with_context(|| format!("cannot open input fastq '{}'", input))?;
    let reader = FastqReader::new(BufReader::new(fq));

    let out: Box<dyn Write + Send> = match output {
        Some(p) if p != "-" && p != "stdout" => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("cannot create output file '{}'", p))?,
        )),
        _ => Box::new(BufWriter::new(std::io::stdout())),
    };

    let opt = MapOpt { threads: thread, min_len, allow_mismatch: mismatch };
    tailmap::map::run(&index, reader, out, &opt)?;
    Ok(())
}
