use clap::{Args, Parser, Subcommand};
use log::{error, info};
use panct::{
    complexity::{self, ComplexityConfig, Output, DEFAULT_METRICS},
    gbz::GbzTools,
    walks, Result,
};
use std::path::PathBuf;

/// panct: sequence-uniqueness complexity of pangenome graph regions
#[derive(Parser, Debug)]
#[command(
    name = "panct",
    about = "Compute complexity metrics over GFA or GBZ pangenome graphs",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute complexity metrics for a graph or for regions of a GBZ graph
    Complexity(ComplexityArgs),
    /// Write the node -> haplotype side file for a GFA graph
    Walks(WalksArgs),
}

#[derive(Args, Debug, Clone)]
struct LogArgs {
    /// Logging level; RUST_LOG takes precedence when set
    #[arg(
        short = 'v',
        long = "verbosity",
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    verbosity: String,
}

#[derive(Args, Debug)]
struct ComplexityArgs {
    /// Graph to analyse (.gfa, .gfa.gz or .gbz)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,
    /// Region to analyse, as chrom:start-end
    #[arg(long, value_name = "REGION")]
    region: Option<String>,
    /// BED file of regions to analyse
    #[arg(long, value_name = "BED")]
    region_file: Option<PathBuf>,
    /// Comma-separated list of metrics
    #[arg(long, value_name = "LIST", default_value = DEFAULT_METRICS)]
    metrics: String,
    /// Reference sample whose paths give the region coordinates
    #[arg(long, value_name = "ID", default_value = "GRCh38")]
    reference: String,
    /// Comma-separated samples whose walks are ignored
    #[arg(long, value_name = "SAMPLES", value_delimiter = ',')]
    exclude: Vec<String>,
    /// Side file with the walks through each node
    #[arg(long, value_name = "FILE")]
    walks: Option<PathBuf>,
    /// Output TSV; "-" writes to stdout
    #[arg(short = 'o', long = "out", value_name = "PATH", default_value = "-")]
    out: PathBuf,
    #[command(flatten)]
    log: LogArgs,
}

#[derive(Args, Debug)]
struct WalksArgs {
    /// GFA graph to read (.gfa or .gfa.gz)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,
    /// Output side file; defaults to the graph name with a .walk extension
    #[arg(short = 'o', long = "out", value_name = "PATH")]
    out: Option<PathBuf>,
    #[command(flatten)]
    log: LogArgs,
}

impl ComplexityArgs {
    fn into_config(self) -> Result<ComplexityConfig> {
        let mut config = ComplexityConfig::new(self.graph)
            .with_regions(self.region.as_deref(), self.region_file.as_deref())?
            .with_metrics(&self.metrics)?;
        config.output = Output::from_arg(&self.out);
        config.reference = self.reference;
        config.exclude_samples = self
            .exclude
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        config.walk_file = self.walks;
        Ok(config)
    }
}

fn init_logging(args: &LogArgs) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.verbosity))
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Complexity(args) => {
            init_logging(&args.log);
            let config = args.into_config()?;
            complexity::run(&config, &GbzTools::default())?;
        }
        Command::Walks(args) => {
            init_logging(&args.log);
            let output = walks::extract_walks(&args.graph, args.out.as_deref())?;
            info!("Wrote {}", output.display());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        error!("{}", err);
        std::process::exit(1);
    }
}
