//! Sequence-uniqueness scores over a [`NodeTable`], and the driver that writes
//! one report row per region.
//!
//! For every node `n` with length `|n|` and haplotype fraction
//! `p(n) = |samples(n)| / numwalks` the score accumulates
//! `|n| * p(n) * (1 - p(n))`, then normalizes by the mean walk length
//! (`sequniq-normwalk`) or the mean node length (`sequniq-normnode`).

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use csv::WriterBuilder;
use log::{info, warn};

use crate::error::{PanctError, Result};
use crate::gbz::{CommandRunner, GbzTools};
use crate::node_table::NodeTable;
use crate::region::{Region, Regions};

pub const DEFAULT_METRICS: &str = "sequniq-normwalk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Normalized by mean walk length.
    SeqUniqNormWalk,
    /// Normalized by mean node length.
    SeqUniqNormNode,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::SeqUniqNormWalk, Metric::SeqUniqNormNode];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::SeqUniqNormWalk => "sequniq-normwalk",
            Metric::SeqUniqNormNode => "sequniq-normnode",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = PanctError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "sequniq-normwalk" | "normwalk" => Ok(Metric::SeqUniqNormWalk),
            "sequniq-normnode" | "normnode" => Ok(Metric::SeqUniqNormNode),
            other => Err(PanctError::InvalidMetric(other.to_string())),
        }
    }
}

/// Parse a comma-separated metric list, failing on the first unknown name.
pub fn parse_metrics(list: &str) -> Result<Vec<Metric>> {
    list.split(',').map(str::parse).collect()
}

/// Score a node table. `None` when no walk passes through it.
pub fn compute(table: &NodeTable, metric: Metric) -> Option<f64> {
    if table.num_walks() == 0 {
        return None;
    }
    let numwalks = table.num_walks() as f64;
    let mut complexity = 0.0;
    for node in table.nodes() {
        let length = node.length() as f64;
        let p = node.samples().len() as f64 / numwalks;
        complexity += length * p * (1.0 - p);
    }
    let denominator = match metric {
        Metric::SeqUniqNormWalk => table.mean_walk_length(),
        Metric::SeqUniqNormNode => table.mean_node_length(),
    };
    Some(complexity / denominator)
}

/// [`compute`] with the metric given by name.
pub fn compute_named(table: &NodeTable, metric: &str) -> Result<Option<f64>> {
    Ok(compute(table, metric.parse()?))
}

/// Where the report goes. `-` on the command line means stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            Output::Stdout
        } else {
            Output::File(arg.to_path_buf())
        }
    }

    fn open(&self) -> Result<Box<dyn Write>> {
        Ok(match self {
            Output::Stdout => Box::new(io::stdout()),
            Output::File(path) => {
                Box::new(File::create(path).map_err(|err| PanctError::file(path, err))?)
            }
        })
    }
}

/// Graph input kinds understood by [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Plain-text GFA, optionally gzip-compressed.
    Gfa,
    /// GBZ, queried through the external gbz-base tools.
    Gbz,
}

impl GraphKind {
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy();
        if name.ends_with(".gbz") {
            Ok(GraphKind::Gbz)
        } else if name.ends_with(".gfa") || name.ends_with(".gfa.gz") {
            Ok(GraphKind::Gfa)
        } else {
            Err(PanctError::config(format!(
                "{} is neither a .gfa, .gfa.gz nor a .gbz graph",
                path.display()
            )))
        }
    }
}

/// Settings for one `complexity` invocation.
#[derive(Debug, Clone)]
pub struct ComplexityConfig {
    pub graph: PathBuf,
    pub output: Output,
    pub regions: Regions,
    pub metrics: Vec<Metric>,
    /// Sample whose paths give the coordinates of GBZ regions.
    pub reference: String,
    /// Samples whose walks are ignored.
    pub exclude_samples: Vec<String>,
    /// Side file to use instead of the one found next to the graph.
    pub walk_file: Option<PathBuf>,
}

impl ComplexityConfig {
    pub fn new(graph: impl Into<PathBuf>) -> Self {
        Self {
            graph: graph.into(),
            output: Output::Stdout,
            regions: Regions::default(),
            metrics: vec![Metric::SeqUniqNormWalk],
            reference: "GRCh38".to_string(),
            exclude_samples: Vec::new(),
            walk_file: None,
        }
    }

    /// Add a single `chrom:start-end` region and/or every region of a BED file.
    pub fn with_regions(mut self, region: Option<&str>, region_file: Option<&Path>) -> Result<Self> {
        if let Some(region) = region.filter(|r| !r.is_empty()) {
            self.regions.push(Region::parse(region)?);
        }
        if let Some(region_file) = region_file {
            if !region_file.exists() {
                return Err(PanctError::config(format!(
                    "Could not find {}",
                    region_file.display()
                )));
            }
            self.regions.extend(Regions::load(region_file)?);
        }
        Ok(self)
    }

    pub fn with_metrics(mut self, metrics: &str) -> Result<Self> {
        self.metrics = parse_metrics(metrics)?;
        Ok(self)
    }
}

struct Report {
    writer: csv::Writer<Box<dyn Write>>,
    with_coordinates: bool,
}

impl Report {
    fn create(output: &Output, metrics: &[Metric], with_coordinates: bool) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(output.open()?);
        let mut header: Vec<String> = Vec::new();
        if with_coordinates {
            header.extend(["chrom", "start", "end"].map(String::from));
        }
        header.extend(["numnodes", "total_length", "numwalks"].map(String::from));
        header.extend(metrics.iter().map(|m| m.name().to_string()));
        writer.write_record(&header)?;
        writer.flush()?;
        Ok(Self {
            writer,
            with_coordinates,
        })
    }

    fn write_row(&mut self, region: Option<&Region>, table: &NodeTable, metrics: &[Metric]) -> Result<()> {
        let mut row: Vec<String> = Vec::new();
        if self.with_coordinates {
            if let Some(region) = region {
                row.extend([
                    region.chrom.clone(),
                    region.start.to_string(),
                    region.end.to_string(),
                ]);
            }
        }
        row.push(table.num_nodes().to_string());
        row.push(table.total_node_length().to_string());
        row.push(table.num_walks().to_string());
        for &metric in metrics {
            row.push(match compute(table, metric) {
                Some(value) => value.to_string(),
                None => "NA".to_string(),
            });
        }
        self.writer.write_record(&row)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Compute every requested metric and write the report.
///
/// A GFA graph yields a single whole-graph row. A GBZ graph yields one row per
/// region, in region order, each built from the sub-graph the external query
/// tool extracts for it; the reference sample's own walk is left out.
pub fn run<R: CommandRunner>(config: &ComplexityConfig, tools: &GbzTools<R>) -> Result<()> {
    let start_time = Instant::now();
    if !config.graph.exists() {
        return Err(PanctError::config(format!(
            "{} does not exist",
            config.graph.display()
        )));
    }
    if config.metrics.is_empty() {
        return Err(PanctError::config("No metrics requested"));
    }

    match GraphKind::detect(&config.graph)? {
        GraphKind::Gfa => {
            if !config.regions.is_empty() {
                warn!(
                    "Regions only apply to GBZ input; computing over all of {}",
                    config.graph.display()
                );
            }
            let mut report = Report::create(&config.output, &config.metrics, false)?;
            let table = NodeTable::load_from_gfa(
                &config.graph,
                &config.exclude_samples,
                config.walk_file.as_deref(),
            )?;
            report.write_row(None, &table, &config.metrics)?;
        }
        GraphKind::Gbz => {
            if config.regions.is_empty() {
                return Err(PanctError::config("Did not detect any regions"));
            }
            tools.require_tooling()?;
            if !tools.ensure_indexed(&config.graph) {
                return Err(PanctError::IndexFailed {
                    path: config.graph.clone(),
                });
            }

            let mut exclude = config.exclude_samples.clone();
            if !exclude.contains(&config.reference) {
                exclude.push(config.reference.clone());
            }

            let mut report = Report::create(&config.output, &config.metrics, true)?;
            for region in &config.regions {
                info!("Processing region {}", region);
                let subgraph = tools
                    .extract_region(&config.graph, region, &config.reference)?
                    .ok_or_else(|| PanctError::ExtractionFailed {
                        path: config.graph.clone(),
                        region: region.to_string(),
                    })?;
                let table = NodeTable::load_from_gfa(
                    subgraph.path(),
                    &exclude,
                    config.walk_file.as_deref(),
                )?;
                report.write_row(Some(region), &table, &config.metrics)?;
            }
        }
    }

    let regions = config.regions.len().max(1);
    info!(
        "Done in {:.2?} ({:.2?} per region)",
        start_time.elapsed(),
        start_time.elapsed() / regions as u32
    );
    Ok(())
}
