//! Node → haplotype incidence index (".walk" side files).
//!
//! A side file has one line per node:
//!
//! ```text
//! 12<TAB>HG00096:1<TAB>HG00096:2<TAB>HG00096:2
//! ```
//!
//! A haplotype listed more than once traversed the node more than once, so
//! the index keeps a count per haplotype rather than a set.
//!
//! Two read strategies sit behind [`Walks::read`]:
//!
//! * indexed: a BGZF file with a tabix index built with the node id as both
//!   the sequence and position column (`tabix -s1 -b1 -e1`). Each node is then
//!   its own reference sequence and is fetched by random access.
//! * scan: a linear pass over the plain or gzip file.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use noodles::bgzf;
use noodles::core::region::Interval;
use noodles::csi::BinningIndex;
use noodles::tabix;

use crate::error::{PanctError, Result};
use crate::gfa;
use crate::io::{self as panct_io, has_gz_suffix, strip_gz_suffix, with_appended_suffix};
use crate::progress::count_progress_bar;

/// One haplotype copy of one sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Haplotype {
    pub sample: String,
    pub copy: u32,
}

impl Haplotype {
    pub fn new(sample: impl Into<String>, copy: u32) -> Self {
        Self {
            sample: sample.into(),
            copy,
        }
    }
}

impl fmt::Display for Haplotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sample, self.copy)
    }
}

impl FromStr for Haplotype {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (sample, copy) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("haplotype {:?} is not sample:copy", s))?;
        if sample.is_empty() {
            return Err(format!("haplotype {:?} has an empty sample name", s));
        }
        let copy = copy
            .parse::<u32>()
            .map_err(|_| format!("haplotype {:?} has a non-numeric copy number", s))?;
        Ok(Haplotype::new(sample, copy))
    }
}

/// Haplotype → number of traversals of one node.
pub type HaplotypeCounts = BTreeMap<Haplotype, usize>;

/// Inclusive window of numeric node ids; a missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeWindow {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl NodeWindow {
    pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// Closed window `[start, end]`.
    pub fn between(start: u64, end: u64) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn contains(&self, node: u64) -> bool {
        self.start.map_or(true, |start| node >= start) && self.end.map_or(true, |end| node <= end)
    }
}

impl FromStr for NodeWindow {
    type Err = PanctError;

    /// Parse `start-end`, `start-`, `-end` or `-`.
    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| PanctError::config(format!("node window {:?} is not start-end", s)))?;
        let bound = |text: &str| -> Result<Option<u64>> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<u64>()
                .map(Some)
                .map_err(|_| PanctError::config(format!("invalid bound {:?} in node window {:?}", text, s)))
        };
        Ok(NodeWindow::new(bound(start)?, bound(end)?))
    }
}

impl fmt::Display for NodeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{}", start)?;
        }
        write!(f, "-")?;
        if let Some(end) = self.end {
            write!(f, "{}", end)?;
        }
        Ok(())
    }
}

/// Filters applied to every side-file line, whichever strategy reads it.
struct WalkFilter<'a> {
    window: Option<NodeWindow>,
    nodes: Option<&'a HashSet<u64>>,
    exclude_samples: &'a HashSet<String>,
}

impl WalkFilter<'_> {
    fn accepts_node(&self, node: u64) -> bool {
        self.window.map_or(true, |w| w.contains(node))
            && self.nodes.map_or(true, |nodes| nodes.contains(&node))
    }
}

/// Node id → haplotype multiset, as read from a side file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Walks {
    data: BTreeMap<u64, HaplotypeCounts>,
}

impl Walks {
    /// Read the incidence of every node accepted by `window` and `nodes`,
    /// dropping haplotypes of `exclude_samples`.
    ///
    /// The indexed strategy is used when `path` is a `.gz` file with a `.tbi`
    /// next to it and a window is given; format errors from it fall back to
    /// a linear scan.
    pub fn read<P: AsRef<Path>>(
        path: P,
        window: Option<NodeWindow>,
        nodes: Option<&HashSet<u64>>,
        exclude_samples: &HashSet<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let filter = WalkFilter {
            window,
            nodes,
            exclude_samples,
        };

        let walks = match indexed_companion(path, window) {
            Some(index_path) => match read_indexed(path, &index_path, &filter) {
                Ok(walks) => walks,
                Err(err) if err.is_format_error() => {
                    warn!(
                        "Indexed lookup in {} failed ({}); falling back to a full scan",
                        path.display(),
                        err
                    );
                    read_scan(path, &filter)?
                }
                Err(err) => return Err(err),
            },
            None => read_scan(path, &filter)?,
        };

        if let Some(nodes) = nodes {
            if walks.len() < nodes.len() {
                warn!(
                    "Only found {}/{} requested nodes in {}",
                    walks.len(),
                    nodes.len(),
                    path.display()
                );
            }
        }
        Ok(walks)
    }

    /// Random-access read through the tabix index at `index_path`.
    pub fn read_indexed<P: AsRef<Path>, Q: AsRef<Path>>(
        path: P,
        index_path: Q,
        window: Option<NodeWindow>,
        nodes: Option<&HashSet<u64>>,
        exclude_samples: &HashSet<String>,
    ) -> Result<Self> {
        let filter = WalkFilter {
            window,
            nodes,
            exclude_samples,
        };
        read_indexed(path.as_ref(), index_path.as_ref(), &filter)
    }

    /// Linear scan of the whole side file.
    pub fn read_scan<P: AsRef<Path>>(
        path: P,
        window: Option<NodeWindow>,
        nodes: Option<&HashSet<u64>>,
        exclude_samples: &HashSet<String>,
    ) -> Result<Self> {
        let filter = WalkFilter {
            window,
            nodes,
            exclude_samples,
        };
        read_scan(path.as_ref(), &filter)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, node: u64) -> Option<&HaplotypeCounts> {
        self.data.get(&node)
    }

    /// Nodes in increasing id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &HaplotypeCounts)> {
        self.data.iter().map(|(node, counts)| (*node, counts))
    }

    fn merge(&mut self, node: u64, counts: HaplotypeCounts) {
        let entry = self.data.entry(node).or_default();
        for (haplotype, count) in counts {
            *entry.entry(haplotype).or_insert(0) += count;
        }
    }
}

/// The tabix index that makes random access possible, if there is one.
fn indexed_companion(path: &Path, window: Option<NodeWindow>) -> Option<PathBuf> {
    window?;
    if !has_gz_suffix(path) {
        return None;
    }
    let index_path = with_appended_suffix(path, ".tbi");
    index_path.is_file().then_some(index_path)
}

/// Parse one side-file line. Returns `None` for comments and for nodes the
/// filter rejects.
fn parse_walk_line(
    line: &str,
    filter: &WalkFilter<'_>,
    path: &Path,
    line_no: usize,
) -> Result<Option<(u64, HaplotypeCounts)>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut fields = line.split('\t');
    let node_field = fields.next().unwrap_or("");
    let node = node_field.trim().parse::<u64>().map_err(|_| {
        PanctError::side_file(
            path,
            format!("line {}: node id {:?} is not numeric", line_no, node_field),
        )
    })?;
    if !filter.accepts_node(node) {
        return Ok(None);
    }

    let mut counts = HaplotypeCounts::new();
    for token in fields.filter(|t| !t.is_empty()) {
        let haplotype = token
            .parse::<Haplotype>()
            .map_err(|reason| PanctError::side_file(path, format!("line {}: {}", line_no, reason)))?;
        if filter.exclude_samples.contains(&haplotype.sample) {
            continue;
        }
        *counts.entry(haplotype).or_insert(0) += 1;
    }
    Ok(Some((node, counts)))
}

fn read_scan(path: &Path, filter: &WalkFilter<'_>) -> Result<Walks> {
    debug!("Scanning side file {}", path.display());
    let reader = panct_io::open(path).map_err(|err| PanctError::file(path, err))?;
    let pb = count_progress_bar(format!("Scanning {}", path.display()), "lines");
    let mut walks = Walks::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        pb.inc(1);
        if let Some((node, counts)) = parse_walk_line(&line, filter, path, idx + 1)? {
            walks.merge(node, counts);
        }
    }

    pb.finish_and_clear();
    debug!("Read {} nodes from {}", walks.len(), path.display());
    Ok(walks)
}

fn read_indexed(path: &Path, index_path: &Path, filter: &WalkFilter<'_>) -> Result<Walks> {
    debug!(
        "Reading side file {} through index {}",
        path.display(),
        index_path.display()
    );
    let index = tabix::read(index_path).map_err(|err| {
        PanctError::side_file(index_path, format!("unreadable tabix index: {}", err))
    })?;
    let header = index
        .header()
        .ok_or_else(|| PanctError::side_file(index_path, "tabix index has no header"))?;

    // Each indexed reference sequence is one node.
    let mut targets = Vec::new();
    for (reference_sequence_id, name) in header.reference_sequence_names().iter().enumerate() {
        let name = name.to_string();
        let node = name.parse::<u64>().map_err(|_| {
            PanctError::side_file(
                index_path,
                format!("indexed sequence {:?} is not a node id", name),
            )
        })?;
        if filter.accepts_node(node) {
            targets.push((reference_sequence_id, node));
        }
    }

    let file = File::open(path).map_err(|err| PanctError::file(path, err))?;
    let mut reader = bgzf::Reader::new(file);
    let mut walks = Walks::default();
    let mut line = String::new();

    for (reference_sequence_id, node) in targets {
        let chunks = index.query(reference_sequence_id, Interval::from(..))?;
        for chunk in chunks {
            reader.seek(chunk.start())?;
            while reader.virtual_position() < chunk.end() {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    break;
                }
                match parse_walk_line(&line, filter, path, 0)? {
                    Some((id, counts)) if id == node => walks.merge(id, counts),
                    _ => {}
                }
            }
        }
    }

    debug!("Fetched {} nodes from {}", walks.len(), path.display());
    Ok(walks)
}

/// Default side-file location for a graph: `graph.gfa[.gz]` -> `graph.walk`.
pub fn default_walk_path(graph: &Path) -> PathBuf {
    strip_gz_suffix(graph).with_extension("walk")
}

/// Write the plain side file for a GFA graph and return its path.
///
/// Every segment gets a line, including segments no walk visits, so that a
/// lookup over the graph's node ids recovers every node. Compressing with
/// `bgzip` and indexing with `tabix -s1 -b1 -e1` is left to the caller.
pub fn extract_walks<P: AsRef<Path>>(graph: P, output: Option<&Path>) -> Result<PathBuf> {
    let graph = graph.as_ref();
    let output = match output {
        Some(path) => strip_gz_suffix(path),
        None => default_walk_path(graph),
    };
    info!("Extracting walks from {} into {}", graph.display(), output.display());

    let mut incidence: BTreeMap<u64, HaplotypeCounts> = BTreeMap::new();
    let pb = count_progress_bar(format!("Reading {}", graph.display()), "lines");
    let mut num_walks = 0usize;

    let reader = panct_io::open(graph).map_err(|err| PanctError::file(graph, err))?;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        pb.inc(1);
        let line_no = idx + 1;
        match gfa::record_type(&line) {
            Some('S') => {
                let segment = gfa::parse_segment(&line, line_no)?;
                incidence.entry(numeric_node(segment.id, line_no)?).or_default();
            }
            Some('W') => {
                let walk = gfa::parse_walk(&line, line_no)?;
                let copy = walk.haplotype.parse::<u32>().map_err(|_| {
                    PanctError::malformed(
                        'W',
                        line_no,
                        format!("haplotype index {:?} is not numeric", walk.haplotype),
                    )
                })?;
                let haplotype = Haplotype::new(walk.sample, copy);
                for node in &walk.nodes {
                    let counts = incidence.entry(numeric_node(node, line_no)?).or_default();
                    *counts.entry(haplotype.clone()).or_insert(0) += 1;
                }
                num_walks += 1;
            }
            _ => {}
        }
    }
    pb.finish_and_clear();

    let file = File::create(&output).map_err(|err| PanctError::file(&output, err))?;
    let mut writer = BufWriter::new(file);
    for (node, counts) in &incidence {
        write!(writer, "{}", node)?;
        for (haplotype, count) in counts {
            for _ in 0..*count {
                write!(writer, "\t{}", haplotype)?;
            }
        }
        writeln!(writer)?;
    }
    writer.flush()?;

    info!(
        "Wrote {} nodes covered by {} walks to {}",
        incidence.len(),
        num_walks,
        output.display()
    );
    Ok(output)
}

fn numeric_node(id: &str, line_no: usize) -> Result<u64> {
    id.parse::<u64>().map_err(|_| {
        PanctError::config(format!(
            "line {}: node id {:?} is not numeric; side files require numeric node ids",
            line_no, id
        ))
    })
}
