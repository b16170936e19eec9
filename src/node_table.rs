// src/node_table.rs

// In-memory model of which haplotype walks pass through which graph nodes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::error::{PanctError, Result};
use crate::gfa;
use crate::io::{self as panct_io, strip_gz_suffix, with_appended_suffix};
use crate::progress::count_progress_bar;
use crate::walks::{NodeWindow, Walks};

/// A graph node: its length and the haplotypes that traverse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: String,
    length: u64,
    samples: HashSet<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, length: u64) -> Self {
        Self {
            id: id.into(),
            length,
            samples: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Haplotype ids (`sample:copy`) seen on this node.
    pub fn samples(&self) -> &HashSet<String> {
        &self.samples
    }

    pub fn add_sample(&mut self, haplotype_id: impl Into<String>) {
        self.samples.insert(haplotype_id.into());
    }
}

/// Node lengths and walk membership for one region, or for a whole graph.
///
/// Nodes keep the order in which they were added so that every statistic
/// derived from the table is reproducible.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    num_walks: usize,
    walk_lengths: Vec<u64>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a GFA file (plain or gzip).
    ///
    /// Segments are read first. Walk membership then comes from a side file
    /// when one is given or found next to the graph (see [`find_walk_file`]),
    /// and from the graph's own W-lines otherwise. Walks of `exclude_samples`
    /// are ignored either way.
    pub fn load_from_gfa<P: AsRef<Path>>(
        path: P,
        exclude_samples: &[String],
        walk_file: Option<&Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let start_time = Instant::now();
        let mut table = NodeTable::new();
        table.load_segments(path)?;
        info!("Loaded {} nodes from {}", table.num_nodes(), path.display());

        let exclude: HashSet<String> = exclude_samples.iter().cloned().collect();
        let side_file = walk_file
            .map(Path::to_path_buf)
            .or_else(|| find_walk_file(path));

        let from_side_file = match side_file {
            Some(side_file) => table.load_walks_from_side_file(&side_file, &exclude)?,
            None => false,
        };
        if !from_side_file {
            table.load_walks_from_gfa(path, &exclude)?;
        }

        info!(
            "Loaded {} walks over {} nodes in {:.2?}",
            table.num_walks(),
            table.num_nodes(),
            start_time.elapsed()
        );
        Ok(table)
    }

    /// First pass: one node per S-line.
    fn load_segments(&mut self, path: &Path) -> Result<()> {
        let pb = count_progress_bar("Reading segments", "lines");
        let reader = panct_io::open(path).map_err(|err| PanctError::file(path, err))?;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            pb.inc(1);
            if gfa::record_type(&line) != Some('S') {
                continue;
            }
            let segment = gfa::parse_segment(&line, idx + 1)?;
            self.add_node(Node::new(segment.id, segment.length));
        }
        pb.finish_and_clear();
        Ok(())
    }

    /// Second pass: add every W-line as a walk.
    fn load_walks_from_gfa(&mut self, path: &Path, exclude: &HashSet<String>) -> Result<()> {
        debug!("Reading walks from W-lines of {}", path.display());
        let pb = count_progress_bar("Reading walks", "lines");
        let reader = panct_io::open(path).map_err(|err| PanctError::file(path, err))?;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            pb.inc(1);
            if gfa::record_type(&line) != Some('W') {
                continue;
            }
            let walk = gfa::parse_walk(&line, idx + 1)?;
            if exclude.contains(walk.sample) {
                continue;
            }
            self.add_walk(&walk.haplotype_id(), walk.nodes.as_slice())?;
        }
        pb.finish_and_clear();
        Ok(())
    }

    /// Second pass through a side file. Returns `false`, leaving the table
    /// untouched, when the side file cannot describe this table and the
    /// W-lines have to be read instead.
    fn load_walks_from_side_file(
        &mut self,
        side_file: &Path,
        exclude: &HashSet<String>,
    ) -> Result<bool> {
        if self.nodes.is_empty() {
            return Ok(false);
        }
        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            match node.id.parse::<u64>() {
                Ok(id) => {
                    node_ids.insert(id);
                }
                Err(_) => {
                    debug!(
                        "Node id {:?} is not numeric; not using side file {}",
                        node.id,
                        side_file.display()
                    );
                    return Ok(false);
                }
            }
        }
        let (Some(&min_id), Some(&max_id)) = (node_ids.iter().min(), node_ids.iter().max()) else {
            return Ok(false);
        };

        info!("Reading walks from side file {}", side_file.display());
        let walks = Walks::read(
            side_file,
            Some(NodeWindow::between(min_id, max_id)),
            Some(&node_ids),
            exclude,
        )?;
        if walks.len() != node_ids.len() {
            warn!(
                "Side file {} describes {}/{} nodes; reading walks from the graph instead",
                side_file.display(),
                walks.len(),
                node_ids.len()
            );
            return Ok(false);
        }

        let mut lengths: BTreeMap<String, u64> = BTreeMap::new();
        for node in &mut self.nodes {
            // Every id parsed above, and the lookup returned all of them.
            let Some(counts) = node.id.parse::<u64>().ok().and_then(|id| walks.get(id)) else {
                continue;
            };
            for (haplotype, count) in counts {
                let haplotype_id = haplotype.to_string();
                *lengths.entry(haplotype_id.clone()).or_insert(0) += node.length * *count as u64;
                node.samples.insert(haplotype_id);
            }
        }
        self.num_walks += lengths.len();
        self.walk_lengths.extend(lengths.into_values());
        Ok(true)
    }

    /// Add a node, replacing any node with the same id.
    pub fn add_node(&mut self, node: Node) {
        match self.index.get(&node.id) {
            Some(&pos) => self.nodes[pos] = node,
            None => {
                self.index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Record one walk: count it, store its length, and mark the haplotype on
    /// each of its nodes. Fails without changing the table if a node is unknown.
    pub fn add_walk<S: AsRef<str>>(&mut self, haplotype_id: &str, nodes: &[S]) -> Result<()> {
        let length = self.walk_length(nodes)?;
        for node in nodes {
            if let Some(&pos) = self.index.get(node.as_ref()) {
                self.nodes[pos].add_sample(haplotype_id);
            }
        }
        self.walk_lengths.push(length);
        self.num_walks += 1;
        Ok(())
    }

    /// Total length of a walk through `nodes`, counting repeats.
    pub fn walk_length<S: AsRef<str>>(&self, nodes: &[S]) -> Result<u64> {
        nodes.iter().try_fold(0u64, |total, node| {
            self.get(node.as_ref())
                .map(|n| total + n.length)
                .ok_or_else(|| PanctError::UnknownNode {
                    node: node.as_ref().to_string(),
                })
        })
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_walks(&self) -> usize {
        self.num_walks
    }

    pub fn walk_lengths(&self) -> &[u64] {
        &self.walk_lengths
    }

    pub fn total_node_length(&self) -> u64 {
        self.nodes.iter().map(|n| n.length).sum()
    }

    /// NaN when the table has no nodes.
    pub fn mean_node_length(&self) -> f64 {
        if self.nodes.is_empty() {
            return f64::NAN;
        }
        self.total_node_length() as f64 / self.nodes.len() as f64
    }

    /// NaN when no walks were recorded.
    pub fn mean_walk_length(&self) -> f64 {
        if self.num_walks == 0 || self.walk_lengths.is_empty() {
            return f64::NAN;
        }
        let total: u64 = self.walk_lengths.iter().sum();
        total as f64 / self.walk_lengths.len() as f64
    }
}

/// Locate a side file next to a graph: `graph.walk.gz` when it is indexed,
/// then `graph.walk`, then an unindexed `graph.walk.gz`.
pub fn find_walk_file(graph: &Path) -> Option<PathBuf> {
    let plain = strip_gz_suffix(graph).with_extension("walk");
    let compressed = with_appended_suffix(&plain, ".gz");
    if compressed.is_file() && with_appended_suffix(&compressed, ".tbi").is_file() {
        return Some(compressed);
    }
    if plain.is_file() {
        return Some(plain);
    }
    compressed.is_file().then_some(compressed)
}
