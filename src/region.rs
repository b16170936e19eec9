//! Genomic intervals used to scope complexity computations.
//!
//! Coordinates are taken as written: `chr1:100-200` becomes start 100, end 200.
//! The same numbers are handed to the interval query and echoed in the output,
//! so no 0/1-based conversion happens anywhere in the crate.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Index;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::error::{PanctError, Result};

static REGION_PATTERN: OnceLock<Regex> = OnceLock::new();

fn region_pattern() -> &'static Regex {
    REGION_PATTERN.get_or_init(|| {
        Regex::new(r"^(\w+):(\d+)-(\d+)$").expect("region pattern is a valid regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    /// Build a region, rejecting empty or inverted intervals.
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Result<Self> {
        let chrom = chrom.into();
        if start >= end {
            return Err(PanctError::region(
                format!("{}:{}-{}", chrom, start, end),
                "start>=end",
            ));
        }
        Ok(Self { chrom, start, end })
    }

    /// Parse a `chrom:start-end` coordinate string.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = region_pattern()
            .captures(text.trim())
            .ok_or_else(|| PanctError::region(text, "expected chrom:start-end"))?;
        let start = caps[2]
            .parse::<u64>()
            .map_err(|e| PanctError::region(text, format!("invalid start: {}", e)))?;
        let end = caps[3]
            .parse::<u64>()
            .map_err(|e| PanctError::region(text, format!("invalid end: {}", e)))?;
        if start >= end {
            return Err(PanctError::region(text, "start>=end"));
        }
        Ok(Self {
            chrom: caps[1].to_string(),
            start,
            end,
        })
    }

    /// Interval argument for the graph query tool, e.g. `100..200`.
    pub fn interval(&self) -> String {
        format!("{}..{}", self.start, self.end)
    }
}

impl FromStr for Region {
    type Err = PanctError;

    fn from_str(s: &str) -> Result<Self> {
        Region::parse(s)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// Regions in the order they appear in a BED-like file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Regions {
    data: Vec<Region>,
}

impl Regions {
    pub fn new(data: Vec<Region>) -> Self {
        Self { data }
    }

    /// Load regions from the first three tab-separated columns of a file.
    ///
    /// Any malformed line fails the whole load. Blank lines and BED header
    /// lines (`#`, `track`, `browser`) are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|err| PanctError::file(path.as_ref(), err))?;
        let reader = BufReader::new(file);
        let mut data = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.trim().is_empty() || is_bed_header(trimmed) {
                continue;
            }
            data.push(parse_bed_line(trimmed, line_no)?);
        }

        debug!(
            "Loaded {} regions from {}",
            data.len(),
            path.as_ref().display()
        );
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.data.iter()
    }

    pub fn push(&mut self, region: Region) {
        self.data.push(region);
    }

    pub fn extend(&mut self, other: Regions) {
        self.data.extend(other.data);
    }
}

/// `#` comments and UCSC `track`/`browser` lines. Only the whole first word
/// counts, so contigs such as `track1` are still read as regions.
fn is_bed_header(line: &str) -> bool {
    if line.starts_with('#') {
        return true;
    }
    let first_word = line.split(['\t', ' ']).next().unwrap_or("");
    first_word == "track" || first_word == "browser"
}

fn parse_bed_line(line: &str, line_no: usize) -> Result<Region> {
    let bad_line = |reason: String| PanctError::RegionsFile {
        line: line_no,
        content: line.to_string(),
        reason,
    };

    let items: Vec<&str> = line.split('\t').collect();
    if items.len() < 3 {
        return Err(bad_line(format!(
            "expected at least 3 columns, found {}",
            items.len()
        )));
    }
    let start = items[1]
        .trim()
        .parse::<u64>()
        .map_err(|_| bad_line(format!("improper start coordinate {:?}", items[1])))?;
    let end = items[2]
        .trim()
        .parse::<u64>()
        .map_err(|_| bad_line(format!("improper end coordinate {:?}", items[2])))?;
    if start >= end {
        return Err(bad_line("start>=end".to_string()));
    }
    Ok(Region {
        chrom: items[0].to_string(),
        start,
        end,
    })
}

impl Index<usize> for Regions {
    type Output = Region;

    fn index(&self, index: usize) -> &Region {
        &self.data[index]
    }
}

impl IntoIterator for Regions {
    type Item = Region;
    type IntoIter = std::vec::IntoIter<Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a> IntoIterator for &'a Regions {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
