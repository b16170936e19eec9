/***************************************************************************************************
 *
 *  GFA record parsing
 *
 *    - Segment (S) lines: node id plus a length taken from the sequence or from the LN:i tag.
 *    - Walk (W) lines: sample, haplotype copy and an orientation-marked node string such as
 *      ">11<12>13".
 *    - Every other record type is skipped by the callers.
 *
 **************************************************************************************************/

use memchr::memchr2;

use crate::error::{PanctError, Result};

/// Placeholder used in the sequence column when the sequence is omitted.
pub const MISSING_SEQUENCE: &str = "*";

const LENGTH_TAG: &str = "LN:i:";

/// Where a segment's length comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthSource {
    /// Length of the literal sequence column.
    Sequence(u64),
    /// Value of an `LN:i:` tag, used when the sequence is the placeholder.
    Tag(u64),
    /// Neither a sequence nor a parsable tag was present.
    Unknown,
}

impl LengthSource {
    /// Inspect the sequence column and optional tags of a segment line.
    pub fn from_fields<'a, I>(sequence: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        if !sequence.is_empty() && sequence != MISSING_SEQUENCE {
            return LengthSource::Sequence(sequence.len() as u64);
        }
        tags.into_iter()
            .find_map(|tag| tag.strip_prefix(LENGTH_TAG))
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(LengthSource::Tag)
            .unwrap_or(LengthSource::Unknown)
    }

    /// Resolve to a positive length, or fail naming the node.
    pub fn resolve(self, node: &str) -> Result<u64> {
        match self {
            LengthSource::Sequence(len) | LengthSource::Tag(len) if len > 0 => Ok(len),
            _ => Err(PanctError::NodeLength {
                node: node.to_string(),
            }),
        }
    }
}

/// A parsed `S` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord<'a> {
    pub id: &'a str,
    pub length: u64,
}

/// A parsed `W` line. `nodes` keeps the order of the walk and drops orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRecord<'a> {
    pub sample: &'a str,
    pub haplotype: &'a str,
    pub nodes: Vec<&'a str>,
}

impl WalkRecord<'_> {
    /// Haplotype identifier used across the crate, `sample:copy`.
    pub fn haplotype_id(&self) -> String {
        format!("{}:{}", self.sample, self.haplotype)
    }
}

/// Record type of a GFA line, or `None` for blank and comment lines.
pub fn record_type(line: &str) -> Option<char> {
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    line.chars().next()
}

/// Parse an `S` line. `line_no` is only used in error messages.
pub fn parse_segment(line: &str, line_no: usize) -> Result<SegmentRecord<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = line.split('\t');
    let _ = fields.next();
    let id = fields
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PanctError::malformed('S', line_no, "missing segment name"))?;
    let sequence = fields.next().unwrap_or("");
    let length = LengthSource::from_fields(sequence, fields).resolve(id)?;
    Ok(SegmentRecord { id, length })
}

/// Parse a `W` line: `W sample hap_index seq_id seq_start seq_end walk`.
pub fn parse_walk(line: &str, line_no: usize) -> Result<WalkRecord<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return Err(PanctError::malformed(
            'W',
            line_no,
            format!("expected 7 fields, found {}", fields.len()),
        ));
    }
    Ok(WalkRecord {
        sample: fields[1],
        haplotype: fields[2],
        nodes: nodes_from_walk(fields[6]),
    })
}

/// Split a walk string into node ids, discarding the `>`/`<` orientation markers.
///
/// `">12438194<12438195>12438197"` yields `["12438194", "12438195", "12438197"]`.
pub fn nodes_from_walk(walk: &str) -> Vec<&str> {
    let bytes = walk.as_bytes();
    let mut nodes = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let next = memchr2(b'>', b'<', &bytes[pos..])
            .map(|offset| pos + offset)
            .unwrap_or(bytes.len());
        if next > pos {
            nodes.push(&walk[pos..next]);
        }
        pos = next + 1;
    }
    nodes
}
