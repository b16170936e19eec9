// tests/common/mod.rs
//
// Fixtures shared by the integration tests: a small GFA graph and a writer
// for BGZF side files with a tabix index keyed by node id.

#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use noodles::bgzf;
use noodles::core::Position;
use noodles::csi::binning_index::index::{self, reference_sequence::bin::Chunk};
use noodles::tabix;

/// Two nodes, three haplotypes. Node 2 has no sequence and an LN tag.
pub const BASIC_GFA: &str = "\
H\tVN:Z:1.1
S\t1\tAC
S\t2\t*\tLN:i:8
L\t1\t+\t2\t+\t0M
W\tHG1\t1\tchr1\t0\t8\t>2
W\tHG1\t2\tchr1\t0\t10\t>1>2
W\tHG2\t1\tchr1\t0\t10\t>1<2
";

/// Side file describing the walks of [`BASIC_GFA`].
pub const BASIC_WALK: &str = "1\tHG1:2\tHG2:1\n2\tHG1:1\tHG1:2\tHG2:1\n";

pub fn write_file(dir: &Path, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Write `lines` (each `node<TAB>haplotypes...`) to a BGZF file at `path` and
/// index it the way `tabix -s1 -b1 -e1` does, so every node is its own
/// reference sequence. Returns the path of the `.tbi` index.
pub fn write_indexed_side_file<S: AsRef<str>>(path: &Path, lines: &[S]) -> io::Result<PathBuf> {
    let header = index::header::Builder::gff()
        .set_reference_sequence_name_index(0)
        .set_start_position_index(0)
        .set_end_position_index(Some(0))
        .build();
    let mut indexer = tabix::index::Indexer::default();
    indexer.set_header(header);

    let mut writer = bgzf::Writer::new(File::create(path)?);
    for line in lines {
        let line = line.as_ref();
        let node = line.split('\t').next().unwrap_or("");
        let position = node
            .parse::<usize>()
            .ok()
            .and_then(|id| Position::try_from(id).ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("bad node id {:?}", node)))?;

        let start = writer.virtual_position();
        writeln!(writer, "{}", line)?;
        let end = writer.virtual_position();
        indexer.add_record(node, position, position, Chunk::new(start, end))?;
    }
    // Dropping the writer flushes the last block and the EOF marker.
    drop(writer);

    let index_path = PathBuf::from(format!("{}.tbi", path.display()));
    tabix::write(&index_path, &indexer.build())?;
    Ok(index_path)
}

/// `count` side-file lines for consecutive node ids starting at `first`.
/// Every third node carries a reference haplotype, every fifth is traversed
/// twice by one haplotype.
pub fn numbered_side_lines(first: u64, count: u64) -> Vec<String> {
    (first..first + count)
        .map(|node| {
            let mut line = format!("{}\tHG{}:1", node, node % 7);
            if node % 3 == 0 {
                line.push_str("\tGRCh38:0");
            }
            if node % 5 == 0 {
                line.push_str(&format!("\tHG{}:2\tHG{}:2", node % 4, node % 4));
            }
            line
        })
        .collect()
}
