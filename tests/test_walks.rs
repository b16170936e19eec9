// tests/test_walks.rs

mod common;

use std::collections::HashSet;

use panct::walks::{extract_walks, Haplotype, NodeWindow, Walks};

use common::{numbered_side_lines, write_file, write_indexed_side_file, BASIC_GFA, BASIC_WALK};

const SIDE_LINES: [&str; 5] = [
    "10\tGRCh38:0\tHG1:1\tHG2:1",
    "11\tHG1:1",
    "12\tGRCh38:0\tHG1:1\tHG1:1",
    "13\tHG2:1\tHG2:2",
    "14\tGRCh38:0",
];

fn no_samples() -> HashSet<String> {
    HashSet::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_and_scan_agree() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let indexed = dir.path().join("graph.walk.gz");
        let index = write_indexed_side_file(&indexed, &SIDE_LINES)?;
        let plain = write_file(dir.path(), "graph.walk", &(SIDE_LINES.join("\n") + "\n"))?;

        let window = Some(NodeWindow::between(11, 13));
        let exclude: HashSet<String> = ["GRCh38".to_string()].into_iter().collect();

        let from_index = Walks::read_indexed(&indexed, &index, window, None, &exclude)?;
        let from_scan = Walks::read_scan(&plain, window, None, &exclude)?;
        assert_eq!(from_index, from_scan);
        assert_eq!(from_index.len(), 3);

        // Repeated traversal survives both strategies.
        assert_eq!(from_index.get(12).unwrap()[&Haplotype::new("HG1", 1)], 2);
        assert!(from_index.get(10).is_none());

        // The dispatcher picks the index up on its own.
        let dispatched = Walks::read(&indexed, window, None, &exclude)?;
        assert_eq!(dispatched, from_scan);
        Ok(())
    }

    #[test]
    fn test_indexed_read_honours_node_set() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let indexed = dir.path().join("graph.walk.gz");
        write_indexed_side_file(&indexed, &SIDE_LINES)?;

        let nodes: HashSet<u64> = [10, 14, 99].into_iter().collect();
        let walks = Walks::read(&indexed, Some(NodeWindow::between(10, 99)), Some(&nodes), &no_samples())?;
        let ids: Vec<u64> = walks.iter().map(|(node, _)| node).collect();
        assert_eq!(ids, vec![10, 14]);
        Ok(())
    }

    #[test]
    fn test_indexed_and_scan_agree_on_large_node_ids() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let lines = numbered_side_lines(1_000_000, 2000);
        let indexed = dir.path().join("large.walk.gz");
        let index = write_indexed_side_file(&indexed, &lines)?;
        let plain = write_file(dir.path(), "large.walk", &(lines.join("\n") + "\n"))?;
        let exclude: HashSet<String> = ["GRCh38".to_string()].into_iter().collect();

        for (window, expected) in [
            (NodeWindow::between(1_000_010, 1_000_500), 491),
            (NodeWindow::between(1_000_000, 1_000_000), 1),
            (NodeWindow::between(1_001_999, 1_005_000), 1),
            (NodeWindow::new(None, Some(1_000_099)), 100),
            (NodeWindow::new(Some(1_001_900), None), 100),
        ] {
            let from_index = Walks::read_indexed(&indexed, &index, Some(window), None, &exclude)?;
            let from_scan = Walks::read_scan(&plain, Some(window), None, &exclude)?;
            assert_eq!(from_index.len(), expected, "window {}", window);
            assert_eq!(from_index, from_scan, "window {}", window);
        }
        Ok(())
    }

    #[test]
    fn test_indexed_and_scan_agree_with_node_set() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let lines = numbered_side_lines(1_000_000, 2000);
        let indexed = dir.path().join("large.walk.gz");
        let index = write_indexed_side_file(&indexed, &lines)?;
        let plain = write_file(dir.path(), "large.walk", &(lines.join("\n") + "\n"))?;

        // Every 17th node inside the window, plus ids outside it and past the end.
        let window = Some(NodeWindow::between(1_000_100, 1_001_500));
        let mut nodes: HashSet<u64> = (1_000_100..=1_001_500).step_by(17).collect();
        nodes.extend([1_000_050, 1_001_600, 2_000_000]);
        let exclude: HashSet<String> = ["HG3".to_string()].into_iter().collect();

        let from_index = Walks::read_indexed(&indexed, &index, window, Some(&nodes), &exclude)?;
        let from_scan = Walks::read_scan(&plain, window, Some(&nodes), &exclude)?;
        assert_eq!(from_index, from_scan);
        assert_eq!(from_index.len(), (1_000_100..=1_001_500).step_by(17).count());
        assert!(from_index.iter().all(|(node, _)| nodes.contains(&node)));

        let dispatched = Walks::read(&indexed, window, Some(&nodes), &exclude)?;
        assert_eq!(dispatched, from_scan);

        // Repeated traversal is kept by the indexed path.
        let counts = from_index.get(1_000_185).unwrap();
        assert_eq!(counts[&Haplotype::new("HG1", 2)], 2);
        Ok(())
    }

    #[test]
    fn test_corrupt_index_falls_back_to_scan() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let indexed = dir.path().join("graph.walk.gz");
        let index = write_indexed_side_file(&indexed, &SIDE_LINES)?;
        std::fs::write(&index, b"not an index")?;

        let window = Some(NodeWindow::between(10, 14));
        let walks = Walks::read(&indexed, window, None, &no_samples())?;
        assert_eq!(walks.len(), SIDE_LINES.len());
        Ok(())
    }

    #[test]
    fn test_extract_walks_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let graph = write_file(dir.path(), "basic.gfa", BASIC_GFA)?;

        let output = extract_walks(&graph, None)?;
        assert_eq!(output, dir.path().join("basic.walk"));
        assert_eq!(std::fs::read_to_string(&output)?, BASIC_WALK);

        let walks = Walks::read(&output, None, None, &no_samples())?;
        assert_eq!(walks.len(), 2);
        assert_eq!(walks.get(2).unwrap().len(), 3);
        Ok(())
    }

    #[test]
    fn test_extract_walks_strips_gz_output_suffix() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let graph = write_file(dir.path(), "basic.gfa", BASIC_GFA)?;
        let requested = dir.path().join("custom.walk.gz");
        let output = extract_walks(&graph, Some(&requested))?;
        assert_eq!(output, dir.path().join("custom.walk"));
        assert!(!requested.exists());
        Ok(())
    }

    #[test]
    fn test_extract_walks_repeats_multiple_visits() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let graph = write_file(
            dir.path(),
            "loop.gfa",
            "S\t1\tAC\nS\t2\tACGT\nS\t3\tA\nW\tHG1\t1\tchr1\t0\t8\t>1>2>1\n",
        )?;
        let output = extract_walks(&graph, None)?;
        assert_eq!(
            std::fs::read_to_string(output)?,
            "1\tHG1:1\tHG1:1\n2\tHG1:1\n3\n"
        );
        Ok(())
    }

    #[test]
    fn test_extract_walks_requires_numeric_ids() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let graph = write_file(dir.path(), "named.gfa", "S\tn1\tAC\n")?;
        assert!(extract_walks(&graph, None).is_err());
        Ok(())
    }
}
