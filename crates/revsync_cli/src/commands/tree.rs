//! Tree command implementation.

use super::{load_tree, OutputFormat};
use revsync_protocol::RevisionTree;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Summary of a revision tree dump.
#[derive(Debug, Serialize)]
pub struct TreeSummary {
    /// Tree format version.
    pub version: u32,
    /// Tree depth.
    pub max_depth: u32,
    /// Lowest covered revision, encoded.
    pub range_min: String,
    /// Highest covered revision, encoded.
    pub range_max: String,
    /// Number of leaves.
    pub leaves: usize,
    /// Leaves holding at least one document.
    pub populated_leaves: usize,
    /// Total document count.
    pub documents: u64,
}

impl TreeSummary {
    /// Summarizes a tree.
    pub fn of(tree: &RevisionTree) -> Self {
        Self {
            version: tree.version(),
            max_depth: tree.max_depth(),
            range_min: tree.range_min().encode(),
            range_max: tree.range_max().encode(),
            leaves: tree.leaf_count(),
            populated_leaves: tree.nodes().iter().filter(|n| n.count() > 0).count(),
            documents: tree.document_count(),
        }
    }
}

/// Runs the tree command.
pub fn run<W: Write>(
    out: &mut W,
    path: &Path,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::parse(format)?;
    let tree = load_tree(path)?;
    let summary = TreeSummary::of(&tree);

    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
        OutputFormat::Text => {
            writeln!(out, "Revision Tree: {}", path.display())?;
            writeln!(out, "  Version:   {}", summary.version)?;
            writeln!(out, "  Depth:     {}", summary.max_depth)?;
            writeln!(
                out,
                "  Range:     {} ({}) .. {} ({})",
                summary.range_min,
                tree.range_min().get(),
                summary.range_max,
                tree.range_max().get()
            )?;
            writeln!(
                out,
                "  Leaves:    {} ({} populated)",
                summary.leaves, summary.populated_leaves
            )?;
            writeln!(out, "  Documents: {}", summary.documents)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{dump, tree};

    #[test]
    fn text_summary() {
        let file = dump(&tree(&[("a", 2), ("b", 0), ("c", 5), ("d", 0)]));
        let mut out = Vec::new();
        run(&mut out, file.path(), "text").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Leaves:    4 (2 populated)"));
        assert!(text.contains("Documents: 7"));
        assert!(text.contains("Range:     _ (1) .. _-- (4096)"));
    }

    #[test]
    fn json_summary() {
        let file = dump(&tree(&[("a", 1), ("b", 1)]));
        let mut out = Vec::new();
        run(&mut out, file.path(), "json").unwrap();
        let summary: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(summary["documents"], 2);
        assert_eq!(summary["range_min"], "_");
    }

    #[test]
    fn rejects_unknown_format_and_bad_file() {
        let file = dump(&tree(&[]));
        assert!(run(&mut Vec::new(), file.path(), "yaml").is_err());

        let garbage = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(garbage.path(), "not json").unwrap();
        let err = run(&mut Vec::new(), garbage.path(), "text").unwrap_err();
        assert!(err.to_string().contains("is not a revision tree"));
    }
}
