//! Compare command implementation.

use super::{load_tree, OutputFormat};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// A leaf that differs between two trees.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LeafDifference {
    /// Leaf index.
    pub leaf: usize,
    /// Document count on our side.
    pub ours: u64,
    /// Document count on their side.
    pub theirs: u64,
}

/// Runs the compare command.
///
/// Fails when the two trees do not partition the revision space the same
/// way, since their leaves cannot be compared.
pub fn run<W: Write>(
    out: &mut W,
    ours: &Path,
    theirs: &Path,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::parse(format)?;
    let our_tree = load_tree(ours)?;
    let their_tree = load_tree(theirs)?;

    let differences: Vec<LeafDifference> = our_tree
        .differing_leaves(&their_tree)?
        .into_iter()
        .map(|leaf| LeafDifference {
            leaf,
            ours: our_tree.nodes()[leaf].count(),
            theirs: their_tree.nodes()[leaf].count(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&differences)?)?;
        }
        OutputFormat::Text if differences.is_empty() => {
            writeln!(out, "Trees match ({} leaves)", our_tree.leaf_count())?;
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "{} of {} leaves differ",
                differences.len(),
                our_tree.leaf_count()
            )?;
            for diff in &differences {
                writeln!(
                    out,
                    "  leaf {:>5}: {} vs {} documents",
                    diff.leaf, diff.ours, diff.theirs
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{dump, tree};

    #[test]
    fn lists_differing_leaves() {
        let a = dump(&tree(&[("a", 1), ("b", 2), ("c", 0), ("d", 4)]));
        let b = dump(&tree(&[("a", 1), ("x", 3), ("c", 0), ("y", 4)]));

        let mut out = Vec::new();
        run(&mut out, a.path(), b.path(), "json").unwrap();
        let diffs: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            diffs,
            serde_json::json!([
                {"leaf": 1, "ours": 2, "theirs": 3},
                {"leaf": 3, "ours": 4, "theirs": 4}
            ])
        );

        let mut out = Vec::new();
        run(&mut out, a.path(), b.path(), "text").unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("2 of 4 leaves differ"));
    }

    #[test]
    fn identical_trees_match() {
        let a = dump(&tree(&[("a", 1), ("b", 2)]));
        let mut out = Vec::new();
        run(&mut out, a.path(), a.path(), "text").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Trees match (2 leaves)\n");
    }

    #[test]
    fn incompatible_trees_fail() {
        let a = dump(&tree(&[("a", 1), ("b", 2)]));
        let b = dump(&tree(&[("a", 1)]));
        assert!(run(&mut Vec::new(), a.path(), b.path(), "text").is_err());
    }
}
