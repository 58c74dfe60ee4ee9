//! CLI command implementations.

pub mod compare;
pub mod decode;
pub mod encode;
pub mod tree;

use revsync_protocol::RevisionTree;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Output format of the tree commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a `--format` value.
    pub fn parse(value: &str) -> Result<Self, Box<dyn std::error::Error>> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown format '{}', expected text or json", other).into()),
        }
    }
}

/// Reads a revision tree dump, as returned by the tree endpoint.
pub fn load_tree(path: &Path) -> Result<RevisionTree, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    let tree: RevisionTree = serde_json::from_str(&text)
        .map_err(|e| format!("{} is not a revision tree: {}", path.display(), e))?;
    debug!(
        path = %path.display(),
        leaves = tree.leaf_count(),
        "loaded tree"
    );
    Ok(tree)
}

#[cfg(test)]
pub(crate) mod test_support {
    use revsync_protocol::{RevisionId, RevisionTree, RevisionTreeNode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub fn tree(leaves: &[(&str, u64)]) -> RevisionTree {
        RevisionTree::from_parts(
            1,
            2,
            RevisionId::new(1),
            RevisionId::new(4096),
            leaves
                .iter()
                .map(|(hash, count)| RevisionTreeNode::new(*hash, *count))
                .collect(),
        )
    }

    pub fn dump(tree: &RevisionTree) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(tree).unwrap().as_bytes())
            .unwrap();
        file
    }
}
