//! Encode command implementation.

use revsync_codec::{encode_revision, RevisionId};
use std::io::Write;

/// Writes one `number<TAB>encoded` line per value.
pub fn run<W: Write>(out: &mut W, values: &[u64]) -> Result<(), Box<dyn std::error::Error>> {
    for &value in values {
        writeln!(out, "{}\t{}", value, encode_revision(RevisionId::new(value)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_each_value() {
        let mut out = Vec::new();
        run(&mut out, &[0, 1, 64]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0\t\n1\t_\n64\t_-\n");
    }
}
