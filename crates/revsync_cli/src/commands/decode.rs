//! Decode command implementation.

use revsync_codec::{decode_revision, decode_revision_strict};
use std::io::Write;

/// Writes one `encoded<TAB>number` line per value.
///
/// Permissive by default, matching how revisions are read off the wire.
/// With `strict`, the first malformed value aborts the command.
pub fn run<W: Write>(
    out: &mut W,
    values: &[String],
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    for value in values {
        let revision = if strict {
            decode_revision_strict(value.as_bytes())
                .map_err(|e| format!("Invalid revision '{}': {}", value, e))?
        } else {
            decode_revision(value.as_bytes())
        };
        writeln!(out, "{}\t{}", value, revision.get())?;
    }
    Ok(())
}
