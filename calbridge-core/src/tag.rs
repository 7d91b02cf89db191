//! Provenance markers embedded in event bodies.
//!
//! A created event's body ends with a two-line tag block:
//!
//! ```text
//! [SRC: nfl-2025]
//! [ICSUID: abc1]
//! ```
//!
//! Attribution is a plain substring test on the `[SRC: …]` line. Nothing else in
//! the body is parsed, so a description that happens to contain the marker is
//! indistinguishable from a tagged event.

use std::fmt;

const SRC_OPEN: &str = "[SRC: ";
const UID_OPEN: &str = "[ICSUID: ";
const CLOSE: char = ']';

/// The `[SRC]` / `[ICSUID]` pair identifying which source created an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBlock {
    pub source_id: String,
    pub uid: String,
}

impl TagBlock {
    pub fn encode(source_id: &str, uid: &str) -> Self {
        TagBlock {
            source_id: source_id.to_string(),
            uid: uid.to_string(),
        }
    }

    /// Append this block to a description, separated by a blank line.
    /// An empty (or whitespace-only) description yields the block alone.
    pub fn attach(&self, description: &str) -> String {
        let description = description.trim();
        if description.is_empty() {
            self.to_string()
        } else {
            format!("{description}\n\n{self}")
        }
    }
}

impl fmt::Display for TagBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}{}\n{}{}{}",
            SRC_OPEN, self.source_id, CLOSE, UID_OPEN, self.uid, CLOSE
        )
    }
}

/// The exact substring that marks a body as belonging to `source_id`.
pub fn source_marker(source_id: &str) -> String {
    format!("{SRC_OPEN}{source_id}{CLOSE}")
}

/// Does this body carry the marker for `source_id`?
pub fn matches(body: &str, source_id: &str) -> bool {
    body.contains(&source_marker(source_id))
}

/// Read back the first complete tag block in a body, if any.
pub fn decode(body: &str) -> Option<TagBlock> {
    Some(TagBlock {
        source_id: marker_value(body, SRC_OPEN)?.to_string(),
        uid: uid_in(body)?.to_string(),
    })
}

/// The external uid recorded in a body's `[ICSUID: …]` marker.
pub fn uid_in(body: &str) -> Option<&str> {
    marker_value(body, UID_OPEN)
}

fn marker_value<'a>(body: &'a str, open: &str) -> Option<&'a str> {
    let start = body.find(open)? + open.len();
    let rest = &body[start..];
    // A marker ends at the first `]`; hitting a newline first means it's broken
    let end = rest.find([CLOSE, '\n'])?;
    rest[end..].starts_with(CLOSE).then(|| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_renders_two_lines() {
        let tag = TagBlock::encode("nfl-2025", "abc1");
        assert_eq!(tag.to_string(), "[SRC: nfl-2025]\n[ICSUID: abc1]");
    }

    #[test]
    fn test_attach_to_empty_description() {
        let tag = TagBlock::encode("nfl-2025", "abc1");
        assert_eq!(tag.attach(""), "[SRC: nfl-2025]\n[ICSUID: abc1]");
        assert_eq!(tag.attach("   \n "), "[SRC: nfl-2025]\n[ICSUID: abc1]");
    }

    #[test]
    fn test_attach_separates_with_blank_line() {
        let tag = TagBlock::encode("nfl-2025", "abc1");
        assert_eq!(
            tag.attach("Kickoff at noon\n"),
            "Kickoff at noon\n\n[SRC: nfl-2025]\n[ICSUID: abc1]"
        );
    }

    #[test]
    fn test_matches_is_exact_substring() {
        let body = TagBlock::encode("nfl-2025", "abc1").attach("Game day");
        assert!(matches(&body, "nfl-2025"));
        assert!(!matches(&body, "nfl-2024"));
        assert!(!matches(&body, "nfl"));
        assert!(!matches("", "nfl-2025"));
    }

    #[test]
    fn test_matches_untagged_text_containing_marker() {
        // A hand-written marker is attributed too
        assert!(matches("see [SRC: nfl-2025] for details", "nfl-2025"));
    }

    #[test]
    fn test_decode_reads_back_block() {
        let body = TagBlock::encode("lions", "uid-77@example.com").attach("notes");
        assert_eq!(decode(&body), Some(TagBlock::encode("lions", "uid-77@example.com")));
        assert_eq!(uid_in(&body), Some("uid-77@example.com"));
    }

    #[test]
    fn test_decode_without_uid_marker() {
        assert_eq!(decode("[SRC: lions]"), None);
        assert_eq!(uid_in("no markers here"), None);
        assert_eq!(uid_in("[ICSUID: unterminated"), None);
    }
}
