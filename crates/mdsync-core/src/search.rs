//! Search index over the live document and its highlight decorations.
//!
//! Matching is case-insensitive and done per text node, so a match never
//! spans two nodes (e.g. across a bold boundary). Every start position is
//! recorded, including overlapping ones: after a hit at `i` the scan resumes
//! at `i + 1`, so `"aa"` occurs three times in `"aaaa"`.

use regex_lite::RegexBuilder;

use crate::engine::{Decoration, DecorationSet, HighlightClass};
use crate::types::{Range, TextNode};

/// Fold a char to lowercase without changing the char count.
///
/// Chars whose lowercase form is more than one char (e.g. `'İ'`) are left
/// as they are, which keeps offsets in the folded text identical to offsets
/// in the document.
pub fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn fold(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

/// Match start positions for the current search text, in engine coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    /// Absolute match starts, ascending.
    positions: Vec<usize>,
    /// Match length in chars.
    match_len: usize,
}

impl SearchIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan text nodes for every case-insensitive occurrence of `needle`.
    pub fn build(nodes: &[TextNode], needle: &str) -> Self {
        let needle = fold(needle);
        if needle.is_empty() {
            return Self::empty();
        }

        let mut positions = Vec::new();
        for node in nodes {
            let hay = fold(&node.text);
            if hay.len() < needle.len() {
                continue;
            }
            positions.extend(
                hay.windows(needle.len())
                    .enumerate()
                    .filter(|(_, window)| *window == needle.as_slice())
                    .map(|(i, _)| node.pos + i),
            );
        }
        // Nodes arrive in document order; sort anyway so a misbehaving engine
        // can't break navigation.
        positions.sort_unstable();

        tracing::trace!(
            target: "mdsync::search",
            nodes = nodes.len(),
            matches = positions.len(),
            "index built"
        );

        Self {
            positions,
            match_len: needle.len(),
        }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn match_len(&self) -> usize {
        self.match_len
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Document range of match `index` (0-based).
    pub fn range(&self, index: usize) -> Option<Range> {
        self.positions
            .get(index)
            .map(|&pos| Range::new(pos, pos + self.match_len))
    }

    /// Highlight every match, marking `current` (0-based) distinctly.
    pub fn decorations(&self, current: usize) -> DecorationSet {
        let decorations = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, &pos)| Decoration {
                range: Range::new(pos, pos + self.match_len),
                class: if i == current {
                    HighlightClass::CurrentMatch
                } else {
                    HighlightClass::Match
                },
            })
            .collect();
        DecorationSet { decorations }
    }
}

/// Count case-insensitive, non-overlapping literal occurrences of `needle`
/// in plain text.
///
/// Used when the live document can't be queried: the count is coarse (it
/// runs over markdown, syntax included) and carries no positions.
pub fn count_plain_matches(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    match RegexBuilder::new(&regex_lite::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.find_iter(text).count(),
        Err(e) => {
            tracing::debug!(target: "mdsync::search", error = %e, "fallback pattern rejected");
            0
        }
    }
}
