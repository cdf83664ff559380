//! Text substitution for find/replace.
//!
//! Replacement works on the markdown cache, not on the document tree: the
//! new text is computed here and the caller re-parses it and swaps the whole
//! document. Matching is literal and case-sensitive, and the replacement is
//! inserted verbatim.

use regex_lite::{NoExpand, Regex};

/// Replace the first occurrence of `find`. None if nothing changed.
pub fn replace_first(text: &str, find: &str, replacement: &str) -> Option<String> {
    if find.is_empty() || !text.contains(find) {
        return None;
    }
    let out = text.replacen(find, replacement, 1);
    (out != text).then_some(out)
}

/// Replace every non-overlapping occurrence of `find`. None if nothing changed.
pub fn replace_every(text: &str, find: &str, replacement: &str) -> Option<String> {
    if find.is_empty() {
        return None;
    }
    let re = match Regex::new(&regex_lite::escape(find)) {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!(target: "mdsync::replace", error = %e, "replace pattern rejected");
            return None;
        }
    };
    let out = re.replace_all(text, NoExpand(replacement));
    (out != text).then(|| out.into_owned())
}
