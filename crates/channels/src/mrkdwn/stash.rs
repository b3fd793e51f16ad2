//! Protected spans.
//!
//! A protected span is cut out of the working text and replaced by a
//! placeholder `U+E000 <index> U+E001`. Rewrite stages only ever see the
//! placeholder, so nothing inside a span can be matched, and no pattern can
//! match across part of one. `restore` puts the original bytes back.

use regex_lite::{Captures, Regex};
use std::sync::LazyLock;

/// Opens a placeholder.
pub(super) const OPEN: char = '\u{E000}';
/// Closes a placeholder.
pub(super) const CLOSE: char = '\u{E001}';

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("{OPEN}([0-9]+){CLOSE}")).expect("placeholder pattern is valid")
});

/// Raw text of every protected span, addressed by placeholder index.
#[derive(Debug, Default)]
pub(super) struct Stash {
    spans: Vec<String>,
}

impl Stash {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Protect `raw` and return the placeholder that stands in for it.
    ///
    /// Placeholders already inside `raw` are resolved first, so every stored
    /// span is final text and `restore` never has to recurse.
    pub(super) fn put(&mut self, raw: &str) -> String {
        let resolved = self.restore(raw);
        self.spans.push(resolved);
        placeholder(self.spans.len() - 1)
    }

    /// Replace every placeholder in `text` with the span it stands for.
    pub(super) fn restore(&self, text: &str) -> String {
        if self.spans.is_empty() || !text.contains(OPEN) {
            return text.to_string();
        }
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.spans.get(i))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.spans.len()
    }
}

pub(super) fn placeholder(index: usize) -> String {
    format!("{OPEN}{index}{CLOSE}")
}
