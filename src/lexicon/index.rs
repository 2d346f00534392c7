//! In-memory word → IPA index built from one dataset.
//!
//! Dataset rows are `word<TAB>ipa`.  Words are case-folded, IPA fields are
//! trimmed, and repeated transcriptions of one word are grouped in first-seen
//! order.  Malformed rows are skipped and counted; they never abort a build.

use std::collections::HashMap;

/// Immutable pronunciation index.  Safe to share across tasks behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PronunciationIndex {
    entries: HashMap<String, Vec<String>>,
    skipped_rows: usize,
}

impl PronunciationIndex {
    /// Build with IPA fields kept as written (after trimming).
    pub fn build(content: &str) -> Self {
        Self::build_with(content, false)
    }

    /// Build, optionally removing the spaces between IPA segments.
    pub fn build_with(content: &str, join_segments: bool) -> Self {
        let mut index = Self::default();

        for line in content.lines() {
            // Only the terminator is stripped; tabs are column separators.
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(line, join_segments) {
                Some((word, ipa)) => index.insert(word, ipa),
                None => index.skipped_rows += 1,
            }
        }

        if index.skipped_rows > 0 {
            log::debug!(
                "pronunciation index: skipped {} malformed rows ({} words kept)",
                index.skipped_rows,
                index.entries.len()
            );
        }
        index
    }

    fn insert(&mut self, word: String, ipa: String) {
        let variants = self.entries.entry(word).or_default();
        if !variants.contains(&ipa) {
            variants.push(ipa);
        }
    }

    /// Transcriptions of `word`, in dataset order; empty when absent.
    pub fn lookup(&self, word: &str) -> &[String] {
        self.entries
            .get(&fold(word))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows dropped for having the wrong column count or an empty field.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

/// The fold applied to both dataset words and queries.
pub(crate) fn fold(word: &str) -> String {
    word.trim().to_lowercase()
}

fn parse_row(line: &str, join_segments: bool) -> Option<(String, String)> {
    let mut columns = line.split('\t');
    let word = columns.next()?;
    let ipa = columns.next()?;
    if columns.next().is_some() {
        return None;
    }

    let word = fold(word);
    let ipa = if join_segments {
        ipa.split_whitespace().collect::<String>()
    } else {
        ipa.trim().to_string()
    };

    if word.is_empty() || ipa.is_empty() {
        return None;
    }
    Some((word, ipa))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
