//! Lenient `#TAG:value;` tokenizer for simfile text.
//!
//! Scanning stops silently at the first `#` that is not followed by both a
//! `:` and a later `;`. Real-world charts are frequently hand-edited and a
//! truncated tail must not make the whole file unreadable, so whatever was
//! read up to that point is returned as-is.

use rustc_hash::FxHashMap;

const NOTES_MARKER: &str = "#NOTES";

/// Tag name (case-insensitive) to every raw value seen for it, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagMap {
    tags: FxHashMap<String, Vec<String>>,
}

impl TagMap {
    /// All raw values for `name`, untrimmed.
    pub fn all(&self, name: &str) -> &[String] {
        self.tags
            .get(&name.to_ascii_uppercase())
            .map_or(&[], Vec::as_slice)
    }

    /// The first raw value for `name`, untrimmed.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.all(name).first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn push(&mut self, name: &str, value: &str) {
        self.tags
            .entry(name.to_ascii_uppercase())
            .or_default()
            .push(value.to_string());
    }
}

/// Header tags only: first value per name, trimmed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderTags {
    tags: FxHashMap<String, String>,
}

impl HeaderTags {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags.get(&name.to_ascii_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Tokenizes the whole file, keeping duplicate tags (several `#NOTES`
/// blocks, for instance) in order.
pub fn parse_all_tags(content: &str) -> TagMap {
    parse_tags(content, false)
}

/// Tokenizes up to the first `#NOTES` tag, keeping the first trimmed value
/// per tag name.
pub fn parse_header(content: &str) -> HeaderTags {
    let all = parse_tags(content, true);
    let tags = all
        .tags
        .into_iter()
        .filter_map(|(name, values)| {
            let first = values.into_iter().next()?;
            Some((name, first.trim().to_string()))
        })
        .collect();
    HeaderTags { tags }
}

fn parse_tags(content: &str, stop_at_notes: bool) -> TagMap {
    let mut out = TagMap::default();
    let mut index = 0;

    while index < content.len() {
        let Some(tag_start) = content[index..].find('#').map(|i| i + index) else {
            break;
        };
        if stop_at_notes && matches_notes_marker(&content[tag_start..]) {
            break;
        }

        let Some(colon) = content[tag_start + 1..].find(':').map(|i| i + tag_start + 1) else {
            break;
        };
        let Some(semicolon) = content[colon + 1..].find(';').map(|i| i + colon + 1) else {
            break;
        };

        let name = content[tag_start + 1..colon].trim();
        let value = &content[colon + 1..semicolon];
        if !name.is_empty() {
            out.push(name, value);
        }

        index = semicolon + 1;
    }

    out
}

#[inline(always)]
fn matches_notes_marker(rest: &str) -> bool {
    rest.len() >= NOTES_MARKER.len()
        && rest.as_bytes()[..NOTES_MARKER.len()].eq_ignore_ascii_case(NOTES_MARKER.as_bytes())
}
