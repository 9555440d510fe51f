//! Section Structurer: heuristic classification of CV lines into named sections.
//!
//! A line that starts with a heading keyword moves the cursor to that section;
//! every non-blank line (heading lines included) is appended to the section
//! under the cursor. First keyword wins, no backtracking. The serialized form
//! feeds the analysis prompt, so the section order is fixed.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(name|contact|experience|skills|education|languages)")
        .expect("heading pattern is valid")
});

/// Fixed section set, declared in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Section {
    Name,
    Contact,
    Experience,
    Skills,
    Education,
    Languages,
    Other,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Name,
        Section::Contact,
        Section::Experience,
        Section::Skills,
        Section::Education,
        Section::Languages,
        Section::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Name => "Name",
            Section::Contact => "Contact",
            Section::Experience => "Experience",
            Section::Skills => "Skills",
            Section::Education => "Education",
            Section::Languages => "Languages",
            Section::Other => "Other",
        }
    }

    /// The heading section a line opens, if any.
    fn heading_of(line: &str) -> Option<Section> {
        let matched = HEADING.captures(line)?.get(1)?.as_str().to_ascii_lowercase();
        Section::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(&matched))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// CV text grouped by section. Immutable once built by [`structure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredCv {
    sections: BTreeMap<Section, String>,
}

impl StructuredCv {
    /// Trimmed content of a section, `None` when the section is empty.
    pub fn section(&self, section: Section) -> Option<&str> {
        self.sections
            .get(&section)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Non-empty sections in canonical order.
    pub fn sections(&self) -> impl Iterator<Item = (Section, &str)> {
        Section::ALL
            .into_iter()
            .filter_map(|s| self.section(s).map(|content| (s, content)))
    }

    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }
}

/// Serializes as a map of non-empty sections, trimmed, in canonical order.
impl Serialize for StructuredCv {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (section, content) in self.sections() {
            map.serialize_entry(section.label(), content)?;
        }
        map.end()
    }
}

/// `"<Section>: <content>"` per non-empty section, newline separated.
impl fmt::Display for StructuredCv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (section, content) in self.sections() {
            if !first {
                f.write_str("\n")?;
            }
            write!(f, "{section}: {content}")?;
            first = false;
        }
        Ok(())
    }
}

pub fn structure(text: &str) -> StructuredCv {
    let mut sections: BTreeMap<Section, String> = BTreeMap::new();
    let mut current = Section::Other;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(heading) = Section::heading_of(line) {
            current = heading;
        }
        let buffer = sections.entry(current).or_default();
        buffer.push_str(line);
        buffer.push('\n');
    }

    StructuredCv { sections }
}
