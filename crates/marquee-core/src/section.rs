use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// An optional enrichment category that can be appended to a movie detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Genres,
    Companies,
    Credits,
}

impl Section {
    /// Returns the request tag for this section.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Genres => "genres",
            Section::Companies => "companies",
            Section::Credits => "credits",
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag does not name a known section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSection(pub String);

impl FromStr for Section {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "genres" => Ok(Section::Genres),
            "companies" => Ok(Section::Companies),
            "credits" => Ok(Section::Credits),
            other => Err(UnknownSection(other.to_string())),
        }
    }
}

/// The set of sections requested for a single detail lookup.
///
/// Duplicate tags collapse and unknown tags are dropped, so a request built
/// from `["genres", "genres", "bogus"]` is the same as one built from
/// `["genres"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionRequest {
    sections: BTreeSet<Section>,
}

impl SectionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a request from raw tags, ignoring anything unrecognised.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sections = tags
            .into_iter()
            .filter_map(|tag| tag.as_ref().trim().parse::<Section>().ok())
            .collect();
        Self { sections }
    }

    pub fn with(mut self, section: Section) -> Self {
        self.sections.insert(section);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Section> + '_ {
        self.sections.iter().copied()
    }
}

impl FromIterator<Section> for SectionRequest {
    fn from_iter<T: IntoIterator<Item = Section>>(iter: T) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

impl Display for SectionRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, section) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(section.as_str())?;
        }
        Ok(())
    }
}
