//! Venue identity and canonical display names.
//!
//! Every booking site identifies a venue by a path or slug. [`Venue::new`]
//! resolves that path to a canonical name once, and the name is never
//! recomputed afterwards: query filters, distance lookups and notifications
//! all compare against the stored spelling.

use serde::{Deserialize, Serialize};

use super::DataSource;

/// Paths whose slug does not compress to a sensible name.
const NAME_OVERRIDES: &[(&str, &str)] = &[
    ("hackney-parks/tennis-court-outdoor", "HaggerstonPark"),
    ("britannia-leisure-centre/tennis-court-outdoor", "ShoreditchPark"),
    (
        "islington-tennis-centre/tennis-court-outdoor",
        "IslingtonTennisCentreOutdoor",
    ),
    (
        "islington-tennis-centre/tennis-court-indoor",
        "IslingtonTennisCentreIndoor",
    ),
];

/// A physical location as known to one data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Venue {
    path: String,
    data_source: DataSource,
    name: String,
}

impl Venue {
    /// Creates a venue, resolving its canonical name from `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, data_source: DataSource) -> Self {
        let path = path.into();
        let name = resolve_name(&path);
        Self {
            path,
            data_source,
            name,
        }
    }

    /// Rebuilds a venue from a stored row without re-resolving the name.
    #[must_use]
    pub fn from_stored(path: String, data_source: DataSource, name: String) -> Self {
        Self {
            path,
            data_source,
            name,
        }
    }

    /// Source-specific path or slug.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Booking backend this venue belongs to.
    #[must_use]
    pub const fn data_source(&self) -> DataSource {
        self.data_source
    }

    /// Canonical display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.data_source)
    }
}

/// Maps a venue path to its canonical display name.
///
/// Overrides win. Otherwise the last path segment is split on hyphens,
/// title-cased word by word and joined without spaces, so
/// `"foo-bar-baz"` becomes `"FooBarBaz"`.
#[must_use]
pub fn resolve_name(path: &str) -> String {
    if let Some((_, name)) = NAME_OVERRIDES.iter().find(|(p, _)| *p == path) {
        return (*name).to_string();
    }

    let segment = path.rsplit('/').next().unwrap_or_default();
    title_case(&segment.replace('-', " ")).replace(' ', "")
}

/// Upper-cases the first letter of every run of letters and lower-cases
/// the rest. Digits and punctuation start a new run.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
