//! Typed identifiers
//!
//! A sequence identifier changes shape several times along the pipeline:
//! the full reference header is cut down for the search engine, genome
//! sequences carry short internal ids and the final output uses the
//! canonical taxonomic id. Each shape is a distinct type here; moving from
//! one to another goes through a table (`TruncationTable`, `GenomeRefMap`,
//! `CanonicalTable`) instead of string slicing at each stage.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;

use config::{RGS_MIN_FIELDS, RGS_PREFIX, RGS_SEP};
use hashbrown::{HashMap, HashSet};

/// full-length header, unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Full;

/// length-bounded header, collision-free within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Truncated;

/// internal candidate/genome id (e.g. Homo_sapiens-00372)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Short;

/// full taxonomic id used in the final output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Canonical;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<R> {
    raw: String,
    repr: PhantomData<R>,
}

pub type FullId = Id<Full>;
pub type TruncId = Id<Truncated>;
pub type ShortId = Id<Short>;
pub type CanonicalId = Id<Canonical>;

impl<R> Id<R> {
    pub fn new<S: Into<String>>(raw: S) -> Self {
        Self {
            raw: raw.into(),
            repr: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl<R> Borrow<str> for Id<R> {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl<R> AsRef<str> for Id<R> {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl<R> fmt::Display for Id<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parsed reference-set header: rgsN-species-source-identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgsHeader {
    pub count: usize,
    pub species: String,
    pub source: String,
    pub identifier: String,
}

impl RgsHeader {
    /// Parse a reference-set header
    ///
    /// # Arguments
    ///
    /// * `header` - header without the leading '>'
    ///
    /// # Returns
    ///
    /// None when the header does not follow rgsN-species-source-identifier.
    /// The identifier keeps any further dashes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rbhpack::RgsHeader;
    ///
    /// let header = RgsHeader::parse("rgs3-human-hgnc-NR0B2-like").unwrap();
    /// assert_eq!(header.count, 3);
    /// assert_eq!(header.species, "human");
    /// assert_eq!(header.identifier, "NR0B2-like");
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        let fields: Vec<&str> = header.splitn(RGS_MIN_FIELDS, RGS_SEP).collect();
        if fields.len() < RGS_MIN_FIELDS {
            return None;
        }

        let count = rgs_count(fields[0])?;

        Some(Self {
            count,
            species: fields[1].to_string(),
            source: fields[2].to_string(),
            identifier: fields[3].to_string(),
        })
    }

    pub fn is_reference(header: &str) -> bool {
        Self::parse(header).is_some()
    }
}

fn rgs_count(field: &str) -> Option<usize> {
    let digits = field.strip_prefix(RGS_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Species tag of a hit identifier, parsed once per identifier
///
/// The tag is the second dash field, lower-cased: `rgs3-human-x-1` ->
/// `human`, `rgs3-Mus_musculus-x-1` -> `mus_musculus`. Genome ids such as
/// `Homo_sapiens-00372` yield their numeric field and never name a species.
pub fn species_field(id: &str) -> Option<String> {
    let field = id.split(RGS_SEP).nth(1)?;

    if field.is_empty() {
        return None;
    }
    Some(field.to_lowercase())
}

/// Check the reference-set invariants and return every violation found
///
/// - every header parses as rgsN-species-source-identifier
/// - all headers share the same N
/// - N equals the number of sequences
/// - no header is repeated
pub fn validate_reference_set<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut counts = HashSet::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (idx, header) in headers.iter().enumerate() {
        let header = header.as_ref();
        match RgsHeader::parse(header) {
            Some(rgs) => {
                counts.insert(rgs.count);
            }
            None => issues.push(format!(
                "record {}: invalid reference header {:?}, expected rgsN-species-source-identifier",
                idx + 1,
                header
            )),
        }
        *seen.entry(header).or_default() += 1;
    }

    match counts.len() {
        0 => {}
        1 => {
            let declared = counts.iter().next().copied().unwrap_or_default();
            if declared != headers.len() {
                issues.push(format!(
                    "sequence count mismatch: headers say rgs{}, but the set has {} sequences",
                    declared,
                    headers.len()
                ));
            }
        }
        _ => {
            let mut counts: Vec<_> = counts.into_iter().collect();
            counts.sort_unstable();
            issues.push(format!(
                "inconsistent sequence counts in headers: {:?}",
                counts
            ));
        }
    }

    let mut duplicates: Vec<_> = seen
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(h, _)| h)
        .collect();
    duplicates.sort_unstable();
    for dup in duplicates {
        issues.push(format!("duplicated reference header {:?}", dup));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgs_header_parse() {
        let rgs = RgsHeader::parse("rgs48-human-hgncgg-2068_NR0B2").unwrap();
        assert_eq!(rgs.count, 48);
        assert_eq!(rgs.species, "human");
        assert_eq!(rgs.source, "hgncgg");
        assert_eq!(rgs.identifier, "2068_NR0B2");

        assert!(RgsHeader::parse("rgs-human-x-1").is_none());
        assert!(RgsHeader::parse("rgsX-human-x-1").is_none());
        assert!(RgsHeader::parse("rgs3-human-x").is_none());
        assert!(RgsHeader::parse("Homo_sapiens-00372").is_none());
    }

    #[test]
    fn test_species_field_layouts() {
        assert_eq!(species_field("rgs3-human-x-1").as_deref(), Some("human"));
        assert_eq!(
            species_field("rgs3-Mus_musculus-x-1").as_deref(),
            Some("mus_musculus")
        );
        assert_eq!(species_field("Homo_sapiens-00372").as_deref(), Some("00372"));
        assert_eq!(species_field("lonely"), None);
        assert_eq!(species_field("a--b"), None);
    }

    #[test]
    fn test_typed_ids_borrow_as_str() {
        let mut set: HashSet<FullId> = HashSet::new();
        set.insert(FullId::new("rgs1-human-x-1"));

        assert!(set.contains("rgs1-human-x-1"));
        assert_eq!(FullId::new("abc").len(), 3);
        assert_eq!(TruncId::new("abc").to_string(), "abc");
    }

    #[test]
    fn test_validate_reference_set_ok() {
        let headers = ["rgs2-human-x-1", "rgs2-fly-x-2"];
        assert!(validate_reference_set(&headers).is_empty());
    }

    #[test]
    fn test_validate_reference_set_count_mismatch() {
        let headers = ["rgs3-human-x-1", "rgs3-fly-x-2"];
        let issues = validate_reference_set(&headers);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("count mismatch"));
    }

    #[test]
    fn test_validate_reference_set_inconsistent_and_duplicated() {
        let headers = ["rgs3-human-x-1", "rgs2-fly-x-2", "rgs3-human-x-1", "bogus"];
        let issues = validate_reference_set(&headers);

        assert!(issues.iter().any(|x| x.contains("invalid reference header")));
        assert!(issues.iter().any(|x| x.contains("inconsistent")));
        assert!(issues.iter().any(|x| x.contains("duplicated")));
    }
}
