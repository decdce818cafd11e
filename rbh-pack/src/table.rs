//! Mapping tables
//!
//! `GenomeRefMap` is the genome <-> reference partial bijection built by the
//! mapper and read by every later stage. `CanonicalTable` rewrites short
//! candidate ids into their canonical taxonomic form.

use hashbrown::{HashMap, HashSet};

use std::fmt;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use config::{write_atomically, MAP_FIELDS, MIN_CANONICAL_FIELDS, MIN_MAP_FIELDS};

use crate::ident::{CanonicalId, FullId, ShortId, TruncId};
use crate::PackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    KeyTaken,
    ValueTaken,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::KeyTaken => write!(f, "key already mapped"),
            Conflict::ValueTaken => write!(f, "value already mapped"),
        }
    }
}

/// One-to-one map queried in both directions before every insertion
#[derive(Debug, Clone)]
pub struct Bijection<K, V> {
    forward: HashMap<K, V>,
    reverse: HashMap<V, K>,
}

impl<K, V> Default for Bijection<K, V> {
    fn default() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }
}

impl<K, V> Bijection<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// insert a pair only if neither side is already consumed
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(), Conflict> {
        if self.forward.contains_key(&key) {
            return Err(Conflict::KeyTaken);
        }
        if self.reverse.contains_key(&value) {
            return Err(Conflict::ValueTaken);
        }

        self.reverse.insert(value.clone(), key.clone());
        self.forward.insert(key, value);
        Ok(())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.forward.contains_key(key)
    }

    pub fn contains_value<Q>(&self, value: &Q) -> bool
    where
        V: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.reverse.contains_key(value)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.forward.get(key)
    }

    pub fn get_by_value<Q>(&self, value: &Q) -> Option<&K>
    where
        V: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.reverse.get(value)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.forward.iter()
    }
}

/// genome id -> (truncated reference header, full reference header)
#[derive(Debug, Clone, Default)]
pub struct GenomeRefMap {
    pairs: Bijection<ShortId, FullId>,
    truncated: HashMap<FullId, TruncId>,
    by_truncated: HashMap<TruncId, FullId>,
}

impl GenomeRefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        genome: ShortId,
        truncated: TruncId,
        full: FullId,
    ) -> Result<(), Conflict> {
        if self.by_truncated.contains_key(&truncated) {
            return Err(Conflict::ValueTaken);
        }

        self.pairs.try_insert(genome, full.clone())?;
        self.by_truncated.insert(truncated.clone(), full.clone());
        self.truncated.insert(full, truncated);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains_genome(&self, genome: &str) -> bool {
        self.pairs.contains_key(genome)
    }

    pub fn is_reference_consumed(&self, full: &str) -> bool {
        self.pairs.contains_value(full)
    }

    /// (truncated, full) reference headers mapped to a genome id
    pub fn get(&self, genome: &str) -> Option<(&TruncId, &FullId)> {
        let full = self.pairs.get(genome)?;
        let truncated = self.truncated.get(full.as_str())?;
        Some((truncated, full))
    }

    /// genome id behind a reference header given in full or truncated form
    pub fn resolve_reference(&self, header: &str) -> Option<&ShortId> {
        if let Some(genome) = self.pairs.get_by_value(header) {
            return Some(genome);
        }

        let full = self.by_truncated.get(header)?;
        self.pairs.get_by_value(full.as_str())
    }

    /// every identifier a mapped reference sequence may show up under
    pub fn reference_variants(&self) -> HashSet<String> {
        let mut variants = HashSet::with_capacity(self.len() * 3);
        for (genome, full) in self.pairs.iter() {
            variants.insert(genome.to_string());
            variants.insert(full.to_string());
            if let Some(truncated) = self.truncated.get(full.as_str()) {
                variants.insert(truncated.to_string());
            }
        }
        variants
    }

    /// entries sorted by genome id
    pub fn sorted(&self) -> Vec<(&ShortId, &TruncId, &FullId)> {
        let mut entries: Vec<_> = self
            .pairs
            .iter()
            .filter_map(|(genome, full)| {
                self.truncated
                    .get(full.as_str())
                    .map(|truncated| (genome, truncated, full))
            })
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Read a mapping table, re-validating the one-to-one invariant
    ///
    /// Accepts `genome\ttruncated\tfull` rows and the legacy
    /// `genome\treference` layout, where the reference header stands for
    /// both columns.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, PackError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let reader = BufReader::new(File::open(path)?);

        let mut map = Self::new();
        let mut legacy = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < MIN_MAP_FIELDS
                || fields.iter().take(MIN_MAP_FIELDS).any(|f| f.is_empty())
            {
                return Err(PackError::MissingFields {
                    path: label,
                    line: idx + 1,
                    min: MIN_MAP_FIELDS,
                    found: fields.iter().filter(|f| !f.is_empty()).count(),
                });
            }

            let (genome, truncated, full) = if fields.len() >= MAP_FIELDS {
                (fields[0], fields[1], fields[2])
            } else {
                legacy += 1;
                (fields[0], fields[1], fields[1])
            };

            map.insert(ShortId::new(genome), TruncId::new(truncated), FullId::new(full))
                .map_err(|conflict| PackError::NotBijective {
                    path: label.clone(),
                    line: idx + 1,
                    key: genome.to_string(),
                    reason: conflict.to_string(),
                })?;
        }

        if legacy > 0 {
            log::warn!(
                "WARN: {} uses the legacy 2-column layout in {} rows; truncated and full headers are assumed equal",
                label,
                legacy
            );
        }

        Ok(map)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let entries = self.sorted();
        write_atomically(path, |w| {
            for (genome, truncated, full) in entries {
                writeln!(w, "{}\t{}\t{}", genome, truncated, full)?;
            }
            Ok(())
        })
    }
}

/// short candidate id -> canonical taxonomic id
#[derive(Debug, Clone, Default)]
pub struct CanonicalTable {
    inner: HashMap<ShortId, CanonicalId>,
}

impl CanonicalTable {
    /// Read `short_id\tcanonical_id` rows
    ///
    /// # Returns
    ///
    /// The table and the number of malformed rows that were skipped
    pub fn read<P: AsRef<Path>>(path: P) -> Result<(Self, usize), PackError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);

        let mut inner = HashMap::new();
        let mut skipped = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.len() < MIN_CANONICAL_FIELDS || fields[0].is_empty() || fields[1].is_empty()
            {
                log::warn!(
                    "WARN: {}:{}: skipping malformed row {:?}",
                    path.display(),
                    idx + 1,
                    line
                );
                skipped += 1;
                continue;
            }

            inner.insert(ShortId::new(fields[0]), CanonicalId::new(fields[1]));
        }

        Ok((Self { inner }, skipped))
    }

    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            inner: pairs
                .into_iter()
                .map(|(short, canonical)| (ShortId::new(short), CanonicalId::new(canonical)))
                .collect(),
        }
    }

    pub fn resolve(&self, short: &str) -> Option<&CanonicalId> {
        self.inner.get(short)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bijection_rejects_both_sides() {
        let mut bij: Bijection<String, String> = Bijection::new();
        assert!(bij.try_insert("G7".into(), "rgs3-human-x-1".into()).is_ok());
        assert_eq!(
            bij.try_insert("G7".into(), "rgs3-human-x-2".into()),
            Err(Conflict::KeyTaken)
        );
        assert_eq!(
            bij.try_insert("G8".into(), "rgs3-human-x-1".into()),
            Err(Conflict::ValueTaken)
        );
        assert_eq!(bij.len(), 1);
        assert_eq!(bij.get_by_value("rgs3-human-x-1").map(String::as_str), Some("G7"));
    }

    #[test]
    fn test_genome_map_round_trip_and_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.tsv");

        let mut map = GenomeRefMap::new();
        map.insert(
            ShortId::new("Homo_sapiens-2"),
            TruncId::new("rgs2-human-x-long_001"),
            FullId::new("rgs2-human-x-long-header"),
        )
        .unwrap();
        map.insert(
            ShortId::new("Homo_sapiens-1"),
            TruncId::new("rgs2-human-x-1"),
            FullId::new("rgs2-human-x-1"),
        )
        .unwrap();
        map.write(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Homo_sapiens-1\t"));

        let back = GenomeRefMap::read(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(
            back.resolve_reference("rgs2-human-x-long_001").map(|g| g.as_str()),
            Some("Homo_sapiens-2")
        );
        assert_eq!(
            back.resolve_reference("rgs2-human-x-long-header").map(|g| g.as_str()),
            Some("Homo_sapiens-2")
        );

        let variants = back.reference_variants();
        assert_eq!(variants.len(), 5);
        assert!(variants.contains("Homo_sapiens-1"));
    }

    #[test]
    fn test_genome_map_reads_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.tsv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "G1\trgs1-human-x-1").unwrap();

        let map = GenomeRefMap::read(&path).unwrap();
        let (truncated, full) = map.get("G1").unwrap();
        assert_eq!(truncated.as_str(), full.as_str());
    }

    #[test]
    fn test_genome_map_rejects_duplicates_and_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let dup = dir.path().join("dup.tsv");
        let mut f = File::create(&dup).unwrap();
        writeln!(f, "G1\tr1\tr1\nG2\tr1\tr1").unwrap();
        assert!(matches!(
            GenomeRefMap::read(&dup),
            Err(PackError::NotBijective { line: 2, .. })
        ));

        let short = dir.path().join("short.tsv");
        let mut f = File::create(&short).unwrap();
        writeln!(f, "G1").unwrap();
        assert!(matches!(
            GenomeRefMap::read(&short),
            Err(PackError::MissingFields { .. })
        ));
    }

    #[test]
    fn test_canonical_table_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canon.tsv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Homo_sapiens-1\tg_A-t_1-p_2-n_Metazoa_Homo_sapiens\nbroken\n\nX-2\tcanon").unwrap();

        let (table, skipped) = CanonicalTable::read(&path).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("X-2").map(|c| c.as_str()), Some("canon"));
        assert!(table.resolve("missing").is_none());
    }
}
