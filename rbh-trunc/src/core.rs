//! Core module for bounding identifier lengths
//!
//! Headers within the ceiling are reserved first and pass through untouched.
//! Longer headers are cut to a prefix and take the next counter for that
//! prefix that lands on no reserved or generated output. A suffixed output
//! that overruns the ceiling is cut again from a shorter prefix and reported
//! as an emergency re-cut.

use anyhow::{bail, Context, Result};
use hashbrown::{HashMap, HashSet};
use log::info;
use rbhpack::{read_fasta, FastaRecord, FastaWriter, FullId, TruncId};

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use config::{write_atomically, StageSummary, COUNTER_WIDTH, TRUNCATED_FASTA, TRUNCATION_TABLE};

use crate::cli::Args;

const TABLE_HEADER: &str = "original_header\ttruncated_header";

/// Total, injective mapping from original headers to bounded headers
#[derive(Debug, Clone, Default)]
pub struct TruncationTable {
    entries: Vec<(FullId, TruncId)>,
    lookup: HashMap<FullId, TruncId>,
    recut: Vec<FullId>,
    max_length: usize,
}

impl TruncationTable {
    /// Bound every header to `max_length` characters
    ///
    /// # Arguments
    ///
    /// * `headers` - original headers, in file order
    /// * `max_length` - identifier ceiling (L)
    /// * `truncate_to` - characters kept before the counter (T < L)
    ///
    /// # Returns
    ///
    /// A table holding one entry per distinct header. Headers of length <= L
    /// are kept as they are and reserved before any long header is cut, so a
    /// generated `<base>_NNN` never lands on an existing short header.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rbh_trunc::TruncationTable;
    ///
    /// let long = "x".repeat(70);
    /// let table = TruncationTable::build(&[long.as_str(), "short"], 50, 45).unwrap();
    ///
    /// assert!(table.get(&long).unwrap().as_str().ends_with("_001"));
    /// assert_eq!(table.get("short").unwrap().as_str(), "short");
    /// ```
    pub fn build<S: AsRef<str>>(headers: &[S], max_length: usize, truncate_to: usize) -> Result<Self> {
        if truncate_to >= max_length {
            bail!(
                "ERROR: truncation width ({}) must be smaller than the maximum header length ({})",
                truncate_to,
                max_length
            );
        }
        if max_length <= COUNTER_WIDTH + 1 {
            bail!(
                "ERROR: maximum header length ({}) leaves no room for the _{} counter",
                max_length,
                "N".repeat(COUNTER_WIDTH)
            );
        }

        let reserved: HashSet<&str> = headers
            .iter()
            .map(|h| h.as_ref())
            .filter(|h| char_len(h) <= max_length)
            .collect();

        let mut table = Self {
            max_length,
            ..Default::default()
        };
        let mut used: HashSet<String> = HashSet::with_capacity(headers.len());
        let mut counters: HashMap<String, usize> = HashMap::new();

        for header in headers.iter().map(|h| h.as_ref()) {
            if table.lookup.contains_key(header) {
                continue;
            }

            let truncated = if char_len(header) <= max_length {
                header.to_string()
            } else {
                let base = prefix(header, truncate_to);
                let counter = counters.entry(base.to_string()).or_insert(0);
                let mut recut = false;

                let candidate = loop {
                    *counter += 1;
                    let suffix = format!("_{:0width$}", counter, width = COUNTER_WIDTH);

                    let mut candidate = format!("{}{}", base, suffix);
                    if char_len(&candidate) > max_length {
                        let keep = max_length.saturating_sub(char_len(&suffix));
                        candidate = format!("{}{}", prefix(header, keep), suffix);
                        recut = true;
                    }

                    if !reserved.contains(candidate.as_str()) && !used.contains(&candidate) {
                        break candidate;
                    }
                };

                if recut {
                    table.recut.push(FullId::new(header));
                }
                candidate
            };

            used.insert(truncated.clone());
            table.push(FullId::new(header), TruncId::new(truncated));
        }

        table.check_invariants(headers)?;
        Ok(table)
    }

    fn push(&mut self, full: FullId, truncated: TruncId) {
        self.lookup.insert(full.clone(), truncated.clone());
        self.entries.push((full, truncated));
    }

    /// Assert totality, injectivity, the length ceiling and passthrough
    pub fn check_invariants<S: AsRef<str>>(&self, headers: &[S]) -> Result<()> {
        for header in headers.iter().map(|h| h.as_ref()) {
            if !self.lookup.contains_key(header) {
                bail!("ERROR: header {:?} has no truncation entry", header);
            }
        }

        let mut outputs = HashSet::with_capacity(self.entries.len());
        for (full, truncated) in self.entries.iter() {
            if truncated.len() > self.max_length {
                bail!(
                    "ERROR: truncated header {:?} exceeds {} characters",
                    truncated.as_str(),
                    self.max_length
                );
            }
            if full.len() <= self.max_length && full.as_str() != truncated.as_str() {
                bail!("ERROR: short header {:?} was rewritten", full.as_str());
            }
            if !outputs.insert(truncated.as_str()) {
                bail!(
                    "ERROR: truncated header {:?} is shared by more than one original header",
                    truncated.as_str()
                );
            }
        }

        Ok(())
    }

    pub fn get(&self, header: &str) -> Option<&TruncId> {
        self.lookup.get(header)
    }

    /// bounded form of a header, falling back to identity for short headers
    /// absent from the table
    pub fn resolve(&self, header: &str) -> Option<TruncId> {
        match self.lookup.get(header) {
            Some(truncated) => Some(truncated.clone()),
            None if char_len(header) <= self.max_length => Some(TruncId::new(header)),
            None => None,
        }
    }

    /// entries whose header actually changed, in input order
    pub fn changed(&self) -> impl Iterator<Item = &(FullId, TruncId)> {
        self.entries
            .iter()
            .filter(|(full, truncated)| full.as_str() != truncated.as_str())
    }

    /// headers that needed the emergency re-cut
    pub fn recut(&self) -> &[FullId] {
        &self.recut
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        write_atomically(path, |w| {
            writeln!(w, "{}", TABLE_HEADER)?;
            for (full, truncated) in self.changed() {
                writeln!(w, "{}\t{}", full, truncated)?;
            }
            Ok(())
        })
    }

    /// Read a persisted table; lookups for unlisted short headers use identity
    pub fn read<P: AsRef<Path>>(path: P, max_length: usize) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("ERROR: cannot open {}", path.display()))?,
        );

        let mut table = Self {
            max_length,
            ..Default::default()
        };

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || (idx == 0 && line.trim() == TABLE_HEADER) {
                continue;
            }

            match line.split_once('\t') {
                Some((full, truncated)) => {
                    table.push(FullId::new(full.trim()), TruncId::new(truncated.trim()))
                }
                None => bail!(
                    "ERROR: {}:{}: expected original_header<TAB>truncated_header",
                    path.display(),
                    idx + 1
                ),
            }
        }

        Ok(table)
    }
}

/// Write records under their bounded headers
pub fn write_truncated_fasta<P: AsRef<Path>>(
    records: &[FastaRecord],
    table: &TruncationTable,
    path: P,
) -> Result<usize> {
    let mut headers = Vec::with_capacity(records.len());
    for record in records {
        match table.get(&record.header) {
            Some(truncated) => headers.push(truncated.as_str()),
            None => bail!("ERROR: header {:?} has no truncation entry", record.header),
        }
    }

    let mut written = 0;
    write_atomically(path, |w| {
        let mut writer = FastaWriter::new(w);
        for (header, record) in headers.iter().zip(records) {
            writer.write_record(header, &record.seq)?;
        }
        written = writer.written();
        Ok(())
    })?;

    Ok(written)
}

pub fn truncate_fasta(args: Args) -> Result<StageSummary> {
    info!("INFO: Truncating headers in {}...", args.fasta.display());

    let mut summary = StageSummary::new("truncate");
    let records = read_fasta(&args.fasta)?;
    let headers: Vec<&str> = records.iter().map(|r| r.header.as_str()).collect();

    let table = TruncationTable::build(&headers, args.max_length, args.truncate_to)?;
    for full in table.recut() {
        summary.warn(format!("emergency re-cut for header {}", full));
    }

    let fasta = args.outdir.join(TRUNCATED_FASTA);
    let written = write_truncated_fasta(&records, &table, &fasta)?;
    table.write(args.outdir.join(TRUNCATION_TABLE))?;

    summary.processed = records.len();
    summary.kept = written;
    summary.note(format!(
        "{} of {} headers truncated",
        table.changed().count(),
        table.len()
    ));
    summary.log();

    Ok(summary)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(prefix: &str, total: usize) -> String {
        let mut h = prefix.to_string();
        while h.len() < total {
            h.push('z');
        }
        h
    }

    #[test]
    fn test_long_headers_get_counters_per_base() {
        let base = "a".repeat(45);
        let first = format!("{}{}", base, "b".repeat(25));
        let second = format!("{}{}", base, "c".repeat(25));

        let table = TruncationTable::build(&[&first, &second], 50, 45).unwrap();
        let t1 = table.get(&first).unwrap();
        let t2 = table.get(&second).unwrap();

        assert_eq!(first.len(), 70);
        assert!(t1.len() <= 50);
        assert!(t1.as_str().ends_with("_001"));
        assert!(t2.as_str().ends_with("_002"));
        assert_eq!(table.changed().count(), 2);
    }

    #[test]
    fn test_short_headers_pass_through() {
        let exact = "s".repeat(50);
        let table = TruncationTable::build(&["rgs2-human-x-1", exact.as_str()], 50, 45).unwrap();

        assert_eq!(table.get("rgs2-human-x-1").unwrap().as_str(), "rgs2-human-x-1");
        assert_eq!(table.get(&exact).unwrap().as_str(), exact);
        assert_eq!(table.changed().count(), 0);
    }

    #[test]
    fn test_generated_header_never_collides_with_short_header() {
        let base = "q".repeat(45);
        let squatter = format!("{}_001", base);
        let long = format!("{}{}", base, "x".repeat(20));

        // the long header comes first, the short one is still reserved
        let table = TruncationTable::build(&[long.as_str(), squatter.as_str()], 50, 45).unwrap();
        assert_eq!(table.get(&squatter).unwrap().as_str(), squatter);
        assert!(table.get(&long).unwrap().as_str().ends_with("_002"));
    }

    #[test]
    fn test_injective_over_many_shared_prefixes() {
        let headers: Vec<String> = (0..1200)
            .map(|i| format!("{}{:05}", header("rgs1200-human-hgnc-", 60), i))
            .collect();

        let table = TruncationTable::build(&headers, 50, 45).unwrap();
        let outputs: HashSet<&str> = headers
            .iter()
            .map(|h| table.get(h).unwrap().as_str())
            .collect();

        assert_eq!(outputs.len(), headers.len());
        assert!(outputs.iter().all(|h| h.chars().count() <= 50));
    }

    #[test]
    fn test_emergency_recut_is_recorded() {
        let long = "abcdefghijklmnop";
        let table = TruncationTable::build(&[long], 10, 8).unwrap();
        let truncated = table.get(long).unwrap();

        assert_eq!(truncated.as_str(), "abcdef_001");
        assert_eq!(table.recut().len(), 1);
    }

    #[test]
    fn test_width_must_be_below_ceiling() {
        assert!(TruncationTable::build(&["a"], 45, 45).is_err());
    }

    #[test]
    fn test_duplicate_inputs_share_output() {
        let long = "l".repeat(60);
        let table = TruncationTable::build(&[long.as_str(), long.as_str()], 50, 45).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get(&long).unwrap().as_str().ends_with("_001"));
    }

    #[test]
    fn test_table_file_lists_only_changed_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TRUNCATION_TABLE);

        let long = "m".repeat(60);
        let table = TruncationTable::build(&[long.as_str(), "short"], 50, 45).unwrap();
        table.write(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.starts_with(TABLE_HEADER));

        let back = TruncationTable::read(&path, 50).unwrap();
        assert_eq!(back.get(&long), table.get(&long));
        assert_eq!(back.resolve("short").unwrap().as_str(), "short");
        assert!(back.resolve(&"n".repeat(60)).is_none());
    }

    #[test]
    fn test_truncate_fasta_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = dir.path().join("rgs.aa");
        let long = header("rgs2-human-hgnc-", 70);
        std::fs::write(&fasta, format!(">{}\nMKV\n>rgs2-fly-x-2\nPP\n", long)).unwrap();

        let args = Args::from(vec![
            "--fasta".to_string(),
            fasta.display().to_string(),
            "--outdir".to_string(),
            dir.path().display().to_string(),
        ]);
        let summary = truncate_fasta(args).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.kept, 2);

        let records = read_fasta(dir.path().join(TRUNCATED_FASTA)).unwrap();
        assert!(records[0].header.ends_with("_001"));
        assert_eq!(records[1].header, "rgs2-fly-x-2");
    }
}
