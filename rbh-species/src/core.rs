//! Species allow-list filter over keeper sequences

use anyhow::{Context, Result};
use config::{write_atomically, StageSummary, SPECIES_FILTERED};
use hashbrown::HashSet;
use log::info;
use rbhpack::{FastaReader, FastaWriter};

use std::io::{Error, ErrorKind};
use std::path::Path;

use crate::cli::Args;

/// Ordered, de-duplicated species fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    fragments: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let fragments = fragments
            .into_iter()
            .map(|f| f.as_ref().trim().to_string())
            .filter(|f| !f.is_empty() && seen.insert(f.clone()))
            .collect();

        Self { fragments }
    }

    pub fn extend(&mut self, other: AllowList) {
        for fragment in other.fragments {
            if !self.fragments.contains(&fragment) {
                self.fragments.push(fragment);
            }
        }
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// read a newline-delimited allow-list, blank lines ignored
pub fn load_allow_list<P: AsRef<Path>>(path: P) -> Result<AllowList> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("ERROR: cannot read allow-list {}", path.display()))?;

    Ok(AllowList::new(contents.lines()))
}

/// any fragment contained in the header
pub fn is_allowed(header: &str, allow: &AllowList) -> bool {
    allow.fragments().iter().any(|f| header.contains(f.as_str()))
}

pub fn filter_species(args: Args) -> Result<StageSummary> {
    info!("INFO: Filtering keepers by species...");

    let mut summary = StageSummary::new("species");

    let mut allow = AllowList::new(args.keep.iter());
    if let Some(list) = &args.allow_list {
        allow.extend(load_allow_list(list)?);
    }
    info!("INFO: species fragments in allow-list: {}", allow.len());

    if allow.is_empty() {
        summary.warn("allow-list is empty, no sequence will be kept".to_string());
    }

    let mut processed = 0;
    let mut kept = 0;

    let reader = FastaReader::open(&args.fasta)?;
    let output = args.outdir.join(SPECIES_FILTERED);
    write_atomically(&output, |w| {
        let mut writer = FastaWriter::new(w);

        for record in reader {
            let record = record.map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
            processed += 1;

            if is_allowed(&record.header, &allow) {
                writer.write(&record)?;
                kept += 1;
            }
        }

        Ok(())
    })
    .with_context(|| format!("ERROR: failed to write {}", output.display()))?;

    summary.processed = processed;
    summary.kept = kept;
    summary.note(format!("{} sequences dropped", processed - kept));
    summary.log();

    Ok(summary)
}
