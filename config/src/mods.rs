use serde::{Deserialize, Serialize};

use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::write_atomically;

// common names used on the command line -> scientific names used by genome databases
pub const MODEL_SPECIES_ALIASES: [(&str, &str); 5] = [
    ("human", "Homo_sapiens"),
    ("fly", "Drosophila_melanogaster"),
    ("worm", "Caenorhabditis_elegans"),
    ("mouse", "Mus_musculus"),
    ("zebrafish", "Danio_rerio"),
];

/// species matching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// compare a parsed species field against the species name or its alias
    #[default]
    Exact,
    /// legacy behavior: a species name anywhere inside the field is a match
    Substring,
}

impl MatchMode {
    pub fn from_flag(substring: bool) -> Self {
        if substring {
            MatchMode::Substring
        } else {
            MatchMode::Exact
        }
    }
}

/// A model organism used as the reciprocity anchor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpecies {
    pub name: String,
    pub scientific: Option<String>,
}

impl ModelSpecies {
    pub fn new(name: &str) -> Self {
        let scientific = MODEL_SPECIES_ALIASES
            .iter()
            .find(|(common, _)| common.eq_ignore_ascii_case(name))
            .map(|(_, scientific)| scientific.to_string());

        Self {
            name: name.to_string(),
            scientific,
        }
    }

    /// names this species may appear under, most specific first
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(2);
        if let Some(scientific) = &self.scientific {
            names.push(scientific.as_str());
        }
        names.push(self.name.as_str());
        names
    }

    /// does a parsed species field designate this species?
    pub fn matches_field(&self, field: &str, mode: MatchMode) -> bool {
        let field = field.to_lowercase();
        self.names().iter().any(|name| {
            let name = name.to_lowercase();
            match mode {
                MatchMode::Exact => field == name,
                MatchMode::Substring => field.contains(&name),
            }
        })
    }

    /// does a file name carry this species?
    pub fn found_in(&self, text: &str) -> bool {
        self.names().iter().any(|name| text.contains(name))
    }
}

impl fmt::Display for ModelSpecies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scientific {
            Some(scientific) => write!(f, "{} [{}]", self.name, scientific),
            None => write!(f, "{}", self.name),
        }
    }
}

pub fn parse_model_species<S: AsRef<str>>(names: &[S]) -> Vec<ModelSpecies> {
    names
        .iter()
        .flat_map(|x| x.as_ref().split_whitespace())
        .map(ModelSpecies::new)
        .collect()
}

/// Counts emitted by every component before handing off to the next one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: String,
    pub processed: usize,
    pub kept: usize,
    pub warned: usize,
    pub notes: Vec<String>,
}

impl StageSummary {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            ..Default::default()
        }
    }

    /// record a per-record warning
    pub fn warn(&mut self, msg: String) {
        log::warn!("WARN: [{}] {}", self.stage, msg);
        self.warned += 1;
    }

    pub fn note(&mut self, msg: String) {
        log::info!("INFO: [{}] {}", self.stage, msg);
        self.notes.push(msg);
    }

    pub fn log(&self) {
        log::info!(
            "INFO: [{}] processed: {} | kept: {} | warnings: {}",
            self.stage,
            self.processed,
            self.kept,
            self.warned
        );
    }
}

/// merge summaries from every stage into a single json descriptor
pub fn write_summaries<P: AsRef<Path>>(
    summaries: &[StageSummary],
    path: P,
) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(summaries)?;
    write_atomically(path, |w| writeln!(w, "{}", json))
}
