//! Tabular hit reports (search engine outfmt 6)
//!
//! Rows are `query, hit, ...` and must come best hit first for every query.
//! When the bitscore column is present the ordering is checked while
//! reading instead of being trusted: the first row of each subject must not
//! score above the first row of the subject before it.

use flate2::read::MultiGzDecoder;
use hashbrown::HashSet;

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use config::{BITSCORE_FIELD, MIN_HIT_FIELDS};

use crate::PackError;

#[derive(Debug, Clone, PartialEq)]
pub struct HitRow {
    pub query: String,
    pub hit: String,
    pub bitscore: Option<f64>,
}

impl HitRow {
    pub fn parse_line(line: &str, path: &str, line_no: usize) -> Result<Self, PackError> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < MIN_HIT_FIELDS || fields[0].trim().is_empty() {
            return Err(PackError::MissingFields {
                path: path.to_string(),
                line: line_no,
                min: MIN_HIT_FIELDS,
                found: fields.iter().filter(|f| !f.trim().is_empty()).count(),
            });
        }

        let bitscore = match fields.get(BITSCORE_FIELD) {
            Some(value) => {
                let score =
                    value
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| PackError::InvalidScore {
                            path: path.to_string(),
                            line: line_no,
                            value: value.to_string(),
                        })?;
                Some(score)
            }
            None => None,
        };

        Ok(Self {
            query: fields[0].trim().to_string(),
            hit: fields[1].trim().to_string(),
            bitscore,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct HitReport {
    pub label: String,
    rows: Vec<HitRow>,
}

impl HitReport {
    /// Read a report from disk
    ///
    /// # Arguments
    ///
    /// * `path` - plain or gzipped tab-separated report
    /// * `validate_order` - reject reports whose subject bitscores increase inside a query group
    ///
    /// # Example
    ///
    /// ```rust, no_run
    /// use rbhpack::HitReport;
    ///
    /// let report = HitReport::from_path("rgs-vs-Homo_sapiens.blastp", true).unwrap();
    /// for row in report.best_hits() {
    ///     println!("{} -> {}", row.query, row.hit);
    /// }
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P, validate_order: bool) -> Result<Self, PackError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let reader: Box<dyn BufRead> = match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Box::new(BufReader::new(MultiGzDecoder::new(file))),
            _ => Box::new(BufReader::new(file)),
        };

        Self::from_reader(reader, &path.display().to_string(), validate_order)
    }

    pub fn parse_str(contents: &str, label: &str, validate_order: bool) -> Result<Self, PackError> {
        Self::from_reader(Cursor::new(contents), label, validate_order)
    }

    fn from_reader<R: BufRead>(
        reader: R,
        label: &str,
        validate_order: bool,
    ) -> Result<Self, PackError> {
        let mut rows: Vec<HitRow> = Vec::new();
        let mut subject_score: Option<f64> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;

            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let row = HitRow::parse_line(&line, label, line_no)?;

            // HSPs of one subject are contiguous; only their first row is ordered
            let new_subject = match rows.last() {
                Some(prev) if prev.query == row.query => prev.hit != row.hit,
                _ => {
                    subject_score = None;
                    true
                }
            };

            if new_subject {
                if let (true, Some(previous), Some(current)) =
                    (validate_order, subject_score, row.bitscore)
                {
                    if current > previous {
                        return Err(PackError::Unordered {
                            path: label.to_string(),
                            line: line_no,
                            query: row.query,
                            previous,
                            current,
                        });
                    }
                }
                subject_score = row.bitscore;
            }

            rows.push(row);
        }

        Ok(Self {
            label: label.to_string(),
            rows,
        })
    }

    pub fn rows(&self) -> &[HitRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// first row of every query, in order of first appearance
    pub fn best_hits(&self) -> Vec<&HitRow> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| seen.insert(row.query.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outfmt6(query: &str, hit: &str, score: f64) -> String {
        format!(
            "{}\t{}\t98.0\t100\t2\t0\t1\t100\t1\t100\t1e-50\t{}\n",
            query, hit, score
        )
    }

    #[test]
    fn test_parse_two_column_report() {
        let report = HitReport::parse_str("# comment\nq1\th1\n\nq1\th2\nq2\th3\n", "r", true)
            .unwrap();

        assert_eq!(report.len(), 3);
        assert!(report.rows().iter().all(|r| r.bitscore.is_none()));

        let best: Vec<_> = report.best_hits().iter().map(|r| r.hit.as_str()).collect();
        assert_eq!(best, vec!["h1", "h3"]);
    }

    #[test]
    fn test_row_below_minimum_columns_is_fatal() {
        let err = HitReport::parse_str("q1\th1\nlonely\n", "r", true).unwrap_err();
        assert!(matches!(err, PackError::MissingFields { line: 2, .. }));
    }

    #[test]
    fn test_increasing_bitscore_is_rejected() {
        let text = outfmt6("q1", "h1", 100.0) + &outfmt6("q1", "h2", 250.0);
        let err = HitReport::parse_str(&text, "r", true).unwrap_err();
        assert!(matches!(err, PackError::Unordered { line: 2, .. }));

        assert!(HitReport::parse_str(&text, "r", false).is_ok());
    }

    #[test]
    fn test_new_query_group_resets_order() {
        let text = outfmt6("q1", "h1", 100.0)
            + &outfmt6("q1", "h2", 90.0)
            + &outfmt6("q2", "h1", 400.0);
        let report = HitReport::parse_str(&text, "r", true).unwrap();
        assert_eq!(report.best_hits().len(), 2);
        assert_eq!(report.rows()[2].bitscore, Some(400.0));
    }

    #[test]
    fn test_weak_hsp_before_next_subject_is_accepted() {
        let text = outfmt6("q1", "G1", 300.0)
            + &outfmt6("q1", "G1", 45.0)
            + &outfmt6("q1", "G2", 150.0)
            + &outfmt6("q1", "G2", 20.0)
            + &outfmt6("q1", "G3", 140.0);
        let report = HitReport::parse_str(&text, "r", true).unwrap();
        assert_eq!(report.len(), 5);
        assert_eq!(report.best_hits()[0].hit, "G1");

        let text = outfmt6("q1", "G1", 300.0)
            + &outfmt6("q1", "G1", 45.0)
            + &outfmt6("q1", "G2", 350.0);
        let err = HitReport::parse_str(&text, "r", true).unwrap_err();
        assert!(matches!(
            err,
            PackError::Unordered { line: 3, previous, current, .. } if previous == 300.0 && current == 350.0
        ));
    }

    #[test]
    fn test_invalid_bitscore() {
        let text = "q1\th1\t1\t1\t1\t1\t1\t1\t1\t1\t1\tNaNx\n";
        assert!(matches!(
            HitReport::parse_str(text, "r", true),
            Err(PackError::InvalidScore { .. })
        ));
    }
}
