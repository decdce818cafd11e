//! FASTA records
//!
//! Headers are kept whole (everything after '>' up to the end of the line,
//! trimmed): identifiers in this pipeline are matched on the full header,
//! never on the first whitespace token. Inputs ending in `.gz` are decoded
//! on the fly.

use flate2::read::MultiGzDecoder;

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use config::FASTA_LINE_WIDTH;

use crate::PackError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub seq: String,
}

impl FastaRecord {
    pub fn new<H: Into<String>, S: Into<String>>(header: H, seq: S) -> Self {
        Self {
            header: header.into(),
            seq: seq.into(),
        }
    }
}

/// Sequential FASTA reader, one record at a time
pub struct FastaReader {
    reader: Box<dyn BufRead + Send>,
    path: String,
    line_buf: String,
    current: Option<String>,
}

impl FastaReader {
    /// Open a plain or gzipped FASTA file
    ///
    /// # Example
    ///
    /// ```rust, no_run
    /// use rbhpack::FastaReader;
    ///
    /// let mut reader = FastaReader::open("genome.aa").unwrap();
    /// while let Some(record) = reader.read_next().unwrap() {
    ///     println!("{}: {} aa", record.header, record.seq.len());
    /// }
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PackError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let reader: Box<dyn BufRead + Send> = match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Box::new(BufReader::new(MultiGzDecoder::new(file))),
            _ => Box::new(BufReader::with_capacity(1024 * 1024, file)),
        };

        Self::from_reader(reader, &path.display().to_string())
    }

    pub fn from_reader<R: BufRead + Send + 'static>(
        reader: R,
        label: &str,
    ) -> Result<Self, PackError> {
        let mut fasta = Self {
            reader: Box::new(reader),
            path: label.to_string(),
            line_buf: String::with_capacity(256),
            current: None,
        };

        // first non-blank line must be a header
        loop {
            fasta.line_buf.clear();
            if fasta.reader.read_line(&mut fasta.line_buf)? == 0 {
                break;
            }

            let line = fasta.line_buf.trim();
            if line.is_empty() {
                continue;
            }

            match line.strip_prefix('>') {
                Some(header) => {
                    fasta.current = Some(header.trim().to_string());
                    break;
                }
                None => {
                    return Err(PackError::HeaderlessFasta {
                        path: fasta.path.clone(),
                    })
                }
            }
        }

        Ok(fasta)
    }

    pub fn read_next(&mut self) -> Result<Option<FastaRecord>, PackError> {
        let header = match self.current.take() {
            Some(header) => header,
            None => return Ok(None),
        };

        let mut seq = String::new();
        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf)? == 0 {
                break;
            }

            if let Some(next) = self.line_buf.strip_prefix('>') {
                self.current = Some(next.trim().to_string());
                break;
            }

            seq.push_str(self.line_buf.trim());
        }

        Ok(Some(FastaRecord { header, seq }))
    }
}

impl Iterator for FastaReader {
    type Item = Result<FastaRecord, PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

/// read a whole FASTA file into memory, keeping file order
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>, PackError> {
    FastaReader::open(path)?.collect()
}

pub fn count_records<P: AsRef<Path>>(path: P) -> Result<usize, PackError> {
    let mut count = 0;
    for record in FastaReader::open(path)? {
        record?;
        count += 1;
    }
    Ok(count)
}

/// FASTA writer wrapping residues at a fixed width
pub struct FastaWriter<W: Write> {
    inner: W,
    width: usize,
    written: usize,
}

impl<W: Write> FastaWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_width(inner, FASTA_LINE_WIDTH)
    }

    pub fn with_width(inner: W, width: usize) -> Self {
        Self {
            inner,
            width: width.max(1),
            written: 0,
        }
    }

    pub fn write_record(&mut self, header: &str, seq: &str) -> std::io::Result<()> {
        writeln!(self.inner, ">{}", header)?;

        let bytes = seq.as_bytes();
        for chunk in bytes.chunks(self.width) {
            self.inner.write_all(chunk)?;
            self.inner.write_all(b"\n")?;
        }

        self.written += 1;
        Ok(())
    }

    pub fn write(&mut self, record: &FastaRecord) -> std::io::Result<()> {
        self.write_record(&record.header, &record.seq)
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Cursor;

    fn reader(text: &str) -> Result<FastaReader, PackError> {
        FastaReader::from_reader(Cursor::new(text.to_string()), "test")
    }

    #[test]
    fn test_reads_multiline_records_with_full_headers() {
        let records: Vec<_> = reader("\n>seq 1 extra\nMKV\nLLA\n>seq2\nPP\n")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], FastaRecord::new("seq 1 extra", "MKVLLA"));
        assert_eq!(records[1], FastaRecord::new("seq2", "PP"));
    }

    #[test]
    fn test_headerless_input_is_an_error() {
        assert!(matches!(
            reader("MKV\n>a\nPP\n"),
            Err(PackError::HeaderlessFasta { .. })
        ));
    }

    #[test]
    fn test_empty_input_has_no_records() {
        assert_eq!(reader("").unwrap().count(), 0);
    }

    #[test]
    fn test_writer_wraps_lines() {
        let mut buf = Vec::new();
        {
            let mut writer = FastaWriter::with_width(&mut buf, 4);
            writer.write_record("a", "ABCDEFGHI").unwrap();
            writer.write_record("b", "").unwrap();
            assert_eq!(writer.written(), 2);
        }

        assert_eq!(String::from_utf8(buf).unwrap(), ">a\nABCD\nEFGH\nI\n>b\n");
    }

    #[test]
    fn test_reads_gzipped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.aa.gz");

        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b">x-1\nMK\n>x-2\nVV\n").unwrap();
        encoder.finish().unwrap();

        let records = read_fasta(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(count_records(&path).unwrap(), 2);
        assert_eq!(records[1].header, "x-2");
    }
}
