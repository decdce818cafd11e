use dashmap::DashSet;
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::NamedTempFile;
use thiserror::Error;

use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// Write a file through a temporary sibling and rename it into place
///
/// # Arguments
///
/// * `path` - final destination
/// * `write` - closure that receives a buffered writer over the temporary file
///
/// # Returns
///
/// An io::Result; on error the destination is left untouched
///
/// # Example
///
/// ```rust, no_run
/// use config::write_atomically;
/// use std::io::Write;
///
/// write_atomically("out/keepers.txt", |w| writeln!(w, "seq_1")).unwrap();
/// ```
pub fn write_atomically<P, F>(path: P, write: F) -> std::io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// write a DashSet to a file, one object per line in sorted order
pub fn write_objs<T, P>(data: &DashSet<T>, fname: P) -> std::io::Result<()>
where
    T: AsRef<str> + Sync + Send + Eq + std::hash::Hash,
    P: AsRef<Path>,
{
    log::info!(
        "INFO: objects in {}: {}. Writing...",
        fname.as_ref().display(),
        data.len()
    );

    let mut lines: Vec<String> = data.iter().map(|x| x.as_ref().to_owned()).collect();
    lines.sort_unstable();

    write_atomically(fname, |writer| {
        for line in lines.iter() {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    })
}

/// write any collection of lines to a file
pub fn write_collection<I, S, P>(data: I, fname: P) -> std::io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    P: AsRef<Path>,
{
    write_atomically(&fname, |writer| {
        let mut count = 0;
        for line in data {
            writeln!(writer, "{}", line.as_ref())?;
            count += 1;
        }
        log::info!("INFO: lines in {}: {}", fname.as_ref().display(), count);
        Ok(())
    })
}

/// read a list of paths, one per line, skipping blanks
pub fn read_path_list<P: AsRef<Path>>(list: P) -> Result<Vec<PathBuf>, CliError> {
    let reader = BufReader::new(File::open(list.as_ref())?);
    let mut paths = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            paths.push(PathBuf::from(line));
        }
    }

    log::info!(
        "INFO: read {} paths from {}",
        paths.len(),
        list.as_ref().display()
    );
    Ok(paths)
}

/// Expand path arguments
///
/// A single argument pointing to a plain list of paths (no '>' header, no
/// tab-separated fields on its first line) is replaced by its contents.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    if let [single] = paths {
        if single.is_file() && is_path_list(single)? {
            return read_path_list(single);
        }
    }

    Ok(paths.to_vec())
}

fn is_path_list(path: &Path) -> Result<bool, CliError> {
    if has_extension(path, &["gz"]) {
        return Ok(false);
    }

    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        return Ok(!line.starts_with('>') && !line.contains('\t'));
    }

    Ok(false)
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        self.check_sequences()?;
        self.check_tables()?;

        if self.get_optional().is_empty() {
            log::warn!("WARN: no optional inputs provided. Skipping...");
        } else {
            for opt in self.get_optional() {
                validate(opt, None)?;
            }
        }

        Ok(())
    }

    fn check_sequences(&self) -> Result<(), CliError> {
        let sequences = self.get_sequences();
        if sequences.is_empty() {
            let err = "No sequence files provided".to_string();
            return Err(CliError::InvalidInput(err));
        }

        for fasta in sequences {
            validate(fasta, Some(&crate::FASTA_EXTENSIONS))?;
        }

        Ok(())
    }

    fn check_tables(&self) -> Result<(), CliError> {
        for table in self.get_tables() {
            validate(table, None)?;
        }
        Ok(())
    }

    fn get_sequences(&self) -> Vec<&PathBuf>;
    fn get_tables(&self) -> Vec<&PathBuf>;
    fn get_optional(&self) -> Vec<&PathBuf> {
        Vec::new()
    }
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn has_extension(arg: &Path, extensions: &[&str]) -> bool {
    match arg.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => extensions.contains(&ext),
        None => false,
    }
}

/// argument validation
pub fn validate(arg: &PathBuf, extensions: Option<&[&str]>) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!(
            "ERROR: {:?} is not a file",
            arg
        )));
    }

    if let Some(extensions) = extensions {
        if !has_extension(arg, extensions) {
            return Err(CliError::InvalidInput(format!(
                "ERROR: file {:?} is not a FASTA file [{}]",
                arg,
                extensions.join(", ")
            )));
        }
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(CliError::InvalidInput(format!(
            "ERROR: file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}
