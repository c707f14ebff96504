//! Metadata sidecar (`rule_info.txt`) reading and color persistence.
//!
//! The sidecar is a line-oriented `Key: value` file written by the
//! simulator. This crate reads it once before rendering and appends the
//! chosen colors exactly once after the video is in place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ColorScheme;

/// Rule string used when the sidecar does not name one.
pub const UNKNOWN_RULE: &str = "Unknown Rule";

/// Activity string used when the sidecar does not provide one.
pub const UNKNOWN_ACTIVITY: &str = "N/A";

/// A non-fatal problem found while reading the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MetadataIssue {
    /// The sidecar file does not exist; defaults apply.
    Missing,
    /// A recognized key carried a value that could not be parsed.
    MalformedField { key: &'static str, value: String },
}

/// Typed view of the sidecar file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomatonMetadata {
    /// Free-form rule description.
    pub rule: String,
    /// Declared generation limit (`None` = no limit).
    pub generations: Option<usize>,
    /// Simulation seed, often a `YYYYMMDD` date.
    pub seed: Option<i64>,
    /// Activity score as written by the simulator, e.g. `12.34%`.
    pub activity: String,
    /// Neighborhood name, if recorded.
    pub neighborhood: Option<String>,
    /// Previously appended alive color.
    pub colors_alive: Option<String>,
    /// Previously appended dead color.
    pub colors_dead: Option<String>,
    /// Problems that degraded fields to their defaults.
    #[serde(skip)]
    pub issues: Vec<MetadataIssue>,
}

impl Default for AutomatonMetadata {
    fn default() -> Self {
        Self {
            rule: UNKNOWN_RULE.to_string(),
            generations: None,
            seed: None,
            activity: UNKNOWN_ACTIVITY.to_string(),
            neighborhood: None,
            colors_alive: None,
            colors_dead: None,
            issues: Vec::new(),
        }
    }
}

impl AutomatonMetadata {
    /// Parse sidecar text. Unknown keys and lines without a colon are ignored.
    pub fn parse(text: &str) -> Self {
        let mut meta = Self::default();

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "Rule" => meta.rule = value.to_string(),
                "Generations" => match value.parse::<i64>() {
                    Ok(limit) if limit > 0 => meta.generations = Some(limit as usize),
                    _ => {
                        meta.generations = None;
                        meta.malformed("Generations", value);
                    }
                },
                "Seed" => match value.parse::<i64>() {
                    Ok(seed) => meta.seed = Some(seed),
                    Err(_) => {
                        meta.seed = None;
                        meta.malformed("Seed", value);
                    }
                },
                "Activity" => meta.activity = value.to_string(),
                "Neighborhood" => meta.neighborhood = Some(value.to_string()),
                "Colors_Alive" => meta.colors_alive = Some(value.to_string()),
                "Colors_Dead" => meta.colors_dead = Some(value.to_string()),
                _ => {}
            }
        }

        meta
    }

    fn malformed(&mut self, key: &'static str, value: &str) {
        log::warn!("Ignoring malformed {} value {:?} in metadata", key, value);
        self.issues.push(MetadataIssue::MalformedField {
            key,
            value: value.to_string(),
        });
    }

    /// Activity score as a number, with any `%` suffix removed.
    pub fn activity_percent(&self) -> Option<f64> {
        self.activity.trim().trim_end_matches('%').trim().parse().ok()
    }

    /// True if the sidecar file was absent.
    pub fn is_missing(&self) -> bool {
        self.issues.contains(&MetadataIssue::Missing)
    }
}

/// Read the sidecar at `path`.
///
/// A missing file yields defaults with [`MetadataIssue::Missing`] recorded.
/// Other I/O failures (permissions, invalid UTF-8) are returned as errors.
pub fn read_metadata(path: &Path) -> io::Result<AutomatonMetadata> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(AutomatonMetadata::parse(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!(
                "Metadata file {} not found, using defaults",
                path.display()
            );
            let mut meta = AutomatonMetadata::default();
            meta.issues.push(MetadataIssue::Missing);
            Ok(meta)
        }
        Err(e) => Err(e),
    }
}

/// Appends the chosen colors to the sidecar.
///
/// Consuming `self` makes the append happen at most once per writer; the
/// render job creates exactly one writer.
#[derive(Debug)]
pub struct MetadataWriter {
    path: PathBuf,
    file: Option<File>,
}

impl MetadataWriter {
    /// Prepare to append to the sidecar at `path`.
    ///
    /// An existing file is opened for appending right away, so permission
    /// problems surface before any work is done. A missing file is only
    /// created by [`append_colors`](Self::append_colors), but its directory
    /// must already exist.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = match OpenOptions::new().read(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let dir = match path.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                if !dir.is_dir() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("directory {} does not exist", dir.display()),
                    ));
                }
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `Colors_Alive` and `Colors_Dead` lines.
    ///
    /// Existing bytes are never rewritten. If the file does not end in a
    /// newline, one is written before the new lines. A missing file is
    /// created.
    pub fn append_colors(self, scheme: &ColorScheme) -> io::Result<AppendedColors> {
        let (mut file, created) = match self.file {
            Some(file) => (file, false),
            None => {
                let file = OpenOptions::new()
                    .read(true)
                    .append(true)
                    .create_new(true)
                    .open(&self.path)?;
                (file, true)
            }
        };

        let original_len = file.seek(SeekFrom::End(0))?;
        let mut lines = String::new();
        if !ends_with_newline(&mut file)? {
            lines.push('\n');
        }
        lines.push_str(&format!("Colors_Alive: {}\n", scheme.alive));
        lines.push_str(&format!("Colors_Dead: {}\n", scheme.dead));

        file.write_all(lines.as_bytes())?;
        file.flush()?;

        log::debug!("Appended color scheme to {}", self.path.display());
        Ok(AppendedColors {
            path: self.path,
            file,
            original_len,
            created,
        })
    }
}

/// A completed color append that can still be undone.
#[derive(Debug)]
pub struct AppendedColors {
    path: PathBuf,
    file: File,
    original_len: u64,
    created: bool,
}

impl AppendedColors {
    /// Restore the sidecar to its state before the append. A file created
    /// by the append is removed.
    pub fn revert(self) -> io::Result<()> {
        if self.created {
            drop(self.file);
            fs::remove_file(&self.path)
        } else {
            self.file.set_len(self.original_len)
        }
    }
}

/// True for empty files and files whose last byte is `\n`.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::COLOR_SCHEMES;
    use tempfile::tempdir;

    const SIDECAR: &str = "Seed: 20250101\n\
                           Rule: R1,C2,S2-3,B3,NM\n\
                           Generations: 500\n\
                           Neighborhood: Moore\n\
                           Activity: 12.34%\n";

    #[test]
    fn test_parse_recognized_keys() {
        let meta = AutomatonMetadata::parse(SIDECAR);
        assert_eq!(meta.rule, "R1,C2,S2-3,B3,NM");
        assert_eq!(meta.generations, Some(500));
        assert_eq!(meta.seed, Some(20250101));
        assert_eq!(meta.activity, "12.34%");
        assert_eq!(meta.neighborhood.as_deref(), Some("Moore"));
        assert_eq!(meta.activity_percent(), Some(12.34));
        assert!(meta.issues.is_empty());
    }

    #[test]
    fn test_rule_keeps_embedded_colons() {
        let meta = AutomatonMetadata::parse("Rule: a:b:c\nUnrelated line\nFoo: bar\n");
        assert_eq!(meta.rule, "a:b:c");
        assert_eq!(meta.generations, None);
    }

    #[test]
    fn test_malformed_fields_degrade() {
        let meta = AutomatonMetadata::parse("Generations: many\nSeed: 2025-01-01\nRule: X\n");
        assert_eq!(meta.generations, None);
        assert_eq!(meta.seed, None);
        assert_eq!(meta.rule, "X");
        assert_eq!(meta.issues.len(), 2);
        assert!(matches!(
            meta.issues[0],
            MetadataIssue::MalformedField { key: "Generations", .. }
        ));

        let zero = AutomatonMetadata::parse("Generations: 0\n");
        assert_eq!(zero.generations, None);
    }

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempdir().unwrap();
        let meta = read_metadata(&dir.path().join("rule_info.txt")).unwrap();
        assert!(meta.is_missing());
        assert_eq!(meta.rule, UNKNOWN_RULE);
        assert_eq!(meta.activity, UNKNOWN_ACTIVITY);
        assert_eq!(meta.generations, None);
        assert_eq!(meta.seed, None);
        assert_eq!(meta.activity_percent(), None);
    }

    #[test]
    fn test_writer_appends_two_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rule_info.txt");
        fs::write(&path, SIDECAR).unwrap();

        let scheme = COLOR_SCHEMES[3];
        MetadataWriter::open(&path).unwrap().append_colors(&scheme).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(SIDECAR));
        let added: Vec<&str> = text[SIDECAR.len()..].lines().collect();
        assert_eq!(added, vec!["Colors_Alive: #0A174E", "Colors_Dead: #F5D042"]);

        let meta = AutomatonMetadata::parse(&text);
        assert_eq!(meta.colors_alive.as_deref(), Some("#0A174E"));
        assert_eq!(meta.colors_dead.as_deref(), Some("#F5D042"));
    }

    #[test]
    fn test_writer_terminates_last_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rule_info.txt");
        fs::write(&path, "Rule: X\nActivity: 3.00%").unwrap();

        MetadataWriter::open(&path)
            .unwrap()
            .append_colors(&COLOR_SCHEMES[0])
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Rule: X\nActivity: 3.00%\nColors_Alive: #02343F\nColors_Dead: #F0EDCC\n"
        );
    }

    #[test]
    fn test_writer_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rule_info.txt");

        MetadataWriter::open(&path)
            .unwrap()
            .append_colors(&COLOR_SCHEMES[2])
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Colors_Alive: #000000\nColors_Dead: #FFFFFF\n");
    }

    #[test]
    fn test_writer_requires_existing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("rule_info.txt");
        let err = MetadataWriter::open(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!path.exists());
    }

    #[test]
    fn test_revert_restores_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rule_info.txt");
        fs::write(&path, "Rule: X\nActivity: 3.00%").unwrap();

        let appended = MetadataWriter::open(&path)
            .unwrap()
            .append_colors(&COLOR_SCHEMES[1])
            .unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("Colors_Alive"));
        appended.revert().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Rule: X\nActivity: 3.00%");

        let created = dir.path().join("fresh.txt");
        let appended = MetadataWriter::open(&created)
            .unwrap()
            .append_colors(&COLOR_SCHEMES[1])
            .unwrap();
        appended.revert().unwrap();
        assert!(!created.exists());
    }
}
