//! Change and coverage history of previous runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Number of most recent runs inspected when deciding whether coverage still improves.
pub const COMMIT_IMPROVEMENT: usize = 3;

/// Last directory of a path that holds default-package sources.
const SOURCE_ROOTS: &[&str] = &["src", "java"];

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid coverage value {value:?} on line {line}")]
    InvalidCoverage { line: usize, value: String },
}

/// History data used by the History strategy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    /// Dotted path fragments of files added or modified since the last run
    modified_files: FxHashSet<String>,
    /// Coverage (0.0..=1.0) per class, oldest run first
    coverage: FxHashMap<String, Vec<f64>>,
}

impl History {
    /// Parse a change log made of `A|M|D<TAB>path` lines.
    ///
    /// `A` and `M` are treated alike, `D` is ignored, and so is any path
    /// that is not a `.java` source file. Unknown prefixes are logged and skipped.
    pub fn parse_log(text: &str) -> Self {
        let mut history = Self::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (status, path) = match line.split_once('\t') {
                Some((s, p)) => (s.trim(), p.trim()),
                None => match line.split_once(char::is_whitespace) {
                    Some((s, p)) => (s.trim(), p.trim()),
                    None => {
                        warn!("History log line {}: missing path in {:?}", idx + 1, line);
                        continue;
                    }
                },
            };

            match status {
                "A" | "M" => {
                    if let Some(token) = Self::class_token(path) {
                        history.modified_files.insert(token);
                    }
                }
                "D" => {}
                other => {
                    warn!("History log line {}: unknown prefix {:?}", idx + 1, other);
                }
            }
        }

        history
    }

    /// Read a change log from disk.
    ///
    /// A missing file is not an error: it means there is no history, and
    /// `Ok(None)` is returned after a warning.
    pub fn load_log(path: &Path) -> Result<Option<Self>, HistoryError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse_log(&text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "History file {} not found, history-adaptive budgets disabled",
                    path.display()
                );
                Ok(None)
            }
            Err(source) => Err(HistoryError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse `class<TAB>v1<TAB>v2...` lines of coverage values, oldest first.
    pub fn parse_coverage(text: &str) -> Result<FxHashMap<String, Vec<f64>>, HistoryError> {
        let mut coverage: FxHashMap<String, Vec<f64>> = FxHashMap::default();

        for (idx, raw) in text.lines().enumerate() {
            let mut fields = raw.split('\t').map(str::trim).filter(|f| !f.is_empty());
            let Some(class) = fields.next() else {
                continue;
            };
            let series = coverage.entry(class.to_string()).or_default();
            for value in fields {
                let parsed = value
                    .parse::<f64>()
                    .map_err(|_| HistoryError::InvalidCoverage {
                        line: idx + 1,
                        value: value.to_string(),
                    })?;
                series.push(parsed);
            }
        }

        Ok(coverage)
    }

    pub fn load_coverage(path: &Path) -> Result<FxHashMap<String, Vec<f64>>, HistoryError> {
        let text = fs::read_to_string(path).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_coverage(&text)
    }

    pub fn with_coverage(mut self, coverage: FxHashMap<String, Vec<f64>>) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn modified_files(&self) -> &FxHashSet<String> {
        &self.modified_files
    }

    pub fn coverage_series(&self, class: &str) -> Option<&[f64]> {
        self.coverage.get(class).map(Vec::as_slice)
    }

    /// Whether the source file declaring `class` shows up in the change log.
    ///
    /// A packaged class matches any path ending in its package directories.
    /// A default-package class only matches a file directly under a source
    /// root, so `Foo` is not confused with `org/Foo.java`.
    pub fn is_class_modified(&self, class: &str) -> bool {
        let top_level = class.split('$').next().unwrap_or(class);
        let packaged = top_level.contains('.');
        let suffix = format!(".{top_level}");

        self.modified_files.iter().any(|token| {
            if token == top_level {
                return true;
            }
            let Some(dir) = token.strip_suffix(suffix.as_str()) else {
                return false;
            };
            packaged || SOURCE_ROOTS.contains(&dir.rsplit('.').next().unwrap_or(dir))
        })
    }

    /// Classes without any recorded coverage are assumed to still improve.
    pub fn has_coverage_improved(&self, class: &str) -> bool {
        self.coverage_series(class)
            .map(is_coverage_improving)
            .unwrap_or(true)
    }

    // `src/main/java/org/Foo.java` -> `src.main.java.org.Foo`
    fn class_token(path: &str) -> Option<String> {
        let stem = path.strip_suffix(".java")?;
        Some(stem.replace(['/', '\\'], "."))
    }
}

/// Decide from a coverage series (oldest first) whether search is still making progress.
///
/// Fewer than [`COMMIT_IMPROVEMENT`] records is not enough evidence to stop,
/// full coverage leaves nothing to gain, and otherwise any increase inside
/// the last [`COMMIT_IMPROVEMENT`] records counts as progress.
pub fn is_coverage_improving(series: &[f64]) -> bool {
    if series.len() < COMMIT_IMPROVEMENT {
        return true;
    }
    if series.last().is_some_and(|latest| *latest >= 1.0) {
        return false;
    }
    series[series.len() - COMMIT_IMPROVEMENT..]
        .windows(2)
        .any(|pair| pair[1] > pair[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_collects_added_and_modified() {
        let history = History::parse_log(
            "A\tsrc/main/java/org/example/Foo.java\n\
             M\tsrc/main/java/org/example/Bar.java\n\
             D\tsrc/main/java/org/example/Gone.java\n\
             M\tREADME.md\n",
        );
        let mut tokens: Vec<&String> = history.modified_files().iter().collect();
        tokens.sort();
        assert_eq!(
            tokens,
            vec!["src.main.java.org.example.Bar", "src.main.java.org.example.Foo"]
        );
    }

    #[test]
    fn test_parse_log_skips_unknown_prefix() {
        let history = History::parse_log("X\tsrc/org/Foo.java\n\nM\tsrc/org/Bar.java");
        assert_eq!(history.modified_files().len(), 1);
        assert!(history.is_class_modified("org.Bar"));
        assert!(!history.is_class_modified("org.Foo"));
    }

    #[test]
    fn test_windows_separators_are_normalized() {
        let history = History::parse_log("M\tsrc\\org\\example\\Foo.java");
        assert!(history.is_class_modified("org.example.Foo"));
    }

    #[test]
    fn test_inner_class_uses_declaring_file() {
        let history = History::parse_log("M\tsrc/org/example/Foo.java");
        assert!(history.is_class_modified("org.example.Foo$Inner"));
        assert!(!history.is_class_modified("org.example.BigFoo"));
    }

    #[test]
    fn test_default_package_class_needs_source_root() {
        let history = History::parse_log("M\tsrc/main/java/org/Foo.java");
        assert!(history.is_class_modified("org.Foo"));
        assert!(!history.is_class_modified("Foo"));

        let history =
            History::parse_log("M\tsrc/main/java/Foo.java\nM\tsrc/Bar.java\nM\tBaz.java");
        assert!(history.is_class_modified("Foo"));
        assert!(history.is_class_modified("Bar$Inner"));
        assert!(history.is_class_modified("Baz"));
        assert!(!history.is_class_modified("org.Foo"));
    }

    #[test]
    fn test_missing_log_file_means_no_history() {
        let path = Path::new("/nonexistent/ctg/history.log");
        assert!(matches!(History::load_log(path), Ok(None)));
    }

    #[test]
    fn test_parse_coverage() {
        let coverage = History::parse_coverage("org.A\t0.1\t0.5\norg.B\t1.0\n").unwrap();
        assert_eq!(coverage.get("org.A"), Some(&vec![0.1, 0.5]));
        assert_eq!(coverage.get("org.B"), Some(&vec![1.0]));
    }

    #[test]
    fn test_parse_coverage_rejects_garbage() {
        let err = History::parse_coverage("org.A\t0.1\tlots").unwrap_err();
        assert!(matches!(err, HistoryError::InvalidCoverage { line: 1, .. }));
    }

    #[test]
    fn test_coverage_trend() {
        assert!(is_coverage_improving(&[0.2]));
        assert!(is_coverage_improving(&[0.2, 0.3, 0.4]));
        assert!(!is_coverage_improving(&[0.2, 0.5, 0.5, 0.5]));
        assert!(is_coverage_improving(&[0.5, 0.5, 0.6]));
        assert!(!is_coverage_improving(&[0.4, 0.8, 1.0]));
        // An old improvement outside the window does not count
        assert!(!is_coverage_improving(&[0.1, 0.7, 0.7, 0.7]));
    }

    #[test]
    fn test_class_without_series_is_improving() {
        let history = History::default();
        assert!(history.has_coverage_improved("org.Unknown"));
    }
}
