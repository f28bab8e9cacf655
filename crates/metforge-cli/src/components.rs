//! Built-in pipeline components

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use metforge_core::{ActionError, ActivationPredicate, Bulletin, MessageTransformer, PostAction};
use parking_lot::Mutex;
use regex::Regex;

/// Trims message text, optionally collapsing inner whitespace
#[derive(Debug, Default)]
pub struct TrimTransformer {
    collapse_whitespace: bool,
}

impl TrimTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_collapse_whitespace(&mut self, collapse: bool) {
        self.collapse_whitespace = collapse;
    }
}

impl MessageTransformer for TrimTransformer {
    fn transform(&self, mut bulletin: Bulletin) -> Bulletin {
        bulletin.text = if self.collapse_whitespace {
            bulletin.text.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            bulletin.text.trim().to_string()
        };
        bulletin
    }
}

/// Upper-cases message text
#[derive(Debug, Default)]
pub struct UppercaseTransformer;

impl MessageTransformer for UppercaseTransformer {
    fn transform(&self, mut bulletin: Bulletin) -> Bulletin {
        bulletin.text = bulletin.text.to_uppercase();
        bulletin
    }
}

/// Rewrites message text with a regular expression
#[derive(Debug)]
pub struct RegexReplaceTransformer {
    pattern: Regex,
    replacement: String,
    limit: usize,
}

impl RegexReplaceTransformer {
    /// Fails when `pattern` is not a valid regular expression
    pub fn new(pattern: &str, replacement: String) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement,
            limit: 0,
        })
    }

    /// Maximum replacements per message, 0 for all
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }
}

impl MessageTransformer for RegexReplaceTransformer {
    fn transform(&self, mut bulletin: Bulletin) -> Bulletin {
        bulletin.text = self
            .pattern
            .replacen(&bulletin.text, self.limit, self.replacement.as_str())
            .into_owned();
        bulletin
    }
}

/// Active for bulletins from the listed stations
#[derive(Debug)]
pub struct StationPredicate {
    stations: HashSet<String>,
    invert: bool,
}

impl StationPredicate {
    pub fn new(stations: Vec<String>) -> Self {
        Self {
            stations: stations.into_iter().map(|s| s.to_uppercase()).collect(),
            invert: false,
        }
    }

    /// Match every station except the listed ones
    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }
}

impl ActivationPredicate for StationPredicate {
    fn is_active(&self, bulletin: &Bulletin) -> bool {
        self.stations.contains(&bulletin.station) != self.invert
    }
}

/// Active for the listed message kinds
#[derive(Debug)]
pub struct KindPredicate {
    kinds: Vec<String>,
}

impl KindPredicate {
    pub fn new(kinds: Vec<String>) -> Self {
        Self { kinds }
    }
}

impl ActivationPredicate for KindPredicate {
    fn is_active(&self, bulletin: &Bulletin) -> bool {
        self.kinds.iter().any(|k| k.eq_ignore_ascii_case(&bulletin.kind))
    }
}

/// Appends bulletins to `<directory>/<KIND>_<STATION>.<extension>`
///
/// Shared by every worker; each bulletin lands as one whole line.
#[derive(Debug)]
pub struct ArchiveAction {
    directory: PathBuf,
    extension: String,
    appending: Mutex<()>,
}

impl ArchiveAction {
    pub fn new(root: impl Into<PathBuf>, directory: &str) -> Self {
        Self {
            directory: root.into().join(directory),
            extension: "txt".to_string(),
            appending: Mutex::new(()),
        }
    }

    pub fn set_extension(&mut self, extension: String) {
        self.extension = extension;
    }

    /// File a bulletin is archived into
    pub fn path_for(&self, bulletin: &Bulletin) -> PathBuf {
        self.directory.join(format!(
            "{}_{}.{}",
            bulletin.kind, bulletin.station, self.extension
        ))
    }
}

impl PostAction for ArchiveAction {
    fn apply(&self, bulletin: &Bulletin) -> Result<(), ActionError> {
        let line = format!("{}\n", bulletin.text);
        std::fs::create_dir_all(&self.directory)?;
        let _guard = self.appending.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(bulletin))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn metar(station: &str, text: &str) -> Bulletin {
        Bulletin {
            kind: "METAR".to_string(),
            station: station.to_string(),
            issued: "041020Z".to_string(),
            text: text.to_string(),
            source: "test.txt".to_string(),
        }
    }

    #[rstest]
    #[case(false, "  METAR  EFHK  041020Z  ", "METAR  EFHK  041020Z")]
    #[case(true, "  METAR  EFHK\n 041020Z  ", "METAR EFHK 041020Z")]
    fn test_trim(#[case] collapse: bool, #[case] input: &str, #[case] expected: &str) {
        let mut trim = TrimTransformer::new();
        trim.set_collapse_whitespace(collapse);
        assert_eq!(trim.transform(metar("EFHK", input)).text, expected);
    }

    #[test]
    fn test_regex_replace_with_limit() {
        let mut replace = RegexReplaceTransformer::new(r"\bAUTO\s+", String::new()).unwrap();
        let text = "METAR EFHK AUTO 22005KT AUTO";
        assert_eq!(
            replace.transform(metar("EFHK", text)).text,
            "METAR EFHK 22005KT AUTO"
        );
        replace.set_limit(1);
        let text = "A AUTO B AUTO C";
        assert_eq!(replace.transform(metar("EFHK", text)).text, "A B AUTO C");
        assert!(RegexReplaceTransformer::new("(", String::new()).is_err());
    }

    #[rstest]
    #[case("EFHK", false, true)]
    #[case("ESSA", false, false)]
    #[case("ESSA", true, true)]
    fn test_station_predicate(#[case] station: &str, #[case] invert: bool, #[case] active: bool) {
        let mut predicate = StationPredicate::new(vec!["efhk".to_string()]);
        predicate.set_invert(invert);
        assert_eq!(predicate.is_active(&metar(station, "")), active);
    }

    #[test]
    fn test_kind_predicate() {
        let predicate = KindPredicate::new(vec!["metar".to_string()]);
        assert!(predicate.is_active(&metar("EFHK", "")));
        let mut taf = metar("EFHK", "");
        taf.kind = "TAF".to_string();
        assert!(!predicate.is_active(&taf));
    }

    #[test]
    fn test_archive_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = ArchiveAction::new(dir.path(), "metar");
        archive.set_extension("tac".to_string());
        archive.apply(&metar("EFHK", "first")).unwrap();
        archive.apply(&metar("EFHK", "second")).unwrap();

        let path = dir.path().join("metar/METAR_EFHK.tac");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_concurrent_appends_keep_lines_whole() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ArchiveAction::new(dir.path(), "metar");
        let text = |worker: usize, n: usize| format!("METAR EFHK {worker:02}{n:03} {}", "X".repeat(512));

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let archive = &archive;
                scope.spawn(move || {
                    for n in 0..50 {
                        archive.apply(&metar("EFHK", &text(worker, n))).unwrap();
                    }
                });
            }
        });

        let written = std::fs::read_to_string(dir.path().join("metar/METAR_EFHK.txt")).unwrap();
        let mut lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 8 * 50);
        lines.sort_unstable();
        let mut expected: Vec<String> = (0..8)
            .flat_map(|worker| (0..50).map(move |n| (worker, n)))
            .map(|(worker, n)| text(worker, n))
            .collect();
        expected.sort_unstable();
        assert_eq!(lines, expected);
    }
}
