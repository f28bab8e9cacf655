//! Bulletin file reader
//!
//! Input files hold one or more TAC messages, each terminated by `=`.

use std::path::Path;

use anyhow::{Context, Result};
use metforge_core::Bulletin;
use once_cell::sync::Lazy;
use regex::Regex;

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(METAR|SPECI|TAF)(?:\s+(?:COR|AMD))?\s+([A-Z]{4})\s+(\d{6}Z)")
        .expect("bulletin header pattern is valid")
});

/// Split `text` into bulletins, skipping chunks without a recognizable header
pub fn parse_bulletins(text: &str, source: &str) -> Vec<Bulletin> {
    text.split('=')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| {
            let Some(header) = HEADER.captures(chunk) else {
                tracing::warn!("{}: skipping unrecognized message '{}'", source, chunk);
                return None;
            };
            Some(Bulletin {
                kind: header[1].to_string(),
                station: header[2].to_string(),
                issued: header[3].to_string(),
                text: format!("{}=", chunk),
                source: source.to_string(),
            })
        })
        .collect()
}

/// Read every bulletin in `path`
pub fn read_bulletins(path: &Path) -> Result<Vec<Bulletin>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(parse_bulletins(&text, &source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_messages() {
        let text = "METAR EFHK 041020Z 22005KT 9999 FEW030 M02/M05 Q1012=\n\
                    TAF AMD ESSA 041100Z 0412/0512 24010KT CAVOK=\n\
                    garbage=\n";
        let bulletins = parse_bulletins(text, "nordic.txt");
        assert_eq!(bulletins.len(), 2);

        assert_eq!(bulletins[0].kind, "METAR");
        assert_eq!(bulletins[0].station, "EFHK");
        assert_eq!(bulletins[0].issued, "041020Z");
        assert!(bulletins[0].text.ends_with("Q1012="));
        assert_eq!(bulletins[0].source, "nordic.txt");

        assert_eq!(bulletins[1].kind, "TAF");
        assert_eq!(bulletins[1].station, "ESSA");
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_bulletins(Path::new("/nonexistent/metforge.txt")).is_err());
    }
}
