//! Pipeline document loading

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metforge_core::ValueMap;
use serde::Deserialize;

/// A pipeline document as written by the user
#[derive(Debug, Deserialize)]
pub struct PipelineDocument {
    /// Pipeline name
    pub name: String,

    /// Raw settings, materialized against `PipelineSettings`
    #[serde(default)]
    pub settings: ValueMap,

    /// Transformer stages, applied in order
    #[serde(default)]
    pub transformers: Vec<ComponentSpec>,

    /// Post actions, run on every processed bulletin
    #[serde(default)]
    pub actions: Vec<ComponentSpec>,
}

/// One component declaration
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentSpec {
    /// Registered factory name
    #[serde(rename = "type")]
    pub kind: String,

    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,

    /// Predicate gating the component
    #[serde(default)]
    pub when: Option<Box<ComponentSpec>>,

    /// Options handed to the factory
    #[serde(default)]
    pub config: ValueMap,
}

impl ComponentSpec {
    /// Name used in logs and error messages
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}

impl PipelineDocument {
    /// Parse a document from YAML text
    pub fn parse(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).context("Failed to parse pipeline document")
    }

    /// Load a document, returning it with the directory relative paths resolve against
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, PathBuf)> {
        let path = path.as_ref();
        tracing::debug!("Loading pipeline document {}", path.display());
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let document = Self::parse(&source)?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((document, base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metforge_core::Value;

    #[test]
    fn test_parse_document() {
        let document = PipelineDocument::parse(
            r#"
name: nordic
settings:
  inputDirectory: in
  outputDirectory: out
transformers:
  - type: trim
  - type: regex_replace
    name: strip-auto
    when:
      type: kind
      config: { kinds: [METAR] }
    config:
      pattern: "AUTO "
      replacement: ""
actions:
  - type: archive
    config: { directory: metar }
"#,
        )
        .unwrap();

        assert_eq!(document.name, "nordic");
        assert_eq!(document.settings["inputDirectory"], Value::from("in"));
        assert_eq!(document.transformers.len(), 2);
        assert_eq!(document.transformers[0].label(), "trim");
        assert!(document.transformers[0].config.is_empty());

        let replace = &document.transformers[1];
        assert_eq!(replace.label(), "strip-auto");
        assert_eq!(replace.when.as_ref().unwrap().kind, "kind");
        assert_eq!(replace.config["replacement"], Value::from(""));
        assert_eq!(document.actions[0].kind, "archive");
    }

    #[test]
    fn test_missing_name_is_rejected() {
        assert!(PipelineDocument::parse("settings: {}").is_err());
    }
}
