//! Pipeline assembly
//!
//! Turns a [`PipelineDocument`] into shared, immutable components. Any
//! misconfiguration fails the whole assembly; nothing is skipped or defaulted
//! silently.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metforge_core::{ActionError, Bulletin, ConfigMaterializer, ConfigValue, Schema};

use crate::catalog::{Action, Catalog, Predicate, Transformer};
use crate::project::{ComponentSpec, PipelineDocument};
use crate::settings::PipelineSettings;

/// One gated component
pub struct Stage<T> {
    pub name: String,
    pub component: T,
    pub when: Option<Predicate>,
}

impl<T> Stage<T> {
    fn is_active(&self, bulletin: &Bulletin) -> bool {
        self.when.as_ref().is_none_or(|p| p.is_active(bulletin))
    }
}

/// Outcome of running the actions for one bulletin
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub applied: usize,
    pub failed: usize,
}

/// An assembled pipeline
pub struct Pipeline {
    name: String,
    settings: PipelineSettings,
    settings_value: ConfigValue,
    input_directory: PathBuf,
    transformers: Vec<Stage<Transformer>>,
    actions: Vec<Stage<Action>>,
}

impl Pipeline {
    /// Materialize settings and build every declared component
    pub fn assemble(document: &PipelineDocument, base: &Path) -> Result<Self> {
        let materializer = ConfigMaterializer::new();
        let settings_value = materializer
            .materialize(&PipelineSettings::descriptor(), &document.settings)
            .context("Invalid pipeline settings")?;
        let settings = PipelineSettings::from_config(settings_value.clone())?;

        let catalog = Catalog::builtin(&base.join(&settings.output_directory))?;

        let transformers = document
            .transformers
            .iter()
            .map(|declared| {
                let component = catalog
                    .transformers
                    .create(&declared.kind, &declared.config)
                    .with_context(|| format!("Failed to build transformer '{}'", declared.label()))?;
                stage(&catalog, declared, component)
            })
            .collect::<Result<Vec<_>>>()?;

        let actions = document
            .actions
            .iter()
            .map(|declared| {
                let component = catalog
                    .actions
                    .create(&declared.kind, &declared.config)
                    .with_context(|| format!("Failed to build action '{}'", declared.label()))?;
                stage(&catalog, declared, component)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Assembled pipeline '{}': {} transformers, {} actions",
            document.name,
            transformers.len(),
            actions.len()
        );

        Ok(Self {
            name: document.name.clone(),
            input_directory: base.join(&settings.input_directory),
            settings,
            settings_value,
            transformers,
            actions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Settings as materialized, for display
    pub fn settings_value(&self) -> &ConfigValue {
        &self.settings_value
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    pub fn transformers(&self) -> &[Stage<Transformer>] {
        &self.transformers
    }

    pub fn actions(&self) -> &[Stage<Action>] {
        &self.actions
    }

    /// Apply every active transformer in order
    ///
    /// Each `when` predicate sees the output of the stages before it.
    pub fn transform(&self, bulletin: Bulletin) -> Bulletin {
        self.transformers.iter().fold(bulletin, |current, stage| {
            if stage.is_active(&current) {
                stage.component.transform(current)
            } else {
                current
            }
        })
    }

    /// Run every active action, retrying failures per the retry settings
    pub fn deliver(&self, bulletin: &Bulletin) -> Delivery {
        let mut delivery = Delivery::default();
        for stage in self.actions.iter().filter(|s| s.is_active(bulletin)) {
            match self.apply_with_retry(stage, bulletin) {
                Ok(()) => delivery.applied += 1,
                Err(err) => {
                    tracing::warn!(
                        "Action '{}' failed for {} {}: {}",
                        stage.name,
                        bulletin.kind,
                        bulletin.station,
                        err
                    );
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }

    fn apply_with_retry(&self, stage: &Stage<Action>, bulletin: &Bulletin) -> Result<(), ActionError> {
        let (attempts, delay) = match &self.settings.retry {
            Some(retry) => (retry.attempts(), retry.delay()),
            None => (1, std::time::Duration::ZERO),
        };
        let mut attempt = 1;
        loop {
            match stage.component.apply(bulletin) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    tracing::debug!(
                        "Action '{}' attempt {}/{} failed: {}",
                        stage.name,
                        attempt,
                        attempts,
                        err
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// Pairs a built component with its `when` predicate, if any.
fn stage<T>(catalog: &Catalog, declared: &ComponentSpec, component: T) -> Result<Stage<T>> {
    let when = declared
        .when
        .as_deref()
        .map(|predicate| {
            catalog
                .predicates
                .create(&predicate.kind, &predicate.config)
                .with_context(|| {
                    format!(
                        "Failed to build predicate '{}' for '{}'",
                        predicate.label(),
                        declared.label()
                    )
                })
        })
        .transpose()?;
    Ok(Stage {
        name: declared.label().to_string(),
        component,
        when,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use metforge_core::MessageTransformer;
    use std::sync::Arc;

    fn document(source: &str) -> PipelineDocument {
        PipelineDocument::parse(source).unwrap()
    }

    fn bulletin(kind: &str, station: &str, text: &str) -> Bulletin {
        Bulletin {
            kind: kind.to_string(),
            station: station.to_string(),
            issued: "041020Z".to_string(),
            text: text.to_string(),
            source: "in.txt".to_string(),
        }
    }

    const DOCUMENT: &str = r#"
name: nordic
settings:
  inputDirectory: in
  outputDirectory: out
transformers:
  - type: trim
    config: { collapseWhitespace: true }
  - type: uppercase
    when: { type: station, config: { stations: [EFHK] } }
actions:
  - type: archive
    when: { type: kind, config: { kinds: [METAR] } }
    config: { directory: metar }
"#;

    #[test]
    fn test_assemble_and_transform() {
        let pipeline = Pipeline::assemble(&document(DOCUMENT), Path::new("/data")).unwrap();
        assert_eq!(pipeline.name(), "nordic");
        assert_eq!(pipeline.input_directory(), Path::new("/data/in"));
        assert_eq!(pipeline.transformers().len(), 2);

        let helsinki = pipeline.transform(bulletin("METAR", "EFHK", "  metar  efhk "));
        assert_eq!(helsinki.text, "METAR EFHK");
        let stockholm = pipeline.transform(bulletin("METAR", "ESSA", "  metar  essa "));
        assert_eq!(stockholm.text, "metar essa");
    }

    struct Relocate(&'static str);

    impl MessageTransformer for Relocate {
        fn transform(&self, mut bulletin: Bulletin) -> Bulletin {
            bulletin.station = self.0.to_string();
            bulletin
        }
    }

    #[test]
    fn test_predicates_see_earlier_stage_output() {
        let mut pipeline = Pipeline::assemble(&document(DOCUMENT), Path::new("/data")).unwrap();
        let relocate: Transformer = Arc::new(Relocate("EFHK"));
        pipeline.transformers.insert(
            0,
            Stage {
                name: "relocate".to_string(),
                component: relocate,
                when: None,
            },
        );

        let moved = pipeline.transform(bulletin("METAR", "ESSA", "  metar  essa "));
        assert_eq!(moved.station, "EFHK");
        assert_eq!(moved.text, "METAR ESSA");
    }

    #[test]
    fn test_deliver_respects_predicates() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::assemble(&document(DOCUMENT), dir.path()).unwrap();

        let delivery = pipeline.deliver(&bulletin("METAR", "EFHK", "METAR EFHK="));
        assert_eq!(delivery, Delivery { applied: 1, failed: 0 });
        let delivery = pipeline.deliver(&bulletin("TAF", "EFHK", "TAF EFHK="));
        assert_eq!(delivery, Delivery::default());

        assert!(dir.path().join("out/metar/METAR_EFHK.txt").exists());
    }

    #[test]
    fn test_unknown_component_type_fails_assembly() {
        let source = DOCUMENT.replace("type: uppercase", "type: lowercase");
        let err = Pipeline::assemble(&document(&source), Path::new(".")).err().unwrap();
        assert!(format!("{:#}", err).contains("lowercase"));
    }

    #[test]
    fn test_bad_settings_fail_assembly() {
        let source = DOCUMENT.replace("outputDirectory: out", "outputDir: out");
        let err = Pipeline::assemble(&document(&source), Path::new(".")).err().unwrap();
        let message = format!("{:#}", err);
        assert!(message.contains("Invalid pipeline settings"));
        assert!(message.contains("outputDir"));
    }
}
