//! List built-in components and their options

use std::path::Path;

use anyhow::Result;
use metforge_core::{ConfigMaterializer, FactoryRegistry, Schema};

use crate::catalog::Catalog;
use crate::settings::PipelineSettings;

/// Run the schemas command
pub async fn run() -> Result<()> {
    let catalog = Catalog::builtin(Path::new("."))?;

    let settings = ConfigMaterializer::new().validate(&PipelineSettings::descriptor())?;
    println!("settings ({}):", settings.name());
    println!("  {}", settings.option_names().join(", "));

    section("transformers", &catalog.transformers);
    section("predicates", &catalog.predicates);
    section("actions", &catalog.actions);
    Ok(())
}

fn section<T: 'static>(title: &str, registry: &FactoryRegistry<T>) {
    println!("{}:", title);
    for (name, factory) in registry.iter() {
        println!("  {} [{}]", name, factory.option_names().join(", "));
    }
}
