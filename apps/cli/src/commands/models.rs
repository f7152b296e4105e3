//! Models command implementation.

use super::types::ModelsCommand;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use enigma_core::inference::DEFAULT_REGISTRY_NAME;
use enigma_core::{ArtifactRegistry, Config, open_registry};
use serde_json::json;

/// Execute the models command.
pub fn execute(config: &Config, command: ModelsCommand) -> Result<()> {
    let registry = open_registry(config).context("Failed to open the model registry")?;
    match command {
        ModelsCommand::List { json } => list_models(&registry, json),
        ModelsCommand::Verify { name, version } => {
            let name = match name {
                Some(n) => n,
                None => config.get_as_or("model.registry_name", DEFAULT_REGISTRY_NAME.to_string())?,
            };
            verify_model(&registry, &name, version)
        }
    }
}

fn list_models(registry: &ArtifactRegistry, json_output: bool) -> Result<()> {
    let models = registry.list()?;

    if json_output {
        let mut entries = Vec::new();
        for (name, versions) in &models {
            let latest = match versions.last() {
                Some(v) => registry.metadata(name, *v)?,
                None => None,
            };
            entries.push(json!({ "name": name, "versions": versions, "latest": latest }));
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if models.is_empty() {
        println!("{}", format!("No models in {}", registry.root().display()).yellow());
        return Ok(());
    }

    println!("{}", format!("Registered models ({})", models.len()).bold().cyan());
    for (name, versions) in &models {
        let listed: Vec<String> = versions.iter().map(|v| format!("v{v}")).collect();
        println!("  {} {}", name.bold(), listed.join(", ").dimmed());
    }
    Ok(())
}

fn verify_model(registry: &ArtifactRegistry, name: &str, version: Option<u32>) -> Result<()> {
    let verification = registry.verify(name, version)?;
    let meta = &verification.metadata;
    if verification.is_valid() {
        println!("{} {} v{} fingerprint {}", "OK".green().bold(), meta.model_name, meta.version, meta.fingerprint_sha256);
        Ok(())
    } else {
        bail!(
            "Fingerprint mismatch for {} v{}: recorded {}, actual {}",
            meta.model_name,
            meta.version,
            meta.fingerprint_sha256,
            verification.actual_fingerprint
        )
    }
}
