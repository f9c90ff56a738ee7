// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesis entry point
//!
//! Reads settings from the environment, runs one synthesis pass over the
//! checked-in tables and writes the manifest as JSON.
//!
//! Run with: DEPLOYMENT_ENV=prod cargo run --bin passwordless-synth
//!
//! Required variables:
//! 1. CDK_DEFAULT_ACCOUNT - target account id
//! 2. OBAN_PRO_AUTH_KEY - consumed by the image build, never written out
//!
//! Optional: `{ENV}_{tools|commerce}_ZONE_ID` (uppercased, e.g.
//! DEV_TOOLS_ZONE_ID) replaces a checked-in hosted zone id.

use anyhow::{Context, Result};
use passwordless_infra::{DomainRegistry, EnvironmentRegistry, SynthesisSettings, Synthesizer};
use std::io::Write;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the manifest
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = SynthesisSettings::from_env().context("Failed to load settings")?;
    info!(
        environment = %settings.environment,
        regions = ?settings.regions,
        "Starting synthesis"
    );

    let environments = EnvironmentRegistry::standard().context("Invalid environment table")?;
    let domains = DomainRegistry::standard()
        .and_then(|registry| registry.with_zone_ids(&settings.zone_ids))
        .context("Invalid domain table")?;
    for selector in domains.placeholder_zones(settings.environment) {
        warn!(
            environment = %settings.environment,
            %selector,
            "hosted zone id is a placeholder, set {}",
            passwordless_infra::settings::zone_id_var(settings.environment, selector)
        );
    }

    let app = Synthesizer::new(&environments, &domains)
        .run(&settings)
        .context("Synthesis failed")?;
    let manifest = app.to_json()?;

    match &settings.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, manifest)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Manifest written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(manifest.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    info!(stacks = app.stacks().count(), "Synthesis complete");
    Ok(())
}
