//! Batch form filling driven by a TOML configuration and JSON record files.

pub mod config;
pub mod data;

use anyhow::Context;
use config::Config;
use formfill_core::{discover_template, FormFiller};
use std::fs;
use std::path::PathBuf;

/// Fill every data file's group and return the merged documents written.
pub fn run(config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let template = discover_template(&config.template.dir)?;
    let filler = FormFiller::new(&template, config.fill_options())
        .with_context(|| format!("Failed to load template {}", template.display()))?;

    let groups = data::load_groups(
        &config.data.dir,
        &config.values,
        config.data.group_key_field.as_deref(),
    )?;

    fs::create_dir_all(&config.output.dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.dir.display()
        )
    })?;

    let mut written = Vec::with_capacity(groups.len());
    for group in &groups {
        let path = filler
            .run_group(group, &config.output.prefix, &config.output.dir)
            .with_context(|| format!("Failed to generate group {:?}", group.key()))?;
        tracing::info!("Created {}", path.display());
        written.push(path);
    }
    Ok(written)
}
