#![deny(warnings)]

use anyhow::{bail, Context, Result};
use data_pipeline::{build_catalog_file, SourceData};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [input, output] = args.as_slice() else {
        bail!("usage: build_catalog <source.json> <catalog.json>");
    };

    let text = std::fs::read_to_string(input).with_context(|| format!("reading {input}"))?;
    let source: SourceData = serde_json::from_str(&text).context("parsing source data")?;
    let file = build_catalog_file(source);
    // Validate before writing so a bad source never produces a catalog file.
    let catalog = file.clone().into_catalog()?;
    std::fs::write(output, serde_json::to_string_pretty(&file)?)
        .with_context(|| format!("writing {output}"))?;
    info!(
        operators = catalog.operators().count(),
        items = catalog.items().count(),
        %output,
        "catalog written"
    );
    Ok(())
}
