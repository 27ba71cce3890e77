//! Command implementations

use anyhow::{Context, Result};
use tracing::info;

use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{InspectArgs, TrimArgs};
use crate::domain::model::TimeSpec;

/// Execute the trim command
pub async fn trim(container: &DefaultAppContainer, args: TrimArgs) -> Result<()> {
    // Parse before touching the file so typos fail fast
    let start = parse_time("start", args.start.as_deref())?;
    let end = parse_time("end", args.end.as_deref())?;

    let mut session = container.session();
    info!("Input: {}", args.input.display());

    let loaded = match session.select_file(&args.input).await {
        Ok(()) => session.wait_for_metadata().await.map(|_| ()),
        Err(e) => Err(e),
    };
    println!("{}", session.status());
    loaded.with_context(|| format!("Failed to load {}", args.input.display()))?;

    // End first: a start beyond the default window would otherwise clamp to it
    if let Some(end) = end {
        session.set_end(end.seconds);
    }
    if let Some(start) = start {
        session.set_start(start.seconds);
    }

    let range = session.workspace().range();
    println!(
        "Range: {} - {} of {}",
        TimeSpec::from_seconds(range.start()),
        TimeSpec::from_seconds(range.end()),
        TimeSpec::from_seconds(session.workspace().duration())
    );

    let trimmed = session.trim().await;
    println!("{}", session.status());
    trimmed.context("Trim failed")?;

    let dir = container.config().output.directory.clone();
    let path = session.download(&dir).await.context("Failed to save clip")?;
    println!("Saved {}", path.display());

    let preview = session
        .preview(&path)
        .await
        .context("Trimmed clip could not be read back")?;
    println!(
        "Preview: {} container, {} streams, {}",
        preview.container,
        preview.streams.len(),
        TimeSpec::from_seconds(preview.duration)
    );

    Ok(())
}

/// Execute the inspect command
pub async fn inspect(container: &DefaultAppContainer, args: InspectArgs) -> Result<()> {
    let report = container
        .inspect_interactor()
        .inspect(&args.input)
        .await
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File:      {}", args.input.display());
    println!("Container: {}", report.probe.container);
    println!("Duration:  {}", TimeSpec::from_seconds(report.probe.duration));
    println!("Size:      {} bytes", report.probe.file_size);
    for stream in &report.probe.streams {
        println!("  #{} {} ({})", stream.index, stream.kind, stream.codec);
    }
    println!(
        "Default range: {} - {}",
        TimeSpec::from_seconds(report.default_start),
        TimeSpec::from_seconds(report.default_end)
    );
    Ok(())
}

fn parse_time(which: &str, value: Option<&str>) -> Result<Option<TimeSpec>> {
    value
        .map(|v| TimeSpec::parse(v).with_context(|| format!("Invalid {} time '{}'", which, v)))
        .transpose()
}
