use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command, parser::ValueSource};
use handover_core::{PageTemplate, Pipeline, PipelineBuilder};
use handover_watch::{ChangeEvents, ChangeWatcher, DEFAULT_DEBOUNCE};
use std::sync::Arc;
use tracing::info;

use crate::config::HandoverConfig;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("DIR")
                .help("Source directory containing markdown files [default: ./src]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for generated pages [default: ./dist]"),
        )
        .arg(
            Arg::new("template")
                .short('t')
                .long("template")
                .value_name("FILE")
                .help("Page template with {{title}}, {{operation}} and {{content}} [default: ./template.html]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./handover.toml]"),
        )
}

/// Ids of the flags `add_build_args` defines.
pub const BUILD_ARGS: [&str; 4] = ["source", "output", "template", "config"];

/// Build flags given before `build` would otherwise be dropped silently.
pub fn reject_root_build_args(root: &ArgMatches) -> Result<()> {
    for id in BUILD_ARGS {
        if root.value_source(id) == Some(ValueSource::CommandLine) {
            bail!("--{id} was given before `build`; pass it after the subcommand");
        }
    }
    Ok(())
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about(
        "Convert the source tree to HTML pages; keeps watching when HANDOVER_MODE is development",
    )
}

/// Everything a run needs, assembled before the first file is touched.
pub struct Prepared {
    pub pipeline: Arc<Pipeline>,
    pub watcher: Option<(Arc<ChangeWatcher>, ChangeEvents)>,
}

/// Load the template and wire the pipeline for the configured mode. A
/// missing or malformed template stops the run here.
pub async fn prepare(config: &HandoverConfig) -> Result<Prepared> {
    let build_config = config.build_config();

    let template = PageTemplate::load(&build_config.template)
        .await
        .context("cannot start without a page template")?;

    let watcher = ChangeWatcher::for_mode(config.site.mode(), &build_config.source, DEFAULT_DEBOUNCE)?;

    let mut builder = PipelineBuilder::new()
        .source_dir(&build_config.source)
        .output_dir(&build_config.output)
        .template(Arc::new(template))
        .page_settings(config.site.page.clone());
    if let Some((hook, _)) = &watcher {
        builder = builder.hook(hook.clone());
    }

    Ok(Prepared {
        pipeline: Arc::new(builder.build()?),
        watcher,
    })
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = HandoverConfig::load(args)?;
    let Prepared { pipeline, watcher } = prepare(&config).await?;

    let report = pipeline.build().await;
    info!(
        written = report.written,
        failed = report.failed,
        skipped = report.skipped,
        "converted {} into {}: {} written, {} failed, {} skipped",
        pipeline.source_root().display(),
        pipeline.output_root().display(),
        report.written,
        report.failed,
        report.skipped
    );

    let Some((watcher, events)) = watcher else {
        return Ok(());
    };

    info!(
        "watching {} source files for changes, press Ctrl-C to stop",
        watcher.watched_count()
    );
    tokio::select! {
        _ = handover_watch::serve(Arc::clone(&pipeline), events) => {}
        _ = tokio::signal::ctrl_c() => info!("stopping"),
    }

    Ok(())
}
