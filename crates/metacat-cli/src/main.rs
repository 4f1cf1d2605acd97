//! `metacat` command-line front end

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use metacat_core::prelude::*;
use metacat_core::ExportConfig;
use metacat_filter::FilterForms;
use metacat_graph::{Category, EntityGraph};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AXIS_TICKS: usize = 8;

fn data_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("data")
            .long("data")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Dataset JSON file"),
    )
    .arg(
        Arg::new("filters")
            .long("filters")
            .value_parser(value_parser!(PathBuf))
            .help("Filter TOML file"),
    )
    .arg(
        Arg::new("config")
            .long("config")
            .value_parser(value_parser!(PathBuf))
            .help("Workbench configuration TOML file"),
    )
}

fn cli() -> Command {
    let categories: Vec<&'static str> = Category::ALL.iter().map(|c| c.name()).collect();
    Command::new("metacat")
        .version(metacat_core::VERSION)
        .about("Filter an intervention evidence catalog and meta-analyse the selection")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format"),
        )
        .subcommand(data_args(
            Command::new("summary").about("Counts of the displayed dataset"),
        ))
        .subcommand(
            data_args(Command::new("export").about("CSV of the displayed records"))
                .arg(
                    Arg::new("category")
                        .long("category")
                        .required(true)
                        .value_parser(categories)
                        .help("Category to export"),
                )
                .arg(
                    Arg::new("exclude")
                        .long("exclude")
                        .action(ArgAction::Append)
                        .help("Column to leave out (repeatable)"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file (stdout if omitted)"),
                ),
        )
        .subcommand(
            data_args(Command::new("analyze").about("Meta-analyse the displayed effects"))
                .arg(
                    Arg::new("program")
                        .long("program")
                        .help("Engine program, overriding the configuration"),
                )
                .arg(
                    Arg::new("arg")
                        .long("arg")
                        .action(ArgAction::Append)
                        .allow_hyphen_values(true)
                        .help("Engine argument (repeatable), overriding the configuration"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &ArgMatches) -> anyhow::Result<WorkbenchConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => WorkbenchConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(WorkbenchConfig::default()),
    }
}

fn load_session(args: &ArgMatches, export: ExportConfig) -> anyhow::Result<Session> {
    let data = args
        .get_one::<PathBuf>("data")
        .context("--data is required")?;
    let graph = EntityGraph::from_path(data)
        .with_context(|| format!("loading dataset {}", data.display()))?;
    let mut session = Session::new(Arc::new(graph)).with_export_config(export);

    if let Some(path) = args.get_one::<PathBuf>("filters") {
        let forms = FilterForms::from_path(path)
            .with_context(|| format!("reading filters {}", path.display()))?
            .into_forms();
        session
            .submit(&forms)
            .with_context(|| format!("applying filters {}", path.display()))?;
    }
    Ok(session)
}

fn summary(args: &ArgMatches) -> anyhow::Result<String> {
    let config = load_config(args)?;
    let session = load_session(args, config.export)?;
    let s = session.summary();
    let axis = session
        .effect_axis(AXIS_TICKS)
        .iter()
        .map(|t| format!("{t}"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "Papers:        {}\nStudies:       {}\nInterventions: {}\nOutcomes:      {}\nEffects:       {}\nParticipants:  {}\nAxis:          [{}]\n",
        s.papers, s.studies, s.interventions, s.outcomes, s.effects, s.participants, axis
    ))
}

fn export(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let session = load_session(args, config.export)?;
    let category: Category = args
        .get_one::<String>("category")
        .context("--category is required")?
        .parse()?;
    let excluded: Vec<&str> = args
        .get_many::<String>("exclude")
        .unwrap_or_default()
        .map(String::as_str)
        .collect();

    let csv = session.export_csv(category, &excluded)?;
    match args.get_one::<PathBuf>("out") {
        Some(path) => write_file(path, &csv)?,
        None => print!("{csv}"),
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "export written");
    Ok(())
}

fn engine_config(args: &ArgMatches, mut engine: EngineConfig) -> EngineConfig {
    if let Some(program) = args.get_one::<String>("program") {
        engine.program.clone_from(program);
        engine.args.clear();
    }
    if let Some(extra) = args.get_many::<String>("arg") {
        engine.args = extra.cloned().collect();
    }
    engine
}

async fn analyze(args: &ArgMatches) -> anyhow::Result<String> {
    let config = load_config(args)?;
    let session = load_session(args, config.export.clone())?;
    let request = session.analysis_request();
    if request.is_empty() {
        bail!("no effects selected; loosen the filters");
    }

    let engine = ProcessEngine::new(engine_config(args, config.engine));
    let orchestrator = MetaAnalysisOrchestrator::with_config(engine, config.analysis);
    let outcome = match orchestrator.initialize().await {
        Ok(()) => orchestrator.run(&request).await,
        Err(e) => Err(e),
    };
    orchestrator.engine().shutdown().await;
    let estimate = outcome.context("meta-analysis failed")?;

    if args.get_flag("json") {
        return Ok(serde_json::to_string_pretty(&estimate)?);
    }
    Ok(format_estimate(&estimate))
}

fn format_estimate(estimate: &Estimate) -> String {
    let mut out = format!(
        "Pooled effect: {:.3} [{:.3}, {:.3}]\nEffects:       {} in {} clusters\nP(superior):   {:.3}\n",
        estimate.estimate,
        estimate.ci_lower,
        estimate.ci_upper,
        estimate.effect_count,
        estimate.cluster_count,
        estimate.probability_of_superiority(),
    );
    let egger = &estimate.egger;
    if egger.p_value.is_finite() {
        out.push_str(&format!(
            "Egger test:    z = {:.2}, p = {:.3}\n",
            egger.z_value, egger.p_value
        ));
    } else {
        out.push_str("Egger test:    not estimated\n");
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let format = matches
        .get_one::<String>("log-format")
        .map_or("text", String::as_str);
    init_tracing(format);

    match matches.subcommand() {
        Some(("summary", args)) => print!("{}", summary(args)?),
        Some(("export", args)) => export(args)?,
        Some(("analyze", args)) => println!("{}", analyze(args).await?),
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}
