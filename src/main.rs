use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, ArgGroup, Parser};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use proctree::config::{Config, load_config, load_config_from_path};
use proctree::logging::init_tracing;
use proctree::report::{
    DisplayOptions, SortMode, SummaryView, render_list, render_subtree, render_summary,
    render_top, render_tree,
};
use proctree::system::collector::Collector;
use proctree::system::{ProcessSource, build_tree, summarize, top_cpu};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "proctree",
    version,
    about = "List processes, show the process tree and summarize resource usage",
    group(ArgGroup::new("view").args(["hierarchy", "summary", "top"]))
)]
struct Cli {
    /// Display the process hierarchy (parent-child relationships)
    #[arg(long, visible_alias = "tree")]
    hierarchy: bool,

    /// Only show the hierarchy below this PID
    #[arg(long, requires = "hierarchy")]
    pid: Option<u32>,

    /// Display the system resource summary
    #[arg(long)]
    summary: bool,

    /// Display the top N processes by CPU usage
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    top: Option<u32>,

    /// Number of entries in the summary's top lists
    #[arg(long, value_name = "N")]
    top_n: Option<usize>,

    /// Sort order for the process list: pid, cpu, memory, name
    #[arg(long)]
    sort: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    init_tracing(&config.logging, cli.verbose, cli.quiet)?;

    let mut collector = Collector::new(Duration::from_millis(config.general.cpu_sample_ms));
    let output = run(&cli, &config, &mut collector)?;
    print!("{output}");
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(top_n) = cli.top_n {
        config.general.top_n = top_n;
    }
    if let Some(ref sort) = cli.sort {
        config.general.default_sort = sort.clone();
    }

    config
}

fn run<S: ProcessSource>(cli: &Cli, config: &Config, source: &mut S) -> Result<String> {
    info!("scanning processes");
    let mut snapshot = source.snapshot()?.require_records()?;
    info!(count = snapshot.records.len(), "found processes");

    let opts = DisplayOptions {
        name_width: config.display.name_width,
        show_user: config.display.show_user,
    };

    if cli.hierarchy {
        let forest = build_tree(&snapshot.records);
        return match cli.pid {
            Some(pid) => {
                let node = forest
                    .find(pid)
                    .ok_or_else(|| eyre!("PID {pid} is not in the current snapshot"))?;
                if cli.json {
                    to_json(node)
                } else {
                    Ok(render_subtree(node))
                }
            }
            None if cli.json => to_json(&forest),
            None => Ok(render_tree(&forest)),
        };
    }

    if cli.summary {
        let summary = summarize(&snapshot.records, config.general.top_n);
        return if cli.json {
            to_json(&SummaryView::new(&snapshot, &summary))
        } else {
            Ok(render_summary(&snapshot, &summary))
        };
    }

    if let Some(requested) = cli.top {
        let mut count = requested as usize;
        if count > snapshot.records.len() {
            warn!(
                requested = count,
                available = snapshot.records.len(),
                "fewer processes than requested"
            );
            count = snapshot.records.len();
        }
        let top = top_cpu(&snapshot.records, count);
        return if cli.json {
            to_json(&top)
        } else {
            Ok(render_top(&snapshot.records, &top, &opts))
        };
    }

    SortMode::from_str_config(&config.general.default_sort).sort(&mut snapshot.records);
    if cli.json {
        to_json(&snapshot.records)
    } else {
        Ok(render_list(&snapshot.records, &opts))
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}
