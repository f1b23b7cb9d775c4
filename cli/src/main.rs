//! CITSM CLI: command-line interface for the ticket analytics core
//!
//! Loads a JSON/JSON Lines export of the ticket table, runs one dashboard pass
//! and prints the requested panels.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use citsm::cascade::{StageOptions, CONTRACT_STAGE, PERIOD_STAGE, REQUESTER_STAGE, SERVICE_STAGE, STATUS_STAGE};
use citsm::source::load_snapshot;
use citsm::{
    BucketRule, CategoryCount, Dashboard, DashboardConfig, DashboardViews, DateRange,
    JsonFileSource, Panel, Predicate, Selections,
};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "citsm", version, about = "ITSM ticket analytics")]
struct Cli {
    /// Ticket export (.json array or .jsonl)
    #[arg(long, global = true, env = "CITSM_INPUT")]
    input: Option<String>,

    /// Dashboard configuration (YAML)
    #[arg(long, global = true, env = "CITSM_CONFIG")]
    config: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Reference time for aging, `YYYY-MM-DDTHH:MM:SS` (default: now)
    #[arg(long, global = true)]
    now: Option<NaiveDateTime>,

    /// Log cascade decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    selection: SelectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SelectionArgs {
    /// Period start (inclusive)
    #[arg(long, global = true, requires = "until")]
    since: Option<NaiveDate>,

    /// Period end (inclusive)
    #[arg(long, global = true, requires = "since")]
    until: Option<NaiveDate>,

    #[arg(long, global = true)]
    contract: Option<String>,

    #[arg(long, global = true)]
    service: Option<String>,

    /// Requester, as if clicked in the requesters chart
    #[arg(long, global = true)]
    requester: Option<String>,

    /// Status, as if clicked in the status chart
    #[arg(long, global = true)]
    status: Option<String>,
}

impl SelectionArgs {
    fn to_selections(&self) -> Result<Selections> {
        let mut selections = Selections::new();
        if let (Some(start), Some(end)) = (self.since, self.until) {
            let range = DateRange::new(start, end);
            if !range.is_valid() {
                bail!("--since {} is after --until {}", start, end);
            }
            selections.set(PERIOD_STAGE, Some(Predicate::DateRange(range)));
        }
        for (stage, value) in [
            (CONTRACT_STAGE, &self.contract),
            (SERVICE_STAGE, &self.service),
            (REQUESTER_STAGE, &self.requester),
            (STATUS_STAGE, &self.status),
        ] {
            selections.set(stage, value.clone().map(Predicate::Equals));
        }
        Ok(selections)
    }
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// KPIs, charts, detail table and aging in one pass
    Dashboard {
        /// Detail table rows to print
        #[arg(long, default_value_t = 20)]
        rows: usize,
    },
    /// Opened / modified / closed counts per period
    Timeline {
        /// daily, weekly or monthly (overrides the config)
        #[arg(long)]
        bucket: Option<BucketRule>,
    },
    /// Oldest open tickets
    Aging {
        /// Entries to show (overrides the config)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Options and applied value of every cascade stage
    Options,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path))?,
        None => DashboardConfig::default(),
    };
    match &cli.command {
        Commands::Timeline { bucket: Some(rule) } => config.timeline.bucket_rule = *rule,
        Commands::Aging { top: Some(top) } => config.aging.top_k = *top,
        _ => {}
    }

    let input = cli
        .input
        .as_deref()
        .context("no input file (use --input or CITSM_INPUT)")?;
    let mut source = JsonFileSource::new(input);
    let snapshot = load_snapshot(&mut source, &config.columns)?;

    let now = cli.now.unwrap_or_else(|| Local::now().naive_local());
    let selections = cli.selection.to_selections()?;
    debug!("Selections: {:?}", selections);

    let dashboard = Dashboard::new(config)?;
    let views = dashboard.render(&snapshot, &selections, now);

    match cli.format {
        OutputFormat::Json => print_json(&cli.command, &views)?,
        OutputFormat::Table => match cli.command {
            Commands::Dashboard { rows } => print_dashboard(&views, rows),
            Commands::Timeline { .. } => print_timeline(&views),
            Commands::Aging { .. } => print_aging(&views),
            Commands::Options => print_options(&views),
        },
    }
    Ok(())
}

fn print_json(command: &Commands, views: &DashboardViews) -> Result<()> {
    let json = match command {
        Commands::Dashboard { .. } => serde_json::to_string_pretty(views)?,
        Commands::Timeline { .. } => serde_json::to_string_pretty(&views.timeline)?,
        Commands::Aging { .. } => serde_json::to_string_pretty(&serde_json::json!({
            "aging": views.aging,
            "gantt": views.gantt,
        }))?,
        Commands::Options => serde_json::to_string_pretty(&views.stages)?,
    };
    println!("{}", json);
    Ok(())
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn opt(value: Option<usize>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn print_dashboard(views: &DashboardViews, rows: usize) {
    let kpis = &views.kpis;
    println!("Tickets loaded: {}", views.loaded);
    println!("In scope:       {}", kpis.total);
    println!("Open:           {}", opt(kpis.open));
    println!("Closed:         {}", opt(kpis.closed));
    println!("Requesters:     {}", opt(kpis.distinct_requesters));
    println!("Services:       {}", opt(kpis.distinct_services));
    println!("Contracts:      {}", opt(kpis.distinct_contracts));

    print_stage_values(views);
    print_counts("Top requesters", &views.requesters);
    print_counts("Top services", &views.services);
    print_counts("Status", &views.status);

    println!("\nTickets");
    if views.table.rows.is_empty() {
        println!("(no results)");
    } else {
        let mut table = new_table();
        table.set_header(vec!["Ticket", "Opened", "Closed", "Requester", "Status", "Service"]);
        for record in views.table.rows.iter().take(rows) {
            table.add_row(vec![
                record.id.clone().unwrap_or_default(),
                format_time(record.opened_at),
                format_time(record.closed_at),
                record.requester.clone(),
                record.status.clone(),
                record.service_name.clone(),
            ]);
        }
        println!("{}", table);
        println!(
            "{} of {} row(s){}",
            rows.min(views.table.rows.len()),
            views.table.total,
            if views.table.truncated { " (capped)" } else { "" }
        );
    }

    print_aging(views);
}

fn print_stage_values(views: &DashboardViews) {
    let applied: Vec<String> = views
        .stages
        .iter()
        .filter_map(|s| s.applied.as_ref().map(|p| format!("{}={}", s.id, p)))
        .collect();
    if !applied.is_empty() {
        println!("Filters:        {}", applied.join(", "));
    }
}

fn print_counts(title: &str, panel: &Panel<Vec<CategoryCount>>) {
    println!("\n{}", title);
    match panel {
        Panel::Unavailable(field) => println!("(unavailable: no {} column)", field),
        Panel::Ready(counts) if counts.is_empty() => println!("(no results)"),
        Panel::Ready(counts) => {
            let total: usize = counts.iter().map(|c| c.count).sum();
            let mut table = new_table();
            table.set_header(vec!["Value", "Count", "%"]);
            for c in counts {
                table.add_row(vec![
                    c.value.clone(),
                    c.count.to_string(),
                    format!("{:.1}", c.share(total)),
                ]);
            }
            println!("{}", table);
        }
    }
}

fn print_timeline(views: &DashboardViews) {
    let timeline = &views.timeline;
    for field in &timeline.unavailable {
        println!("(no {} column)", field.name());
    }
    if timeline.is_empty() {
        println!("(no results)");
        return;
    }

    let mut table = new_table();
    let mut header = vec![format!("Period ({})", timeline.rule)];
    header.extend(timeline.metrics.iter().cloned());
    table.set_header(header);
    for row in &timeline.rows {
        let mut cells = vec![row.period_start.to_string()];
        cells.extend(row.counts.iter().map(|c| c.to_string()));
        table.add_row(cells);
    }
    println!("{}", table);
    println!("{} period(s)", timeline.rows.len());
}

fn print_aging(views: &DashboardViews) {
    println!("\nOldest open tickets");
    match &views.aging {
        Panel::Unavailable(field) => println!("(unavailable: no {} column)", field),
        Panel::Ready(entries) if entries.is_empty() => println!("(no results)"),
        Panel::Ready(entries) => {
            let mut table = new_table();
            table.set_header(vec!["Ticket", "Requester", "Status", "Opened", "Age (days)"]);
            for e in entries {
                table.add_row(vec![
                    e.id.clone().unwrap_or_default(),
                    e.requester.clone(),
                    e.status.clone(),
                    e.opened_at.format("%Y-%m-%d").to_string(),
                    e.age_days.to_string(),
                ]);
            }
            println!("{}", table);
        }
    }
}

fn print_options(views: &DashboardViews) {
    let mut table = new_table();
    table.set_header(vec!["Stage", "Field", "Status", "Options", "Applied", "Surviving"]);
    for stage in &views.stages {
        let options = match &stage.options {
            StageOptions::Dates(_) => stage
                .options
                .bounds()
                .map(|b| b.to_string())
                .unwrap_or_default(),
            StageOptions::Text(values) => summarize(values),
        };
        let mut applied = stage
            .applied
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        if let Some(adjustment) = &stage.adjustment {
            applied.push_str(&format!(" ({:?})", adjustment.reason));
        }
        table.add_row(vec![
            stage.id.clone(),
            stage.field.to_string(),
            format!("{:?}", stage.status),
            options,
            applied,
            stage.surviving.to_string(),
        ]);
    }
    println!("{}", table);
}

fn summarize(values: &[String]) -> String {
    const SHOWN: usize = 5;
    let mut shown: Vec<&str> = values.iter().take(SHOWN).map(String::as_str).collect();
    if values.len() > SHOWN {
        shown.push("…");
    }
    format!("{} [{}]", values.len(), shown.join(", "))
}

fn format_time(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
