use clap::Parser;
use log::LevelFilter;
use plantrace::trace::{LogSink, TraceConfig, TraceStyle, DEFAULT_MAX_DEPTH};
use plantrace::{bin_utils, logging, Catalog, CursorOptions, Engine};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Plans SQL queries against a statistics catalog and traces every path the optimizer considered.
#[derive(Parser)]
struct Args {
    /// CSV file of `name,rows,width,columns,indexed` table statistics.
    #[arg(short, long)]
    catalog: PathBuf,

    #[arg(long, default_value_t = TraceStyle::Rich)]
    style: TraceStyle,

    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[arg(long)]
    no_plan: bool,

    #[arg(long)]
    no_join_rels: bool,

    /// Print each selected plan as a tree on stdout.
    #[arg(long)]
    explain: bool,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// `;`-separated SQL script to plan after any queries given as arguments.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Write per-query planning stats to this CSV file.
    #[arg(long)]
    stats: Option<PathBuf>,

    sql: Vec<String>,
}

#[derive(Serialize)]
struct Record {
    query_num: usize,
    plan: String,
    startup_cost: f64,
    total_cost: f64,
    rows: f64,
    trace_lines: usize,
    plan_time_ms: u128,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = logging::init(args.log_level) {
        eprintln!("Could not install logger: {}", err);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::from_csv(&args.catalog)?;
    log::info!(
        "loaded {} tables from {}",
        catalog.len(),
        args.catalog.display()
    );

    let trace_config = TraceConfig::for_style(args.style)
        .with_max_depth(args.max_depth)
        .set_include_plan(args.style == TraceStyle::Rich && !args.no_plan)
        .set_include_join_rels(args.style == TraceStyle::Rich && !args.no_join_rels);
    let mut engine = Engine::new(catalog);
    engine
        .with_trace_config(trace_config)
        .enable_tracing(LogSink::new());

    let mut texts = args.sql.clone();
    if let Some(file) = &args.file {
        texts.extend(bin_utils::read_queries(file)?);
    }
    if texts.is_empty() {
        return Err("no queries given".into());
    }

    let mut records = vec![];
    for text in &texts {
        let queries = engine.make_parser().parse(text)?;
        for query in &queries {
            let query_num = records.len() + 1;
            let before = engine.stats();
            let stmt = engine.plan_query(query, text, CursorOptions::default(), &[])?;
            let after = engine.stats();

            if args.explain {
                println!("-- query {}: {}", query_num, query);
                println!("{}", stmt);
            }
            records.push(Record {
                query_num,
                plan: stmt.plan_tree.kind.to_string(),
                startup_cost: stmt.plan_tree.startup_cost,
                total_cost: stmt.plan_tree.total_cost,
                rows: stmt.plan_tree.rows,
                trace_lines: after.trace_lines - before.trace_lines,
                plan_time_ms: after.plan_time_ms - before.plan_time_ms,
            });
        }
    }

    if let Some(stats) = &args.stats {
        bin_utils::write_records(stats, records)?;
    }
    Ok(())
}
