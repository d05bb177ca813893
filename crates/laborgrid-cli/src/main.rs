// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use laborgrid_app::{AppState, RosterModel};
use laborgrid_db::Store;
use laborgrid_testkit::RosterFaker;
use runtime::DbRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

const DEMO_SEED: u64 = 1602;
const DEMO_DWARVES: usize = 48;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `laborgrid --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_path = logging::init_logging(&laborgrid_db::data_dir()?, options.verbose)?;

    let mut store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or LABORGRID_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        seed_demo_roster(&mut store)?;
    }

    store
        .grid_settings()
        .context("read grid settings; fix or delete the offending rows in the settings table")?;
    let group_by = match store.group_by_preference()? {
        Some(group_by) => group_by,
        None => config.group_by(),
    };
    info!(
        db = %db_path.display(),
        log = %log_path.display(),
        dwarves = store.dwarf_count()?,
        group_by = group_by.as_str(),
        "startup checks passed"
    );
    if options.check_only {
        return Ok(());
    }

    let mut state = AppState {
        group_by,
        ..AppState::default()
    };
    let mut model = RosterModel::new(config.layout());
    let mut runtime = DbRuntime::new(&mut store);
    laborgrid_tui::run_app(&mut state, &mut model, &mut runtime, config.grid_options())
}

fn seed_demo_roster(store: &mut Store) -> Result<()> {
    let roster = RosterFaker::new(DEMO_SEED).roster(DEMO_DWARVES);
    for dwarf in &roster {
        store
            .insert_dwarf(dwarf)
            .with_context(|| format!("seed demo dwarf {}", dwarf.id))?;
    }
    info!(dwarves = roster.len(), seed = DEMO_SEED, "seeded demo roster");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    verbose: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        verbose: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--verbose" | "-v" => {
                options.verbose = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

const HELP: &str = "\
usage: laborgrid [options]

Shows the dwarf roster as a grid of labors. Press g to change grouping
and ? for key bindings.

options:
  --config <path>          read this config file instead of the default
  --print-config-path      print the config path and exit
  --print-path             print the database path and exit
  --print-example-config   print a commented config template and exit
  --demo                   use an in-memory database filled with generated dwarves
  --check                  check config, database and settings, then exit
  -v, --verbose            log at debug level
  -h, --help               print this help
";

fn print_help() {
    print!("{HELP}");
}
