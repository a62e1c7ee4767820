//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::category::{Category, StageProfile, VolatilityBand, VolatilityTable};
use crate::domain::config_validation::{optional_value, parse_names, validate_simulation_config};
use crate::domain::error::WavetraderError;
use crate::domain::price_engine::{PreviewStep, PriceEngine, PriceRange};
use crate::domain::session::{RoundRecord, Session, SessionResult, SimulationConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "wavetrader", about = "Round-based market simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation session
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instruments: PathBuf,
        #[arg(long)]
        orders: Option<PathBuf>,
        #[arg(short, long)]
        rounds: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        /// Directory for prices.csv and net_worth.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Project future prices of one instrument
    Preview {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        instruments: PathBuf,
        #[arg(long)]
        instrument: String,
        #[arg(short, long, default_value_t = 10)]
        rounds: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List instruments with their category and volatility band
    Instruments {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        instruments: PathBuf,
    },
    /// Validate a simulation configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate {
            config,
            instruments,
            orders,
            rounds,
            seed,
            output,
        } => run_simulate(
            &config,
            &instruments,
            orders.as_ref(),
            rounds,
            seed,
            output.as_ref(),
        ),
        Command::Preview {
            config,
            instruments,
            instrument,
            rounds,
            seed,
        } => run_preview(config.as_ref(), &instruments, &instrument, rounds, seed),
        Command::Instruments {
            config,
            instruments,
        } => run_instruments(config.as_ref(), &instruments),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Load, validate and build the simulation config; defaults when no file is
/// given.
fn load_simulation_config(path: Option<&PathBuf>) -> Result<SimulationConfig, ExitCode> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    validate_simulation_config(&adapter)
        .and_then(|()| build_simulation_config(&adapter))
        .map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        })
}

fn run_simulate(
    config_path: &PathBuf,
    instruments_path: &Path,
    orders_path: Option<&PathBuf>,
    rounds: Option<u32>,
    seed: Option<u64>,
    output_dir: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: config and overrides
    let mut config = match load_simulation_config(Some(config_path)) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = apply_overrides(&mut config, rounds, seed) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: data sources
    let mut data_port = CsvAdapter::new(instruments_path.to_path_buf());
    if let Some(path) = orders_path {
        data_port = data_port.with_orders(path.clone());
    }

    // Stage 3: run and report
    let reporter = CsvReportAdapter::new();
    let report = output_dir.map(|dir| (&reporter as &dyn ReportPort, dir.as_path()));
    match run_simulation_pipeline(&data_port, &config, report) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Apply `--rounds` / `--seed` on top of the file configuration.
pub fn apply_overrides(
    config: &mut SimulationConfig,
    rounds: Option<u32>,
    seed: Option<u64>,
) -> Result<(), WavetraderError> {
    if let Some(rounds) = rounds {
        if rounds == 0 {
            return Err(WavetraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "rounds".into(),
                reason: "rounds must be at least 1".into(),
            });
        }
        config.rounds = rounds;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(())
}

pub fn build_simulation_config(
    adapter: &dyn ConfigPort,
) -> Result<SimulationConfig, WavetraderError> {
    let defaults = SimulationConfig::default();
    let rounds = optional_value::<u32>(adapter, "simulation", "rounds")?
        .unwrap_or(defaults.rounds);
    let price_range = PriceRange::new(
        optional_value(adapter, "pricing", "initial_price_min")?
            .unwrap_or(defaults.price_range.min()),
        optional_value(adapter, "pricing", "initial_price_max")?
            .unwrap_or(defaults.price_range.max()),
    )?;

    Ok(SimulationConfig {
        seed: optional_value(adapter, "simulation", "seed")?,
        rounds,
        active_instruments: optional_value(adapter, "simulation", "active_instruments")?,
        initial_cash: optional_value(adapter, "simulation", "initial_cash")?
            .unwrap_or(defaults.initial_cash),
        holders: resolve_holders(adapter).unwrap_or(defaults.holders),
        price_range,
        volatility: build_volatility_table(adapter)?,
    })
}

/// Stage bands and modifiers from `[volatility]`; missing keys keep the
/// built-in values.
pub fn build_volatility_table(
    adapter: &dyn ConfigPort,
) -> Result<VolatilityTable, WavetraderError> {
    let mut table = VolatilityTable::default();
    for stage in Category::STAGES {
        let Some(current) = table.stage(stage).copied() else {
            continue;
        };
        let prefix = stage.as_str().to_lowercase();
        let band = read_band(adapter, &prefix, current.band)?;
        let modifier = optional_value(adapter, "volatility", &format!("{prefix}_modifier"))?
            .unwrap_or(current.modifier);
        table.set_stage(stage, StageProfile::new(band, modifier)?)?;
    }
    let band = read_band(adapter, "default", table.band(Category::Unclassified))?;
    table.set_unclassified_band(band);
    Ok(table)
}

fn read_band(
    adapter: &dyn ConfigPort,
    prefix: &str,
    fallback: VolatilityBand,
) -> Result<VolatilityBand, WavetraderError> {
    let min = optional_value(adapter, "volatility", &format!("{prefix}_min"))?
        .unwrap_or(fallback.min());
    let max = optional_value(adapter, "volatility", &format!("{prefix}_max"))?
        .unwrap_or(fallback.max());
    VolatilityBand::new(min, max)
}

/// Holder names from `[simulation] holders`; `None` when unset or blank.
pub fn resolve_holders(config: &dyn ConfigPort) -> Option<Vec<String>> {
    let holders = parse_names(&config.get_string("simulation", "holders")?);
    if holders.is_empty() {
        None
    } else {
        Some(holders)
    }
}

pub fn run_simulation_pipeline(
    data_port: &dyn DataPort,
    config: &SimulationConfig,
    report: Option<(&dyn ReportPort, &Path)>,
) -> Result<SessionResult, WavetraderError> {
    let universe = data_port.load_instruments()?;
    let orders = data_port.load_orders()?;
    eprintln!(
        "Loaded {} instruments and {} orders",
        universe.len(),
        orders.len()
    );

    let session = Session::new(config, &universe)?;
    print_opening(&session);

    eprintln!(
        "Running {} rounds for {} holders",
        config.rounds,
        config.holders.len()
    );
    let result = session.run(&orders)?;
    for record in &result.rounds {
        print_round(record);
    }
    if result.unscheduled > 0 {
        eprintln!(
            "warning: {} orders scheduled outside rounds 1..={} were skipped",
            result.unscheduled, config.rounds
        );
    }
    print_standings(&result);

    if let Some((port, dir)) = report {
        let prices = dir.join("prices.csv");
        let net_worth = dir.join("net_worth.csv");
        port.write_prices(&result, &prices)?;
        port.write_net_worth(&result, &net_worth)?;
        eprintln!("\nReports written to: {}", dir.display());
    }
    Ok(result)
}

fn print_opening(session: &Session) {
    println!("=== Opening Prices ===");
    for engine in session.coordinator().engines() {
        println!(
            "  {:<12} {:>10.2}  vol {:>5.1}%  {}",
            engine.name(),
            engine.price(),
            engine.volatility() * 100.0,
            engine.category()
        );
    }
}

fn print_round(record: &RoundRecord) {
    println!("\n=== Round {} ===", record.round);
    for fill in &record.fills {
        println!(
            "  {} {:?} {} x {} @ {:.2}",
            fill.holder, fill.side, fill.quantity, fill.instrument, fill.price
        );
    }
    for rejection in &record.rejections {
        println!(
            "  rejected: {} {} x {} ({})",
            rejection.order.holder,
            rejection.order.quantity,
            rejection.order.instrument,
            rejection.reason
        );
    }
    for mv in &record.moves {
        let sign = if mv.price >= mv.previous_price { "+" } else { "" };
        println!(
            "  {:<12} {:>10.2} -> {:>10.2}  {}{:.2}%",
            mv.instrument,
            mv.previous_price,
            mv.price,
            sign,
            mv.change_pct()
        );
    }
    for v in &record.valuations {
        let sign = if v.change >= 0.0 { "+" } else { "" };
        println!(
            "  {:<12} net worth {:>12.2}  ({}{:.2})",
            v.holder, v.net_worth, sign, v.change
        );
    }
}

fn print_standings(result: &SessionResult) {
    println!("\n=== Final Standings ===");
    for (rank, v) in result.standings().iter().enumerate() {
        println!(
            "  {}. {:<12} {:>12.2}  cash {:>12.2}",
            rank + 1,
            v.holder,
            v.net_worth,
            v.cash
        );
    }
}

fn run_preview(
    config_path: Option<&PathBuf>,
    instruments_path: &Path,
    instrument: &str,
    rounds: usize,
    seed: Option<u64>,
) -> ExitCode {
    let config = match load_simulation_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = CsvAdapter::new(instruments_path.to_path_buf());
    match preview_instrument(&data_port, &config, instrument, rounds, seed) {
        Ok(steps) => {
            println!("Preview of {} over {} rounds", instrument, rounds);
            for step in &steps {
                println!(
                    "  {:>3}  {:>10.2}  {:>+7.2}%  vol {:>5.1}%",
                    step.round,
                    step.price,
                    step.change * 100.0,
                    step.volatility * 100.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Build one engine for `instrument` and project `rounds` steps from its
/// opening state. `seed` overrides the configured seed.
pub fn preview_instrument(
    data_port: &dyn DataPort,
    config: &SimulationConfig,
    instrument: &str,
    rounds: usize,
    seed: Option<u64>,
) -> Result<Vec<PreviewStep>, WavetraderError> {
    let universe = data_port.load_instruments()?;
    let def = universe
        .iter()
        .find(|d| d.name == instrument)
        .ok_or_else(|| WavetraderError::UnknownInstrument {
            name: instrument.to_string(),
        })?;
    let mut master = match seed.or(config.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let engine = PriceEngine::new(
        def,
        &config.volatility,
        config.price_range,
        StdRng::seed_from_u64(master.next_u64()),
    )?;
    eprintln!(
        "{}: {} at {:.2}, volatility {:.1}%",
        engine.name(),
        engine.category(),
        engine.price(),
        engine.volatility() * 100.0
    );
    Ok(engine.preview(rounds, StdRng::seed_from_u64(master.next_u64())))
}

fn run_instruments(config_path: Option<&PathBuf>, instruments_path: &Path) -> ExitCode {
    let config = match load_simulation_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = CsvAdapter::new(instruments_path.to_path_buf());
    let universe = match data_port.load_instruments() {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for def in &universe {
        let category = def.category();
        let band = config.volatility.band(category);
        println!(
            "{:<12} {:<13} band {:>5.1}%-{:>5.1}%  x{:.2}  [{}]",
            def.name,
            category.as_str(),
            band.min() * 100.0,
            band.max() * 100.0,
            config.volatility.modifier_for(&def.tags),
            def.tags.join(", ")
        );
    }
    eprintln!("{} instruments", universe.len());
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_simulation_config(Some(config_path)) {
        Ok(c) => c,
        Err(code) => return code,
    };

    eprintln!("\nSimulation:");
    match config.seed {
        Some(seed) => eprintln!("  seed:          {seed}"),
        None => eprintln!("  seed:          (random)"),
    }
    eprintln!("  rounds:        {}", config.rounds);
    match config.active_instruments {
        Some(n) => eprintln!("  instruments:   {n}"),
        None => eprintln!("  instruments:   all"),
    }
    eprintln!("  initial cash:  {:.2}", config.initial_cash);
    eprintln!("  holders:       {}", config.holders.join(", "));
    eprintln!(
        "  opening price: {:.2} to {:.2}",
        config.price_range.min(),
        config.price_range.max()
    );

    eprintln!("\nVolatility:");
    for stage in Category::STAGES {
        if let Some(profile) = config.volatility.stage(stage) {
            eprintln!(
                "  {:<8} {:.2}-{:.2}  x{:.2}",
                stage.as_str(),
                profile.band.min(),
                profile.band.max(),
                profile.modifier
            );
        }
    }
    let band = config.volatility.band(Category::Unclassified);
    eprintln!("  {:<8} {:.2}-{:.2}", "default", band.min(), band.max());

    eprintln!("\nSimulation configuration is valid.");
    ExitCode::SUCCESS
}
