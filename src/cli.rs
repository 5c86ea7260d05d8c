//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{
    AnalysisOptions, AnalysisReport, GameSession, MarketSnapshot, DEFAULT_EXCLUDE_RECENT,
};
use crate::domain::classifier::Thresholds;
use crate::domain::config_validation::{
    build_analysis_options, parse_period_boundaries, validate_data_config, DEFAULT_END_DATE,
    DEFAULT_START_DATE, DEFAULT_SYMBOL,
};
use crate::domain::error::RegimeChainError;
use crate::domain::price::resample_weekly;
use crate::domain::state::State;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;

#[derive(Parser, Debug)]
#[command(name = "regimechain", about = "Markov-chain analysis of weekly market regimes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full regime analysis
    Analyze {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        bull: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        bear: Option<f64>,
    },
    /// Compare transition tables across historical periods
    Periods {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        /// label=YYYY-MM-DD:YYYY-MM-DD, comma separated
        #[arg(long)]
        boundaries: Option<String>,
    },
    /// Play the prediction game against the model
    Game {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, default_value_t = 10)]
        rounds: u32,
    },
    /// Show data range for stored symbol(s)
    Info {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Analyze {
            config,
            data,
            symbol,
            bull,
            bear,
        } => run_analyze(config.as_ref(), data.as_ref(), symbol.as_deref(), bull, bear),
        Command::Periods {
            config,
            data,
            symbol,
            boundaries,
        } => run_periods(
            config.as_ref(),
            data.as_ref(),
            symbol.as_deref(),
            boundaries.as_deref(),
        ),
        Command::Game {
            config,
            data,
            symbol,
            rounds,
        } => run_game(config.as_ref(), data.as_ref(), symbol.as_deref(), rounds),
        Command::Info {
            config,
            data,
            symbol,
        } => run_info(config.as_ref(), data.as_ref(), symbol.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RegimeChainError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

struct DataSettings {
    path: PathBuf,
    symbol: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    resample: bool,
    exclude_recent: usize,
}

fn resolve_data_settings(
    config: Option<&FileConfigAdapter>,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> Result<DataSettings, RegimeChainError> {
    if let Some(adapter) = config {
        validate_data_config_with_override(adapter, data_override)?;
    }

    let path = match data_override {
        Some(p) => p.clone(),
        None => match config.and_then(|c| c.get_string("data", "path")) {
            Some(p) => PathBuf::from(p),
            None => {
                return Err(RegimeChainError::ConfigMissing {
                    section: "data".into(),
                    key: "path".into(),
                })
            }
        },
    };

    let symbol = symbol_override
        .map(str::to_string)
        .or_else(|| config.and_then(|c| c.get_string("data", "symbol")))
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

    let start_date = resolve_date(config, "start_date", DEFAULT_START_DATE)?;
    let end_date = resolve_date(config, "end_date", DEFAULT_END_DATE)?;

    let resample = config
        .map(|c| c.get_bool("data", "resample_weekly", true))
        .unwrap_or(true);

    let exclude_recent = config
        .map(|c| c.get_int("analysis", "exclude_recent", DEFAULT_EXCLUDE_RECENT as i64))
        .unwrap_or(DEFAULT_EXCLUDE_RECENT as i64) as usize;

    Ok(DataSettings {
        path,
        symbol,
        start_date,
        end_date,
        resample,
        exclude_recent,
    })
}

fn validate_data_config_with_override(
    adapter: &FileConfigAdapter,
    data_override: Option<&PathBuf>,
) -> Result<(), RegimeChainError> {
    match validate_data_config(adapter) {
        // A --data flag satisfies a missing [data] path key.
        Err(RegimeChainError::ConfigMissing { ref key, .. })
            if key == "path" && data_override.is_some() =>
        {
            Ok(())
        }
        other => other,
    }
}

fn resolve_date(
    config: Option<&FileConfigAdapter>,
    key: &str,
    default: &str,
) -> Result<NaiveDate, RegimeChainError> {
    let value = config
        .and_then(|c| c.get_string("data", key))
        .unwrap_or_else(|| default.to_string());
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| RegimeChainError::ConfigInvalid {
        section: "data".into(),
        key: key.into(),
        reason: format!("invalid {} format, expected YYYY-MM-DD", key),
    })
}

fn load_snapshot(
    config: Option<&FileConfigAdapter>,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
    options: AnalysisOptions,
) -> Result<MarketSnapshot, RegimeChainError> {
    let settings = resolve_data_settings(config, data_override, symbol_override)?;

    eprintln!("Loading prices from {}", settings.path.display());
    let port = CsvAdapter::new(settings.path);
    let prices = port.fetch_prices(&settings.symbol, settings.start_date, settings.end_date)?;

    let weekly = if settings.resample {
        resample_weekly(&prices)
    } else {
        prices
    };

    eprintln!(
        "  {}: {} weekly observations, {} to {}",
        settings.symbol,
        weekly.len(),
        settings.start_date,
        settings.end_date,
    );

    MarketSnapshot::build(settings.symbol, weekly, options, settings.exclude_recent)
}

pub fn run_analyze(
    config_path: Option<&PathBuf>,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
    bull_override: Option<f64>,
    bear_override: Option<f64>,
) -> ExitCode {
    let config = match load_config_if_given(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut options = match config.as_ref().map(|c| build_analysis_options(c)) {
        Some(Ok(o)) => o,
        Some(Err(e)) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
        None => AnalysisOptions::default(),
    };

    if bull_override.is_some() || bear_override.is_some() {
        let bull = bull_override.unwrap_or(options.thresholds.bull());
        let bear = bear_override.unwrap_or(options.thresholds.bear());
        options.thresholds = match Thresholds::new(bull, bear) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
    }

    let snapshot = match load_snapshot(config.as_ref(), data_override, symbol_override, options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_report(snapshot.symbol(), snapshot.report());
    ExitCode::SUCCESS
}

pub fn run_periods(
    config_path: Option<&PathBuf>,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
    boundaries_override: Option<&str>,
) -> ExitCode {
    let config = match load_config_if_given(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let boundaries_str = match boundaries_override {
        Some(b) => b.to_string(),
        None => match config
            .as_ref()
            .and_then(|c| c.get_string("periods", "boundaries"))
        {
            Some(b) => b,
            None => {
                eprintln!("error: no period boundaries (use --boundaries or [periods] boundaries)");
                return ExitCode::from(2);
            }
        },
    };

    let boundaries = match parse_period_boundaries(&boundaries_str) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let options = match config.as_ref().map(|c| build_analysis_options(c)) {
        Some(Ok(o)) => o,
        Some(Err(e)) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
        None => AnalysisOptions::default(),
    };

    let snapshot = match load_snapshot(config.as_ref(), data_override, symbol_override, options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let periods = match snapshot.periods(&boundaries) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for period in &periods {
        println!(
            "\n=== {} ({} to {}, {} weeks) ===",
            period.label, period.start_date, period.end_date, period.weeks
        );
        print_matrix(&period.table);
        println!(
            "key transitions: Bull->Bull {:.3}, Bear->Bull {:.3}, Stagnant->Stagnant {:.3}",
            period.table.prob(State::Bull, State::Bull),
            period.table.prob(State::Bear, State::Bull),
            period.table.prob(State::Stagnant, State::Stagnant),
        );
    }
    ExitCode::SUCCESS
}

fn run_game(
    config_path: Option<&PathBuf>,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
    rounds: u32,
) -> ExitCode {
    let config = match load_config_if_given(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let options = match config.as_ref().map(|c| build_analysis_options(c)) {
        Some(Ok(o)) => o,
        Some(Err(e)) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
        None => AnalysisOptions::default(),
    };

    let snapshot = match load_snapshot(config.as_ref(), data_override, symbol_override, options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let mut rng = StdRng::from_entropy();
    let mut session = GameSession::new();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    eprintln!("\nGuess the next week's regime. Answer bull, bear or stagnant (q to quit).");

    for round in 1..=rounds {
        let scenario = match snapshot.scenario(&mut rng) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        eprintln!(
            "\nRound {}/{}: week of {} closed {} ({:+.2}%)",
            round, rounds, scenario.date, scenario.state, scenario.pct_return,
        );
        eprintln!(
            "  transition row: Bull {:.3}, Bear {:.3}, Stagnant {:.3}",
            scenario.transition_row[0], scenario.transition_row[1], scenario.transition_row[2],
        );
        eprint!("  your call: ");

        let predicted = loop {
            let line = match lines.next() {
                Some(Ok(l)) => l,
                _ => {
                    eprintln!("\nInput closed, ending game.");
                    print_scores(&session);
                    return ExitCode::SUCCESS;
                }
            };
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case("q") {
                print_scores(&session);
                return ExitCode::SUCCESS;
            }
            match trimmed.parse::<State>() {
                Ok(state) => break state,
                Err(_) => eprint!("  bull, bear or stagnant (q to quit): "),
            }
        };

        let verdict = match snapshot.grade(scenario.id, predicted, &mut rng) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        session.record(&verdict);

        eprintln!(
            "  actual: {} | you: {} | model: {} ({}) | random: {} ({})",
            verdict.actual,
            if verdict.player_correct { "correct" } else { "wrong" },
            verdict.model_prediction,
            if verdict.model_correct { "correct" } else { "wrong" },
            verdict.random_prediction,
            if verdict.random_correct { "correct" } else { "wrong" },
        );
    }

    print_scores(&session);
    ExitCode::SUCCESS
}

fn print_scores(session: &GameSession) {
    eprintln!(
        "\nFinal after {} rounds: you {}, model {}, random {}",
        session.rounds_played, session.player_score, session.model_score, session.random_score,
    );
}

pub fn run_info(
    config_path: Option<&PathBuf>,
    data_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let config = match load_config_if_given(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match resolve_data_settings(config.as_ref(), data_override, symbol_override) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let port = CsvAdapter::new(settings.path);

    let symbols = if symbol_override.is_some() {
        vec![settings.symbol.clone()]
    } else {
        match port.list_symbols() {
            Ok(s) if !s.is_empty() => s,
            Ok(_) => {
                eprintln!("No symbols found");
                return ExitCode::from(3);
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    };

    for symbol in &symbols {
        match port.get_data_range(symbol) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} rows, {} to {}", symbol, count, min_date, max_date);
            }
            Ok(None) => {
                eprintln!("{}: no data found", symbol);
            }
            Err(e) => {
                eprintln!("error querying {}: {}", symbol, e);
            }
        }
    }
    ExitCode::SUCCESS
}

fn load_config_if_given(
    config_path: Option<&PathBuf>,
) -> Result<Option<FileConfigAdapter>, ExitCode> {
    match config_path {
        Some(path) => load_config(path).map(Some),
        None => Ok(None),
    }
}

fn print_report(symbol: &str, report: &AnalysisReport) {
    println!("=== Regime Analysis: {} ===", symbol);
    println!(
        "thresholds: bull >= {:+.2}%, bear <= {:+.2}%",
        report.options.thresholds.bull(),
        report.options.thresholds.bear(),
    );

    println!("\n--- State Distribution ---");
    let total = report.state_counts.total();
    for state in State::ALL {
        let count = report.state_counts.count(state);
        println!(
            "  {:<9} {:>4} weeks ({:.1}%)",
            state,
            count,
            count as f64 / total as f64 * 100.0,
        );
    }

    println!("\n--- Transition Matrix ---");
    print_matrix(&report.table);

    println!("\n--- Stationary Distribution ---");
    for state in State::ALL {
        println!("  {:<9} {:.3}", state, report.stationary.prob(state));
    }

    println!("\n--- Markov Property (chi-square independence) ---");
    if report.chi_square.is_empty() && report.skipped_lags.is_empty() {
        println!("  series too short for the default lag sweep");
    }
    for result in &report.chi_square {
        // p > 0.05 labeling is a reporting convention, not a universal
        // statistical claim.
        let verdict = if result.p_value > 0.05 {
            "independence not rejected"
        } else {
            "dependency detected"
        };
        println!(
            "  lag {}: chi2={:.2}, dof={}, p={:.4} -> {} (5% convention)",
            result.lag, result.statistic, result.dof, result.p_value, verdict,
        );
    }
    for lag in &report.skipped_lags {
        println!("  lag {}: skipped, expected cell counts too low for a valid test", lag);
    }

    println!("\n--- Out-of-sample Prediction ---");
    println!(
        "  accuracy: {:.1}% ({} of {})",
        report.prediction.accuracy * 100.0,
        report.prediction.correct,
        report.prediction.total,
    );
    println!(
        "  matched-random baseline: {:.1}%",
        report.prediction.baseline_accuracy * 100.0,
    );
}

fn print_matrix(table: &crate::domain::transition::TransitionTable) {
    println!("  {:<10} {:>8} {:>8} {:>8}", "from\\to", "Bull", "Bear", "Stagnant");
    for from in State::ALL {
        let row = table.row(from);
        println!(
            "  {:<10} {:>8.3} {:>8.3} {:>8.3}   ({} obs)",
            from.name(),
            row[0],
            row[1],
            row[2],
            table.row_total(from),
        );
    }
}
