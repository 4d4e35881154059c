//! portfolio-runner: headless driver for the portfolio analytics engine.
//!
//! Usage:
//!   portfolio-runner --seed 12345 --entities 200
//!   portfolio-runner --db portfolio.db --import-synthetic --seed 7
//!   portfolio-runner --db portfolio.db --as-of 2025-06-30 --ipc-mode

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use portfolio_core::{
    config::AnalyticsConfig,
    engine::PortfolioEngine,
    filter::FilterSet,
    store::{RecordStore, SqliteStore},
    synthetic::{self, SyntheticParams},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Metrics {
        #[serde(default)]
        filters: FilterSet,
    },
    EntityEvolution {
        entity_id: String,
        #[serde(default)]
        filters: FilterSet,
    },
    AdvisorEvolution {
        advisor_id: String,
    },
    CrossSellRules {
        #[serde(default)]
        advisors: Option<Vec<String>>,
    },
    ChurnRisk {
        #[serde(default)]
        filters: FilterSet,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let entities = parse_arg(&args, "--entities", 120usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let import_synthetic = args.iter().any(|a| a == "--import-synthetic");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let config_path = flag_value(&args, "--config");
    let as_of = match flag_value(&args, "--as-of") {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| anyhow!("Invalid --as-of '{raw}': {e}"))?,
        None => chrono::Local::now().date_naive(),
    };

    let config = match config_path {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::default(),
    };

    if !ipc_mode {
        println!("Portfolio Analytics: portfolio-runner");
        println!("  db:        {db}");
        println!("  seed:      {seed}");
        println!("  entities:  {entities}");
        println!("  as_of:     {as_of}");
        println!("  config:    {}", config_path.unwrap_or("(defaults)"));
        println!();
    }

    let store = SqliteStore::open(db)?;
    store.migrate()?;

    // An in-memory database starts empty; seed it so there is something to query.
    if import_synthetic || db == ":memory:" {
        let data = synthetic::generate(&SyntheticParams::new(seed, entities, as_of));
        store.import(&data.policies, &data.links, &data.advisors)?;
        log::info!("runner: synthetic portfolio imported (seed {seed}, {entities} entities)");
    }

    let engine = PortfolioEngine::new(store, config).with_as_of(as_of);

    if ipc_mode {
        run_ipc_loop(&engine)?;
    } else {
        print_summary(&engine)?;
    }
    Ok(())
}

fn run_ipc_loop<S: RecordStore>(engine: &PortfolioEngine<S>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = match handle_command(engine, cmd) {
            Ok(value) => value,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command<S: RecordStore>(
    engine: &PortfolioEngine<S>,
    cmd: IpcCommand,
) -> Result<serde_json::Value> {
    let value = match cmd {
        IpcCommand::Metrics { filters } => serde_json::to_value(engine.compute_metrics(&filters)?)?,
        IpcCommand::EntityEvolution { entity_id, filters } => {
            serde_json::to_value(engine.compute_entity_evolution(&entity_id, &filters)?)?
        }
        IpcCommand::AdvisorEvolution { advisor_id } => {
            serde_json::to_value(engine.compute_advisor_evolution(&advisor_id)?)?
        }
        IpcCommand::CrossSellRules { advisors } => {
            serde_json::to_value(engine.mine_cross_sell_rules(advisors.as_deref())?)?
        }
        IpcCommand::ChurnRisk { filters } => serde_json::to_value(engine.score_churn_risk(&filters)?)?,
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

fn print_summary<S: RecordStore>(engine: &PortfolioEngine<S>) -> Result<()> {
    let metrics = engine.compute_metrics(&FilterSet::default())?;
    let totals = &metrics.totals;

    println!("=== PORTFOLIO SUMMARY ===");
    println!("  policies:       {}", totals.policies);
    println!("  entities:       {}", totals.entities);
    println!("  premium:        {:.2}", totals.premium);
    println!("  avg ticket:     {:.2}", totals.avg_ticket);
    println!("  active:         {}", totals.active);
    println!("  cancelled:      {}", totals.cancelled);
    println!("  churn rate:     {:.1}%", totals.churn_rate_pct);
    println!("  retention:      {:.1}%", totals.retention_rate_pct);

    println!();
    println!("=== TOP ENTITIES ===");
    for bucket in metrics.breakdowns.by_entity.iter().take(5) {
        println!(
            "  {} | {} | {:.2} | {} policies",
            bucket.key,
            bucket.label.as_deref().unwrap_or("-"),
            bucket.premium,
            bucket.policies,
        );
    }
    let pareto = &metrics.insights.pareto;
    println!(
        "  top {} entities hold {:.1}% of premium",
        pareto.head_entities, pareto.head_share_pct,
    );

    println!();
    println!("=== CROSS-SELL RULES ===");
    let rules = engine.mine_cross_sell_rules(None)?;
    if rules.is_empty() {
        println!("  (No significant rules)");
    }
    for rule in rules.iter().take(5) {
        println!(
            "  {} -> {} | lift {:.2} | conf {:.1}% | {} targets",
            rule.antecedent, rule.consequent, rule.lift, rule.confidence * 100.0, rule.target_count,
        );
    }

    println!();
    println!("=== CHURN RISK ===");
    let report = engine.score_churn_risk(&FilterSet::default())?;
    println!("  baseline rate:  {:.1}%", report.baseline_rate * 100.0);
    println!("  scored:         {}", report.entries.len());
    println!("  high risk:      {}", report.high_risk_count);
    for entry in report.entries.iter().take(5) {
        println!(
            "  {} | {} | {} | score {:.3}",
            entry.policy_number, entry.entity_name, entry.category, entry.score,
        );
    }

    println!();
    println!("=== INSIGHTS ===");
    for insight in &metrics.insights.strategic {
        println!("  {}", insight.message);
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
