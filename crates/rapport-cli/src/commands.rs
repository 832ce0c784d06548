use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};

use rapport_engine::LedgerEngine;
use rapport_rules::{RuleFiring, RuleSet};
use rapport_stage::state::decode_state;
use rapport_stage::{MessageState, RelationshipStage};
use rapport_types::{Ledger, SnapshotId};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(args, &format),
        Command::Step(args) => cmd_step(args, &format),
        Command::Replay(args) => cmd_replay(args, &format),
        Command::Digest(args) => cmd_digest(args, &format),
        Command::Check(args) => cmd_check(args, &format),
        Command::Rules(args) => cmd_rules(args, &format),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_stage(args: &EngineArgs) -> anyhow::Result<RelationshipStage> {
    RelationshipStage::from_paths(
        args.seed.as_deref(),
        args.rules.as_deref(),
        args.config.as_deref(),
    )
    .context("building ledger engine")
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Load a stored state file. Unusable state falls back to the seed, as the
/// host adapter does, with a warning.
fn load_state(engine: &LedgerEngine, path: Option<&Path>) -> anyhow::Result<Option<Ledger>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = read_text(path)?;
    let decoded = serde_json::from_str::<Value>(&text)
        .map_err(|e| e.to_string())
        .and_then(|blob| decode_state(engine, &blob).map_err(|e| e.to_string()));
    match decoded {
        Ok(ledger) => Ok(Some(ledger)),
        Err(reason) => {
            eprintln!(
                "{} {} is unusable ({reason}); starting from seed",
                "warning:".yellow().bold(),
                path.display()
            );
            Ok(None)
        }
    }
}

fn write_state(path: &Path, ledger: &Ledger) -> anyhow::Result<()> {
    let envelope = MessageState {
        ledger: ledger.clone(),
    };
    let text = serde_json::to_string_pretty(&envelope)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn fmt_delta(delta: f64) -> String {
    format!("{delta:+}")
}

fn print_ledger(ledger: &Ledger, fingerprint: &SnapshotId) {
    println!(
        "Ledger {}  {}",
        ledger.char_id.bold(),
        fingerprint.short_hex().dimmed()
    );
    let width = ledger.metrics.keys().map(String::len).max().unwrap_or(0);
    for (key, metric) in &ledger.metrics {
        let trend = fmt_delta(metric.trend);
        let trend = if metric.trend > 0.0 {
            trend.green()
        } else if metric.trend < 0.0 {
            trend.red()
        } else {
            trend.dimmed()
        };
        println!(
            "  {key:<width$}  {:>8}  trend {trend}  decay {}",
            metric.value, metric.decay
        );
    }
}

fn print_firings(fired: &[RuleFiring]) {
    if fired.is_empty() {
        println!("  {}", "no rules fired".dimmed());
        return;
    }
    for firing in fired {
        let effects: Vec<String> = firing
            .effects
            .iter()
            .map(|e| {
                let text = format!("{} {}", e.metric, fmt_delta(e.delta));
                if e.applied {
                    text
                } else {
                    format!("{text} {}", "(missing)".dimmed())
                }
            })
            .collect();
        println!(
            "  {} {}  {}",
            "fired".green(),
            firing.rule.yellow(),
            effects.join(", ")
        );
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_init(args: InitArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let stage = build_stage(&args.engine)?;
    let ledger = stage.engine().initialize();
    let fingerprint = ledger.fingerprint()?;
    if let Some(out) = &args.out {
        write_state(out, &ledger)?;
    }

    match format {
        OutputFormat::Json => print_json(&json!({
            "ledger": ledger,
            "fingerprint": fingerprint.to_hex(),
        })),
        OutputFormat::Text => {
            println!("{} Initialized ledger from seed", "✓".green().bold());
            print_ledger(&ledger, &fingerprint);
            Ok(())
        }
    }
}

fn cmd_step(args: StepArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let stage = build_stage(&args.engine)?;
    let engine = stage.engine();
    let reply = match (&args.reply, &args.reply_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_text(path)?,
        (None, None) => bail!("a reply is required (--reply or --reply-file)"),
    };
    let prior = load_state(engine, args.state.as_deref())?;
    let report = engine.step_with_report(prior.as_ref(), &reply)?;
    if let Some(out) = &args.out {
        write_state(out, &report.ledger)?;
    }

    match format {
        OutputFormat::Json => print_json(&json!({
            "ledger": report.ledger,
            "fired": report.fired,
            "initialized": report.initialized,
            "prior_fingerprint": report.prior_fingerprint.map(|f| f.to_hex()),
            "fingerprint": report.fingerprint.to_hex(),
        })),
        OutputFormat::Text => {
            let origin = if report.initialized { " (from seed)" } else { "" };
            println!("{} Stepped ledger{origin}", "✓".green().bold());
            print_firings(&report.fired);
            print_ledger(&report.ledger, &report.fingerprint);
            Ok(())
        }
    }
}

fn cmd_replay(args: ReplayArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let stage = build_stage(&args.engine)?;
    let engine = stage.engine();
    let transcript = read_text(&args.transcript)?;
    let replies = transcript.lines().map(str::trim).filter(|l| !l.is_empty());
    let prior = load_state(engine, args.state.as_deref())?;
    let result = engine.replay(prior.as_ref(), replies)?;
    if let Some(out) = &args.out {
        write_state(out, &result.ledger)?;
    }

    match format {
        OutputFormat::Json => print_json(&json!({
            "ledger": result.ledger,
            "turns": result.turns,
            "rules_fired": result.rules_fired,
            "fingerprint": result.fingerprint.to_hex(),
        })),
        OutputFormat::Text => {
            println!(
                "{} Replayed {} turn(s), {} rule firing(s)",
                "✓".green().bold(),
                result.turns.to_string().bold(),
                result.rules_fired.to_string().bold()
            );
            print_ledger(&result.ledger, &result.fingerprint);
            Ok(())
        }
    }
}

fn cmd_digest(args: DigestArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let stage = build_stage(&args.engine)?;
    let engine = stage.engine();
    let ledger = load_state(engine, args.state.as_deref())?.unwrap_or_else(|| engine.initialize());
    let digest = engine.digest(&ledger);

    match format {
        OutputFormat::Json => print_json(&json!({ "digest": digest })),
        OutputFormat::Text => {
            match digest {
                Some(line) => println!("{line}"),
                None => println!("{}", "(no digest: disabled or no tracked metrics)".dimmed()),
            }
            Ok(())
        }
    }
}

fn cmd_check(args: CheckArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let stage = build_stage(&args.engine)?;
    let engine = stage.engine();
    let text = read_text(&args.state)?;

    let raw = serde_json::from_str::<Value>(&text)
        .map_err(|e| e.to_string())
        .and_then(|blob| {
            let inner = blob.get("ledger").unwrap_or(&blob);
            Ledger::from_value(inner).map_err(|e| e.to_string())
        });

    let ledger = match raw {
        Ok(ledger) => ledger,
        Err(reason) => {
            match format {
                OutputFormat::Json => print_json(&json!({ "valid": false, "reason": reason }))?,
                OutputFormat::Text => {
                    println!("{} corrupt state: {reason}", "✗".red().bold());
                    println!("  the host adapter would restart this chat from the seed");
                }
            }
            bail!("{} is not a usable ledger state", args.state.display());
        }
    };

    let schema = engine.schema();
    let unknown: Vec<&String> = ledger
        .metrics
        .keys()
        .filter(|k| !schema.contains(k.as_str()))
        .collect();
    let missing = schema.missing_from(&ledger);

    match format {
        OutputFormat::Json => print_json(&json!({
            "valid": true,
            "char_id": ledger.char_id,
            "unknown_metrics": unknown,
            "missing_metrics": missing,
            "fingerprint": ledger.fingerprint()?.to_hex(),
        })),
        OutputFormat::Text => {
            println!("{} state decodes cleanly", "✓".green().bold());
            for key in &unknown {
                println!("  {} {key} (not in seed)", "unknown:".yellow());
            }
            for key in &missing {
                println!("  {} {key} (adjustments ignored)", "missing:".yellow());
            }
            Ok(())
        }
    }
}

fn cmd_rules(args: RulesArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let rules = match &args.rules {
        Some(path) => RuleSet::from_path(path)?,
        None => RuleSet::canonical(),
    };

    if args.toml {
        print!("{}", rules.to_toml_string()?);
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(rules.rules())?),
        OutputFormat::Text => {
            for (i, rule) in rules.rules().iter().enumerate() {
                let effects: Vec<String> = rule
                    .effects
                    .iter()
                    .map(|e| format!("{} {}", e.metric, fmt_delta(e.delta)))
                    .collect();
                println!(
                    "{:>2}. {}  /{}/  {}",
                    i + 1,
                    rule.name.yellow().bold(),
                    rule.pattern.source().cyan(),
                    effects.join(", ")
                );
            }
            Ok(())
        }
    }
}
