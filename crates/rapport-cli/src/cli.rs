use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rapport",
    about = "Rapport — relationship ledger engine for chat characters",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the initial ledger for a seed
    Init(InitArgs),
    /// Advance a ledger by one assistant reply
    Step(StepArgs),
    /// Replay a transcript of replies, one per line
    Replay(ReplayArgs),
    /// Print the prompt digest for a ledger
    Digest(DigestArgs),
    /// Check whether a stored state decodes cleanly
    Check(CheckArgs),
    /// List the rule table in evaluation order
    Rules(RulesArgs),
}

/// Options shared by every command that builds an engine.
#[derive(Args, Clone, Debug)]
pub struct EngineArgs {
    /// Seed ledger (JSON). Defaults to the bundled seed.
    #[arg(long)]
    pub seed: Option<PathBuf>,
    /// Rule table (TOML). Defaults to the built-in rules.
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Engine configuration (TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Write the state envelope to this file.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct StepArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Prior state (envelope or bare ledger). Omit for a first turn.
    #[arg(long)]
    pub state: Option<PathBuf>,
    /// Reply text.
    #[arg(long, conflicts_with = "reply_file", required_unless_present = "reply_file")]
    pub reply: Option<String>,
    /// File holding the reply text.
    #[arg(long)]
    pub reply_file: Option<PathBuf>,
    /// Write the new state envelope to this file.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Transcript file, one reply per non-empty line.
    pub transcript: PathBuf,
    /// Starting state. Omit to start from the seed.
    #[arg(long)]
    pub state: Option<PathBuf>,
    /// Write the final state envelope to this file.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct DigestArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
    pub state: PathBuf,
}

#[derive(Args)]
pub struct RulesArgs {
    /// Rule table (TOML). Defaults to the built-in rules.
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Print the table as TOML.
    #[arg(long)]
    pub toml: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["rapport", "init"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert!(args.engine.seed.is_none());
            assert!(args.out.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_init_with_seed() {
        let cli = Cli::try_parse_from(["rapport", "init", "--seed", "char.json", "-o", "s.json"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.engine.seed, Some(PathBuf::from("char.json")));
            assert_eq!(args.out, Some(PathBuf::from("s.json")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_step() {
        let cli = Cli::try_parse_from([
            "rapport", "step", "--state", "s.json", "--reply", "Thank you!", "--rules", "r.toml",
        ])
        .unwrap();
        if let Command::Step(args) = cli.command {
            assert_eq!(args.state, Some(PathBuf::from("s.json")));
            assert_eq!(args.reply.as_deref(), Some("Thank you!"));
            assert_eq!(args.engine.rules, Some(PathBuf::from("r.toml")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn step_needs_a_reply() {
        assert!(Cli::try_parse_from(["rapport", "step"]).is_err());
    }

    #[test]
    fn step_reply_sources_conflict() {
        assert!(Cli::try_parse_from([
            "rapport", "step", "--reply", "hi", "--reply-file", "r.txt",
        ])
        .is_err());
    }

    #[test]
    fn parse_step_reply_file() {
        let cli = Cli::try_parse_from(["rapport", "step", "--reply-file", "r.txt"]).unwrap();
        if let Command::Step(args) = cli.command {
            assert_eq!(args.reply_file, Some(PathBuf::from("r.txt")));
            assert!(args.reply.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_replay() {
        let cli = Cli::try_parse_from(["rapport", "replay", "chat.txt", "--config", "rapport.toml"]).unwrap();
        if let Command::Replay(args) = cli.command {
            assert_eq!(args.transcript, PathBuf::from("chat.txt"));
            assert_eq!(args.engine.config, Some(PathBuf::from("rapport.toml")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_check_requires_state() {
        assert!(Cli::try_parse_from(["rapport", "check"]).is_err());
        let cli = Cli::try_parse_from(["rapport", "check", "s.json"]).unwrap();
        assert!(matches!(cli.command, Command::Check(_)));
    }

    #[test]
    fn parse_rules_toml() {
        let cli = Cli::try_parse_from(["rapport", "rules", "--toml"]).unwrap();
        if let Command::Rules(args) = cli.command {
            assert!(args.toml);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_digest() {
        let cli = Cli::try_parse_from(["rapport", "digest", "--state", "s.json"]).unwrap();
        assert!(matches!(cli.command, Command::Digest(_)));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["rapport", "--verbose", "init"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["rapport", "--format", "json", "rules"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
