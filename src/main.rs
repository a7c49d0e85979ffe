use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use redpen::{
    CommandCorrector, Corrector, DispatchConfig, EngineConfig, GrammarEngine, IdentityCorrector,
    IssueConfig, LexiconTagger, RuleSet,
};

#[derive(Parser, Debug)]
#[command(name = "redpen")]
#[command(about = "Grammar-correction diff and classification engine")]
#[command(version)]
struct Args {
    /// Input text file, or "-" to read stdin
    input: PathBuf,

    /// External corrector command: reads a JSON array of sentences on
    /// stdin and writes the corrected array on stdout. Defaults to a
    /// pass-through corrector.
    #[arg(long)]
    corrector_cmd: Option<String>,

    /// Classification rule file (JSON); built-in rules when omitted
    #[arg(long)]
    classification_rules: Option<PathBuf>,

    /// Post-processing rule file (JSON); built-in rules when omitted
    #[arg(long)]
    post_rules: Option<PathBuf>,

    /// Normalize corrected text with the post-processing rules before diffing
    #[arg(long)]
    normalize: bool,

    /// Sentences per corrector batch
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Maximum concurrent corrector batches
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Per-batch corrector timeout in seconds
    #[arg(long, default_value_t = 30)]
    batch_timeout_secs: u64,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_target(false)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(?args, "starting redpen");

    let text = if args.input.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        tokio::fs::read_to_string(&args.input)
            .await
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };

    if text.trim().is_empty() {
        anyhow::bail!("input text is empty");
    }

    let rules = if args.classification_rules.is_some() || args.post_rules.is_some() {
        RuleSet::from_files(args.classification_rules.as_deref(), args.post_rules.as_deref())?
    } else {
        RuleSet::builtin()
    };

    let corrector: Arc<dyn Corrector> = match &args.corrector_cmd {
        Some(cmd) => Arc::new(CommandCorrector::from_command_line(cmd)?),
        None => Arc::new(IdentityCorrector),
    };

    let defaults = DispatchConfig::default();
    let config = EngineConfig {
        dispatch: DispatchConfig {
            batch_size: args.batch_size,
            max_concurrent: args.max_concurrent.unwrap_or(defaults.max_concurrent),
            batch_timeout: Duration::from_secs(args.batch_timeout_secs),
        },
        issue: IssueConfig::default(),
        apply_post_rules: args.normalize,
    };

    let tagger = Arc::new(LexiconTagger::new()?);
    let engine = GrammarEngine::new(tagger, corrector, rules, config);

    let outcome = engine.correct(&text).await?;
    info!(issues = outcome.issues.len(), "correction complete");

    let json = if args.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{json}");

    Ok(())
}
