//! `hygiene` command-line front end.
//!
//! Logs go to stderr; reports are printed to stdout as JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use hygiene_core::{AuditResult, CleanlinessEvaluator, CleanlinessRules, ImageMetadata};
use hygiene_runtime::adapters::normalize::parse_payload;
use hygiene_runtime::{
    AnalysisParams, AuditReport, AuditServiceBuilder, PayloadFormat, ProviderRegistry,
    ProviderSelection, RuntimeConfig, SubmitAudit,
};

#[derive(Parser, Debug)]
#[command(name = "hygiene", version, about = "Facility cleanliness audit CLI")]
struct Cli {
    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a recorded vision payload against the rules
    Evaluate {
        /// Payload file, or `-` for stdin
        payload: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Normalized)]
        format: FormatArg,
        /// Rules file (YAML or JSON); defaults apply when omitted
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long, default_value = "local")]
        dealer: String,
        #[arg(long, default_value = "default")]
        checkpoint: String,
        #[arg(long = "override", value_enum)]
        verdict: Option<Verdict>,
    },
    /// Inspect cleanliness rules
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Run a full audit on in-memory adapters, replaying a recorded payload
    Submit {
        image: PathBuf,
        #[arg(long)]
        dealer: String,
        #[arg(long)]
        checkpoint: String,
        #[arg(long)]
        uploader: String,
        /// Recorded vision payload to replay
        #[arg(long)]
        payload: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Normalized)]
        format: FormatArg,
        /// Runtime configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long = "override", value_enum)]
        verdict: Option<Verdict>,
        /// Label confidence floor (0-100) for this audit
        #[arg(long)]
        min_confidence: Option<f64>,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommands {
    /// Validate a rules file
    Check { file: PathBuf },
    /// Print the default rules as YAML
    Defaults,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Normalized,
    Rekognition,
    Llm,
}

impl From<FormatArg> for PayloadFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Normalized => PayloadFormat::Normalized,
            FormatArg::Rekognition => PayloadFormat::Rekognition,
            FormatArg::Llm => PayloadFormat::Llm,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Verdict {
    Clean,
    NotClean,
}

impl Verdict {
    fn is_clean(self) -> bool {
        matches!(self, Verdict::Clean)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            payload,
            format,
            rules,
            dealer,
            checkpoint,
            verdict,
        } => evaluate(&payload, format.into(), rules.as_deref(), &dealer, &checkpoint, verdict),
        Commands::Rules { command } => match command {
            RulesCommands::Check { file } => check_rules(&file),
            RulesCommands::Defaults => {
                print!("{}", CleanlinessRules::default().to_yaml()?);
                Ok(())
            }
        },
        Commands::Submit {
            image,
            dealer,
            checkpoint,
            uploader,
            payload,
            format,
            config,
            verdict,
            min_confidence,
        } => {
            let request = SubmitRequest {
                image,
                dealer,
                checkpoint,
                uploader,
                payload,
                format: format.into(),
                config,
                verdict,
                min_confidence,
            };
            submit(request).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_payload(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read payload from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read payload {}", path.display()))
}

fn print_report(report: &AuditReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn evaluate(
    payload: &Path,
    format: PayloadFormat,
    rules: Option<&Path>,
    dealer: &str,
    checkpoint: &str,
    verdict: Option<Verdict>,
) -> Result<()> {
    let rules = match rules {
        Some(path) => CleanlinessRules::from_file(path)
            .with_context(|| format!("Failed to load rules {}", path.display()))?,
        None => CleanlinessRules::default(),
    };
    let evaluator = CleanlinessEvaluator::new(rules)?;

    let text = read_payload(payload)?;
    let metadata = ImageMetadata::builder(dealer, checkpoint, "cli")
        .location("local", payload.display().to_string())
        .build();
    let audit = evaluate_text(&evaluator, &text, format, metadata, verdict)?;

    tracing::info!(
        audit_id = %audit.audit_id(),
        status = %audit.status(),
        labels = audit.detected_labels().len(),
        "Evaluated payload"
    );

    print_report(&AuditReport::from(&audit))
}

/// Evaluate a recorded payload as-is; it was filtered when it was recorded.
fn evaluate_text(
    evaluator: &CleanlinessEvaluator,
    text: &str,
    format: PayloadFormat,
    metadata: ImageMetadata,
    verdict: Option<Verdict>,
) -> Result<AuditResult> {
    let vision = parse_payload(text, format, "unknown", &AnalysisParams::unfiltered())
        .context("Failed to parse vision payload")?;
    Ok(evaluator.evaluate(&vision, metadata, verdict.map(Verdict::is_clean)))
}

fn check_rules(file: &Path) -> Result<()> {
    let rules = CleanlinessRules::from_file(file)
        .with_context(|| format!("Invalid rules file {}", file.display()))?;
    rules.validate()?;

    println!(
        "{}: OK ({} negative terms, threshold {}, max violations {})",
        file.display(),
        rules.negative_labels.len(),
        rules.confidence_threshold,
        rules.max_negative_labels
    );
    Ok(())
}

struct SubmitRequest {
    image: PathBuf,
    dealer: String,
    checkpoint: String,
    uploader: String,
    payload: PathBuf,
    format: PayloadFormat,
    config: Option<PathBuf>,
    verdict: Option<Verdict>,
    min_confidence: Option<f64>,
}

fn content_type_for(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => Ok("image/jpeg"),
        Some("png") => Ok("image/png"),
        _ => bail!("{} is not a .jpg or .png image", path.display()),
    }
}

async fn submit(request: SubmitRequest) -> Result<()> {
    let mut config = match &request.config {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    // Offline run: always replay the recorded payload
    let payload = read_payload(&request.payload)?;
    config.provider = ProviderSelection::new(
        "replay",
        serde_json::json!({"payload": payload, "format": request.format.as_str()}),
    );
    config.fallback_providers.clear();

    let service = AuditServiceBuilder::from_config(config, &ProviderRegistry::with_defaults())?
        .build()?;

    let content_type = content_type_for(&request.image)?;
    let image = fs::read(&request.image)
        .with_context(|| format!("Failed to read image {}", request.image.display()))?;

    let mut submission = SubmitAudit::new(
        request.dealer,
        request.checkpoint,
        request.uploader,
        image,
        content_type,
    );
    submission.manual_override = request.verdict.map(Verdict::is_clean);
    submission.min_confidence = request.min_confidence;

    let audit = service
        .submit(submission)
        .await
        .context("Audit submission failed")?;
    let report = service.report(audit.audit_id()).await?;

    print_report(&report)
}
