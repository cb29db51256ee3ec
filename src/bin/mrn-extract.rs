//! CLI binary for mrn-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints the JSON result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mrn_extract::{
    extraction_prompt, ExtractionConfig, ExtractionResult, MrnExtractor, DEFAULT_OUTPUT_FILE,
    PROMPT_VERSION,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract and print JSON (stdout)
  mrn-extract notice.jpg

  # Save as mrn_extracted_data.json in the current directory
  mrn-extract notice.jpg --download

  # Save to a specific file
  mrn-extract notice.png -o out/notice.json

  # Use a specific model
  mrn-extract --model gpt-4.1 --provider openai notice.jpg

  # Extract from a URL
  mrn-extract https://example.org/scans/mrn-0142.jpg

  # Show the instruction prompt (no API key needed)
  mrn-extract --print-prompt

EXIT STATUS:
  0  extraction succeeded
  2  the model failed or returned unparseable output (JSON still printed)
  1  input, configuration or I/O error

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Extract Meter Replacement Notice fields from an image using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "mrn-extract",
    version,
    about = "Extract Meter Replacement Notice fields from an image using Vision LLMs",
    long_about = "Send a JPEG or PNG image of a Meter Replacement Notice (MRN) to a Vision \
Language Model, repair the sub-division code, and print the 13-field record as JSON. Supports \
OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local JPEG/PNG file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "print_prompt")]
    input: Option<String>,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "MRN_OUTPUT", conflicts_with = "download")]
    output: Option<PathBuf>,

    /// Write JSON to ./mrn_extracted_data.json.
    #[arg(long)]
    download: bool,

    /// LLM model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Max LLM output tokens.
    #[arg(long, env = "MRN_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Image detail hint: low, high, auto.
    #[arg(long, env = "MRN_IMAGE_DETAIL", default_value = "high")]
    detail: String,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "MRN_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Print the built-in extraction prompt and exit.
    #[arg(long)]
    print_prompt: bool,

    /// LLM call timeout in seconds (default: wait indefinitely).
    #[arg(long, env = "MRN_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MRN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print compact JSON instead of the 2-space indented form.
    #[arg(long)]
    compact: bool,

    /// Disable the spinner.
    #[arg(long, env = "MRN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MRN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the JSON result and errors.
    #[arg(short, long, env = "MRN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would interleave with the spinner; keep them for
    // runs without it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.print_prompt {
        eprintln!("# prompt version {PROMPT_VERSION}");
        println!("{}", extraction_prompt());
        return Ok(ExitCode::SUCCESS);
    }

    let input = cli
        .input
        .clone()
        .context("An input image path or URL is required")?;

    let config = build_config(&cli).await?;
    let extractor = MrnExtractor::new(&config).context("Failed to set up the LLM provider")?;

    // ── Run extraction ───────────────────────────────────────────────────
    let spinner = show_progress.then(|| start_spinner(extractor.model_name()));
    let outcome = extractor.extract_input(&input).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let result = outcome.context("Extraction failed")?;

    let output_path = if cli.download {
        Some(PathBuf::from(DEFAULT_OUTPUT_FILE))
    } else {
        cli.output.clone()
    };

    if let Some(ref path) = output_path {
        result
            .write_json(path)
            .await
            .context("Failed to write output")?;
    } else {
        let json = if cli.compact {
            serde_json::to_string(&result)
        } else {
            result.to_json_pretty()
        }
        .context("Failed to serialise result")?;
        println!("{json}");
    }

    if !cli.quiet {
        report(&result, output_path.as_ref());
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn start_spinner(model: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Extracting");
    bar.set_message(format!("reading notice with {model}…"));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn report(result: &ExtractionResult, output_path: Option<&PathBuf>) {
    match result {
        ExtractionResult::Success(record) => {
            let sub_division = if record.sub_division.is_empty() {
                red("not found")
            } else {
                bold(&record.sub_division)
            };
            eprintln!("{} Extraction complete  sub-division: {}", green("✔"), sub_division);
        }
        ExtractionResult::Failure(failure) => {
            eprintln!("{} {}", red("✘"), failure.kind);
            if let Some(ref exception) = failure.exception {
                eprintln!("   {}", exception);
            }
        }
    }
    if let Some(path) = output_path {
        eprintln!("   → {}", bold(&path.display().to_string()));
    }
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .max_tokens(cli.max_tokens)
        .image_detail(cli.detail.to_lowercase())
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}
