//! Interactive CLI for edgequake-cv2field.
//!
//! A single-screen terminal session: upload a PDF, classify it, clear the
//! result, upload another. Flags only configure the session; all actions
//! are typed commands.

use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use edgequake_cv2field::{
    load_document, render_results, ClassificationOutcome, ClassificationProgressCallback,
    ClassifierConfig, ClassifyError, Locale, Message, ProgressCallback, Session, Stage,
    UploadStatus,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Busy indicator ───────────────────────────────────────────────────────────

/// Spinner shown for the duration of one classification.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
    locale: Locale,
}

impl CliProgressCallback {
    fn new(locale: Locale) -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            locale,
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let mut guard = match self.bar.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        f(bar);
    }
}

impl ClassificationProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        let busy = self.locale.text(Message::Busy);
        let detail = match stage {
            Stage::Extracting => "PDF → text",
            Stage::CallingModel => "LLM",
            Stage::Parsing => "parse",
        };
        self.with_bar(|bar| bar.set_message(format!("{busy} {}", dim(detail))));
    }

    fn on_retry(&self, attempt: u32, max_retries: u32, backoff_ms: u64, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} retry {attempt}/{max_retries} in {backoff_ms}ms  {}",
                yellow("↻"),
                dim(&msg)
            ))
        });
    }

    fn on_finish(&self, _entries: usize) {
        let mut guard = match self.bar.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(bar) = guard.take() {
            bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"COMMANDS (inside the session):
  upload <path|url>   Upload a PDF résumé (alias: u)
  classify            Classify the uploaded résumé (alias: c)
  clear               Clear the current result
  remove              Remove the uploaded file (clears the result)
  show                Show the current result
  status              Show the uploaded file and its fingerprint
  key                 Enter the API key (input is hidden)
  help                List commands
  quit                Leave the session (alias: q, exit)

ENVIRONMENT VARIABLES:
  GROQ_API_KEY        Provider API key (name configurable with --api-key-env)
  CV2FIELD_PROVIDER   Override provider
  CV2FIELD_MODEL      Override model ID

  A .env file in the working directory is loaded at startup.
"#;

/// Classify résumé PDFs into their three best-matching job fields.
#[derive(Parser, Debug)]
#[command(
    name = "cv2field",
    version,
    about = "Classify résumé PDFs into their three best-matching job fields",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF to upload when the session starts.
    file: Option<String>,

    /// LLM provider name understood by edgequake-llm.
    #[arg(long, env = "CV2FIELD_PROVIDER", default_value = "groq")]
    provider: String,

    /// LLM model ID.
    #[arg(long, env = "CV2FIELD_MODEL", default_value = "deepseek-r1-distill-llama-70b")]
    model: String,

    /// Environment variable holding the API key.
    #[arg(long, default_value = "GROQ_API_KEY")]
    api_key_env: String,

    /// Retries on transient LLM failures.
    #[arg(long, env = "CV2FIELD_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "CV2FIELD_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds for URL uploads.
    #[arg(long, env = "CV2FIELD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to a text file containing a custom system persona.
    #[arg(long, env = "CV2FIELD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Message language: vi or en.
    #[arg(long, env = "CV2FIELD_LANG", default_value = "vi")]
    lang: Locale,

    /// Print outcomes as JSON instead of formatted text.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CV2FIELD_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; a missing file is not an error.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs stay quiet by default; the spinner and the results panel
    // are the user-facing feedback.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let locale = cli.lang;
    let progress: ProgressCallback = CliProgressCallback::new(locale);
    let config = build_config(&cli, progress).await?;
    let mut session = Session::new(config);

    println!("{}", bold(locale.text(Message::Title)));
    println!("{}", dim(locale.text(Message::Caption)));

    if session.config().effective_api_key().is_none() {
        prompt_for_key(&mut session, locale)?;
    }

    if let Some(ref file) = cli.file {
        upload(&mut session, file, &cli).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", bold("›"));
        let Some(line) = lines.next_line().await.context("Failed to read command")? else {
            break;
        };
        let line = line.trim();
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match cmd {
            "" => {}
            "upload" | "u" => {
                if arg.is_empty() {
                    eprintln!("{}", red("usage: upload <path|url>"));
                } else {
                    upload(&mut session, arg, &cli).await;
                }
            }
            "classify" | "c" => classify(&mut session, &cli).await?,
            "clear" => {
                session.clear();
                println!("{}", dim(locale.text(Message::ResultsCleared)));
            }
            "remove" => {
                session.remove_upload();
                println!("{}", dim(locale.text(Message::DocumentRemoved)));
            }
            "show" => print_results(&session, &cli)?,
            "status" => print_status(&session),
            "key" => prompt_for_key(&mut session, locale)?,
            "help" | "?" => println!("{AFTER_HELP}"),
            "quit" | "q" | "exit" => break,
            other => eprintln!("{} {other}  {}", red("unknown command:"), dim("(try: help)")),
        }
    }

    Ok(())
}

/// Map CLI args to `ClassifierConfig`.
async fn build_config(cli: &Cli, progress: ProgressCallback) -> Result<ClassifierConfig> {
    let mut builder = ClassifierConfig::builder()
        .provider_name(&cli.provider)
        .model(&cli.model)
        .api_key_env(&cli.api_key_env)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .locale(cli.lang)
        .progress_callback(progress);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Masked credential prompt. An empty answer leaves the slot as it was.
fn prompt_for_key(session: &mut Session, locale: Locale) -> Result<()> {
    let term = Term::stderr();
    if !term.is_term() {
        let err = ClassifyError::MissingCredential {
            env_var: session.config().api_key_env.clone(),
        };
        eprintln!("{}", yellow(&err.localized(locale)));
        return Ok(());
    }

    term.write_str(locale.text(Message::KeyPrompt))
        .context("Failed to write prompt")?;
    let key = tokio::task::block_in_place(|| term.read_secure_line())
        .context("Failed to read API key")?;
    if !key.trim().is_empty() {
        session.set_api_key(&key);
        eprintln!("{}", green(locale.text(Message::KeySaved)));
    }
    Ok(())
}

async fn upload(session: &mut Session, source: &str, cli: &Cli) {
    let locale = cli.lang;
    let doc = match load_document(source, cli.download_timeout).await {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{} {}", red("✗"), e.localized(locale));
            return;
        }
    };

    match session.upload(doc) {
        Ok(UploadStatus::New) => println!("{} {}", green("✓"), locale.text(Message::NewDocument)),
        Ok(UploadStatus::Unchanged) => {
            println!("{} {}", dim("="), locale.text(Message::SameDocument))
        }
        Err(e) => eprintln!("{} {}", red("✗"), e.localized(locale)),
    }
}

async fn classify(session: &mut Session, cli: &Cli) -> Result<()> {
    let locale = cli.lang;
    match session.classify().await {
        Ok(outcome) if cli.json => {
            let json =
                serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
            println!("{json}");
        }
        Ok(ClassificationOutcome::Classified { .. }) => print_results(session, cli)?,
        Ok(ClassificationOutcome::Shortfall { raw, .. }) => {
            eprintln!("{} {}", yellow("⚠"), locale.text(Message::ShortfallWarning));
            println!("```markdown\n{raw}\n```");
        }
        Err(e) => eprintln!("{} {}", red("✗"), e.localized(locale)),
    }
    Ok(())
}

fn print_results(session: &Session, cli: &Cli) -> Result<()> {
    if cli.json {
        let json =
            serde_json::to_string_pretty(session.state()).context("Failed to serialise state")?;
        println!("{json}");
        return Ok(());
    }

    let locale = cli.lang;
    println!("{}", dim("────────────────────────────────────────"));
    println!("{}", bold(locale.text(Message::ResultsHeading)));
    println!("{}", render_results(session.result(), locale));
    Ok(())
}

fn print_status(session: &Session) {
    match session.document() {
        Some(doc) => println!("{}  {} bytes", bold(doc.name()), doc.size()),
        None => println!("{}", dim("no document")),
    }
    if let Some(ref fp) = session.state().last_fingerprint {
        println!("fingerprint: {}", dim(&fp.to_string()));
    }
}
