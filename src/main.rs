use anyhow::{Context, Result};
use clap::Parser;
use digest_translator::{completion, config, logging, translation::Translator};
use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
};

#[derive(Parser)]
#[command(
    name = "digest-translator",
    about = "Translate a batch of digest texts through a chat-completion provider"
)]
struct Cli {
    /// JSON array of texts to translate; `-` reads stdin.
    #[arg(long, default_value = "-")]
    input: String,
    /// Write the JSON array of translations here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Treat the whole input as one raw text instead of a JSON array.
    #[arg(long)]
    raw: bool,
    #[arg(long)]
    target_language: Option<String>,
    #[arg(long)]
    max_chars: Option<usize>,
    #[arg(long)]
    max_depth: Option<usize>,
    #[arg(long)]
    temperature: Option<f64>,
    /// Enable verbose logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.debug);
    config::init_config().context("failed to load configuration")?;
    let config = config::get_config();

    let mut settings = config.translator_settings();
    if let Some(language) = cli.target_language.clone() {
        settings.target_language = language;
    }
    if let Some(max_chars) = cli.max_chars {
        settings.max_chars = max_chars;
    }
    if let Some(max_depth) = cli.max_depth {
        settings.max_depth = max_depth;
    }
    if cli.temperature.is_some() {
        settings.temperature = cli.temperature;
    }

    let texts = read_texts(&cli)?;
    let client = completion::build_completion_client(config)
        .context("failed to build completion client")?;
    let translator = Translator::new(client, settings).context("invalid translator settings")?;

    let active = translator.settings();
    tracing::info!(
        texts = texts.len(),
        target_language = %active.target_language,
        max_chars = active.max_chars,
        max_depth = active.max_depth,
        "Translating input"
    );
    let translations = translator.translate_batch(&texts[..]).await;
    let snapshot = translator.metrics_snapshot();
    tracing::info!(
        remote_calls = snapshot.remote_calls,
        filtered = snapshot.filtered_outcomes,
        failed = snapshot.failed_outcomes,
        skipped = snapshot.skipped_chunks,
        "Translation finished"
    );

    let rendered = serde_json::to_string_pretty(&translations)?;
    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(())
}

fn read_texts(cli: &Cli) -> Result<Vec<String>> {
    let content = if cli.input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(&cli.input).with_context(|| format!("failed to read {}", cli.input))?
    };

    if cli.raw {
        return Ok(vec![content]);
    }
    serde_json::from_str(&content)
        .context("input must be a JSON array of strings (use --raw for plain text)")
}
