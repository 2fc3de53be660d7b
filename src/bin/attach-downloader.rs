#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for downloading Gmail attachments into a year/quarter/sender tree

use attach_downloader::{
    AttachmentPipeline, CredentialProvider, Error, GmailClient, REMEDIATION, RunStats, Settings,
    TokenFileProvider,
};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

#[derive(Parser)]
#[command(name = "attach-downloader")]
#[command(about = "Download and organize Gmail attachments (read-only)")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Settings file (default: $ATTACH_CONFIG or config/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one download pass over the mailbox
    Download {
        /// Process at most this many messages (0 = all)
        #[arg(long)]
        max_messages: Option<u32>,

        /// Evaluate filters and paths without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective settings
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::from_file(path),
        None => Settings::from_env(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = match log_writer(&settings) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Error: cannot open log file: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(settings.log_file.is_none())
        .init();

    let result = match &args.command {
        Command::Download {
            max_messages,
            dry_run,
        } => cmd_download(&args, settings, *max_messages, *dry_run).await,
        Command::ShowConfig => cmd_show_config(&args, &settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Stderr, the configured log file, or both. Stderr is kept when no
/// file is configured even if `console_output` is off.
fn log_writer(settings: &Settings) -> std::io::Result<BoxMakeWriter> {
    let Some(path) = &settings.log_file else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = Mutex::new(OpenOptions::new().create(true).append(true).open(path)?);

    Ok(if settings.console_output {
        BoxMakeWriter::new(std::io::stderr.and(file))
    } else {
        BoxMakeWriter::new(file)
    })
}

async fn cmd_download(
    args: &Args,
    mut settings: Settings,
    max_messages: Option<u32>,
    dry_run: bool,
) -> anyhow::Result<()> {
    if let Some(n) = max_messages {
        settings.max_messages = (n > 0).then_some(n);
    }

    let provider = TokenFileProvider::new(&settings.api.token_file, &settings.api.token_url);
    let token = provider.get_valid_token().await?;
    let client = GmailClient::from_settings(&settings.api, token)?;

    let stats = AttachmentPipeline::new(&client, &settings)
        .dry_run(dry_run)
        .run()
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats, dry_run);
    }

    Ok(())
}

fn cmd_show_config(args: &Args, settings: &Settings) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(settings)?);
        return Ok(());
    }

    println!("Project:        {}", settings.project_name);
    println!("Download root:  {}", settings.download_root.display());
    println!("Extensions:     {}", join(&settings.allowed_extensions));
    println!("Allow keywords: {}", join(&settings.allow_keywords));
    println!("Deny keywords:  {}", join(&settings.deny_keywords));
    println!("Allow senders:  {}", join(&settings.allow_senders));
    println!("Deny senders:   {}", join(&settings.deny_senders));
    println!(
        "Date range:     {} .. {}",
        settings.date_from.as_deref().unwrap_or("-"),
        settings.date_to.as_deref().unwrap_or("-")
    );
    println!(
        "Max messages:   {}",
        settings.max_messages.map_or_else(|| "all".to_string(), |n| n.to_string())
    );
    println!("API base:       {}", settings.api.base_url);
    println!("Token file:     {}", settings.api.token_file.display());

    Ok(())
}

fn print_stats(stats: &RunStats, dry_run: bool) {
    let saved_label = if dry_run { "Would download" } else { "Downloaded" };

    row("Messages processed", stats.total_messages);
    row("Messages with attachments", stats.messages_with_attachments);
    row(saved_label, stats.files_downloaded);
    row("Filtered", stats.files_filtered);
    if stats.errors > 0 {
        row("Errors", stats.errors);
    }
    if stats.incomplete {
        println!("\nWarning: the message list was incomplete.");
    }
}

fn row(label: &str, value: usize) {
    println!("{label:<26} {value}");
}

fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<Error>() {
        Some(Error::Auth(message)) => {
            eprintln!("Authentication failed: {message}");
            if !message.contains(REMEDIATION) {
                eprintln!("{REMEDIATION}");
            }
        }
        _ => eprintln!("Error: {e:#}"),
    }
}

fn join(items: &std::collections::BTreeSet<String>) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
