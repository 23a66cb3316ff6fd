//! CLI entry point for `mboxthread`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};

use mboxthread::archive::parse_archive_with;
use mboxthread::config::Config;
use mboxthread::export::mbox::append_message;
use mboxthread::model::conversation::Conversation;
use mboxthread::model::message::Message;
use mboxthread::parser::header::HeaderParser;
use mboxthread::parser::MessageParser;
use mboxthread::store::reader::read_archive;
use mboxthread::threading::{Diagnostics, TracingDiagnostics, UnresolvedReply};

/// Rebuild threaded conversations from MBOX archives.
#[derive(Parser)]
#[command(name = "mboxthread", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (overrides $MBOXTHREAD_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the conversation trees of an archive
    Threads {
        path: PathBuf,
        /// Emit JSON instead of an indented tree
        #[arg(long)]
        json: bool,
        /// Fail if any reply could not be placed in a conversation
        #[arg(long)]
        strict: bool,
    },
    /// Show message and conversation counts
    Stats {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Append a single RFC 5322 message (.eml) to an archive
    Append {
        archive: PathBuf,
        message: PathBuf,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => mboxthread::config::load_config_from(path)?,
        None => mboxthread::config::load_config(),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Threads { path, json, strict } => cmd_threads(&path, json, strict, &config),
        Commands::Stats { path, json } => cmd_stats(&path, json, &config),
        Commands::Append { archive, message } => cmd_append(&archive, &message, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mboxthread::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxthread.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Forwards events to the log while keeping a copy for reporting.
struct Recorder {
    events: Vec<UnresolvedReply>,
}

impl Diagnostics for Recorder {
    fn unresolved_reply(&mut self, event: UnresolvedReply) {
        TracingDiagnostics.unresolved_reply(event.clone());
        self.events.push(event);
    }
}

/// Archive text, its conversations, and the replies that were dropped.
type Loaded = (String, Vec<Conversation>, Vec<UnresolvedReply>);

/// Read and thread an archive.
fn load(path: &Path, config: &Config) -> anyhow::Result<Loaded> {
    let text = read_archive(path)?;
    let mut recorder = Recorder { events: Vec::new() };
    let conversations =
        parse_archive_with(&text, &HeaderParser, &mut recorder, &config.archive_options())?;
    Ok((text, conversations, recorder.events))
}

/// Print every conversation as an indented tree (or JSON).
fn cmd_threads(path: &Path, json: bool, strict: bool, config: &Config) -> anyhow::Result<()> {
    let (_, conversations, dropped) = load(path, config)?;

    if json {
        let out = serde_json::json!({
            "conversations": conversations,
            "dropped": dropped,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for conv in &conversations {
            print_tree(conv, conv.first(), 0);
            println!();
        }
        for d in &dropped {
            eprintln!("dropped {} (in reply to {})", d.message_id, d.in_reply_to);
        }
    }

    if strict && !dropped.is_empty() {
        anyhow::bail!("{} replies could not be placed in a conversation", dropped.len());
    }
    Ok(())
}

fn print_tree(conv: &Conversation, msg: &Message, depth: usize) {
    println!(
        "{}{}  {}  {}",
        "  ".repeat(depth),
        msg.date.format("%Y-%m-%d %H:%M"),
        msg.author.display(),
        msg.subject
    );
    for reply in conv.replies(&msg.id) {
        print_tree(conv, reply, depth + 1);
    }
}

/// Show archive statistics.
fn cmd_stats(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let (text, conversations, dropped) = load(path, config)?;
    let messages: usize = conversations.iter().map(Conversation::len).sum();
    let largest = conversations.iter().map(Conversation::len).max().unwrap_or(0);

    if json {
        let out = serde_json::json!({
            "file": path.display().to_string(),
            "bytes": text.len(),
            "conversations": conversations.len(),
            "threaded_messages": messages,
            "largest_conversation": largest,
            "dropped_replies": dropped.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("File:                  {}", path.display());
        println!("Size:                  {}", format_size(text.len(), BINARY));
        println!("Conversations:         {}", conversations.len());
        println!("Threaded messages:     {messages}");
        println!("Largest conversation:  {largest}");
        println!("Dropped replies:       {}", dropped.len());
    }
    Ok(())
}

/// Parse a bare message file and append it to an archive.
fn cmd_append(archive: &Path, message: &Path, config: &Config) -> anyhow::Result<()> {
    let raw = read_archive(message)?;
    let msg = HeaderParser.parse_message(&raw)?;
    append_message(archive, &msg, &config.format)?;
    println!("Appended {} to {}", msg.id, archive.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxthread", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
