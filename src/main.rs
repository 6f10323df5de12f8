use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podblast::{
    CommandPlayer, DEFAULT_DATABASE_PATH, EventReporter, HttpFeedSource, Navigation, Player,
    Registry, RegistryError, ReqwestClient, Session, SharedEventReporter, StorageError,
    StorageFormat, UiEvent, format_time,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[>] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static NEW: Emoji<'_, '_> = Emoji("● ", "* ");

/// How often the playback position is polled
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Subscribe to podcasts and play their episodes
#[derive(Parser, Debug)]
#[command(name = "podblast")]
#[command(about = "Subscribe to podcasts and play their episodes")]
#[command(version)]
struct Args {
    /// Database location (a file for json, a directory for csv)
    #[arg(long, env = "PODBLAST_DB", default_value = DEFAULT_DATABASE_PATH, global = true)]
    db: PathBuf,

    /// Database format
    #[arg(long, env = "PODBLAST_FORMAT", value_enum, default_value_t = FormatArg::Json, global = true)]
    format: FormatArg,

    /// External command used for playback; the media URL is appended
    #[arg(long, env = "PODBLAST_PLAYER", default_value = "mpv --no-video", global = true)]
    player: String,

    /// Quiet mode - suppress decorative output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a feed and register it
    Add {
        /// RSS or Atom feed URL, or path to a local feed file
        url: String,
    },
    /// Delete a registered feed
    Remove { url: String },
    /// Mark a registered feed as subscribed
    Subscribe { url: String },
    /// Clear the subscription mark of a registered feed
    Unsubscribe { url: String },
    /// List registered feeds
    List,
    /// List the episodes of a feed, oldest first
    Episodes {
        /// Feed number as shown by `list`
        feed: usize,
    },
    /// Play an episode through the external player
    Play {
        feed: usize,
        episode: usize,

        /// Keep playing the following episodes until the end of the feed
        #[arg(long = "continue")]
        continue_playing: bool,
    },
    /// Write the database to another location and format
    Export {
        path: PathBuf,

        #[arg(long = "to", value_enum, default_value_t = FormatArg::Json)]
        to: FormatArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for StorageFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => StorageFormat::Json,
            FormatArg::Csv => StorageFormat::Csv,
        }
    }
}

/// Prints notices; the other events have nothing to redraw in a terminal
struct TerminalReporter;

impl EventReporter for TerminalReporter {
    fn report(&self, event: UiEvent) {
        if let UiEvent::Notice { message } = event {
            println!("{WARNING}{}", message.yellow());
        }
    }
}

impl Command {
    fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::List | Command::Episodes { .. } | Command::Export { .. }
        )
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Load the database, tolerating its absence on first use.
///
/// Any other failure aborts commands that would save, so a damaged database
/// is never overwritten.
fn open_database(session: &mut Session<CommandPlayer>, mutating: bool) -> Result<()> {
    match session.load_current() {
        Ok(count) => {
            tracing::debug!(count, "database opened");
            Ok(())
        }
        Err(StorageError::ReadFailed { source, .. }) if source.kind() == ErrorKind::NotFound => {
            tracing::debug!("no database yet, starting empty");
            Ok(())
        }
        Err(e) if mutating => {
            Err(e).context("Refusing to modify a database that could not be read")
        }
        Err(e) => {
            println!("{WARNING}{}", e.to_string().yellow());
            Ok(())
        }
    }
}

async fn add_feed(session: &mut Session<CommandPlayer>, url: &str, quiet: bool) -> Result<()> {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {wide_msg}")?);
    spinner.set_message(format!("{SEARCH}Fetching feed: {}", url.cyan()));
    spinner.enable_steady_tick(POLL_INTERVAL);

    let source = HttpFeedSource::new(ReqwestClient::new());
    let result = session.register(&source, url).await;
    spinner.finish_and_clear();

    let index = match result {
        Ok(index) => index,
        Err(RegistryError::AlreadyRegistered { url }) => {
            bail!("An active subscription with that URL already exists: {url}")
        }
        Err(e) => return Err(e.into()),
    };

    let feed = &session.feeds()[index];
    if feed.valid {
        println!(
            "{SUCCESS}{} • {} episodes",
            feed.title.bold().green(),
            feed.episodes.len().to_string().cyan()
        );
    }
    Ok(())
}

fn set_subscription<P: Player>(
    session: &mut Session<P>,
    url: String,
    subscribed: bool,
) -> Result<()> {
    let found = if subscribed {
        session.subscribe(&url)
    } else {
        session.unsubscribe(&url)
    };

    if !found {
        return Err(RegistryError::NotFound { url }.into());
    }
    Ok(())
}

fn list_feeds(session: &Session<CommandPlayer>) {
    if session.feeds().is_empty() {
        println!("{}", "No feeds registered.".dimmed());
        return;
    }

    for (index, feed) in session.feeds().iter().enumerate() {
        let marker = if feed.subscribed { "★" } else { " " };
        let title = if feed.valid {
            feed.title.bold()
        } else {
            format!("{} (invalid)", feed.title).red()
        };

        println!(
            "{:>3} {} {} {} new / {} • {}",
            index.to_string().cyan(),
            marker.yellow(),
            title,
            feed.new_episode_count().to_string().yellow(),
            feed.episodes.len(),
            feed.url.dimmed()
        );
    }
}

fn list_episodes(session: &Session<CommandPlayer>, feed_index: usize) -> Result<()> {
    let episodes = session
        .episodes(feed_index)
        .with_context(|| format!("No feed number {feed_index}"))?;

    for (index, episode) in episodes.iter().enumerate() {
        let date = episode
            .published
            .and_then(|t| t.to_naive())
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "undated".to_string());
        let marker = if episode.is_new() {
            NEW.to_string()
        } else {
            "  ".to_string()
        };

        println!(
            "{:>4} {}{} {}",
            index.to_string().cyan(),
            marker.green(),
            date.dimmed(),
            truncate_title(&episode.title, 70)
        );
    }
    Ok(())
}

async fn play(
    session: &mut Session<CommandPlayer>,
    feed: usize,
    episode: usize,
    continue_playing: bool,
    quiet: bool,
) -> Result<()> {
    session
        .play_episode(feed, episode)
        .context("Failed to start playback")?;
    session.save().context("Failed to save database")?;

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    bar.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {wide_msg}")?);

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;

        if session.player_mut().is_finished() {
            if !continue_playing {
                break;
            }
            match session.next()? {
                Navigation::Moved(_) => {
                    session.save().context("Failed to save database")?;
                    continue;
                }
                Navigation::EndOfPlaylist | Navigation::StartOfPlaylist => break,
            }
        }

        let position = session.poll_position();
        let title = session
            .active_episode()
            .map(|e| truncate_title(&e.title, 50))
            .unwrap_or_default();
        bar.set_message(format!(
            "{HEADPHONES}{} {}",
            title.bold(),
            format_time(position.position).cyan()
        ));
        bar.tick();
    }

    bar.finish_and_clear();
    session.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podblast".bold().magenta(),
            "- Podcast Player".dimmed()
        );
    }

    let registry = Registry::new(&args.db, args.format.into());
    let player = CommandPlayer::new(&args.player).context("Invalid player command")?;
    let reporter: SharedEventReporter = Arc::new(TerminalReporter);
    let mut session = Session::new(registry, player, reporter);

    let mutating = args.command.is_mutating();
    open_database(&mut session, mutating)?;

    match args.command {
        Command::Add { url } => add_feed(&mut session, &url, args.quiet).await?,
        Command::Remove { url } => {
            if session.delete(&url) == 0 {
                return Err(RegistryError::NotFound { url }.into());
            }
        }
        Command::Subscribe { url } => set_subscription(&mut session, url, true)?,
        Command::Unsubscribe { url } => set_subscription(&mut session, url, false)?,
        Command::List => list_feeds(&session),
        Command::Episodes { feed } => list_episodes(&session, feed)?,
        Command::Play {
            feed,
            episode,
            continue_playing,
        } => play(&mut session, feed, episode, continue_playing, args.quiet).await?,
        Command::Export { path, to } => {
            let mut copy = session.registry().clone();
            copy.set_format(to.into());
            let saved = copy
                .save_as(&path)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            if !args.quiet {
                println!(
                    "{FOLDER}Exported {} feeds to {}",
                    saved.to_string().green(),
                    path.display().to_string().cyan()
                );
            }
            return Ok(());
        }
    }

    if mutating {
        session.save().context("Failed to save database")?;
    }

    Ok(())
}
