use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use mdsync_core::{DocumentEngine, EditorConfig, EditorSession, NoStats, PlainEngine};
use miette::{IntoDiagnostic, Result, WrapErr};
use web_time::Instant;

#[derive(Parser)]
#[command(version, about = "mdsync - drive the editor sync core over markdown files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor config file (JSON, camelCase keys)
    #[arg(long, global = true, env = "MDSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Override the maximum document length in characters
    #[arg(long, global = true)]
    max_length: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print character and word counts
    Stats {
        /// Markdown file
        file: PathBuf,
    },
    /// List case-insensitive matches of a search text
    Find {
        /// Markdown file
        file: PathBuf,

        /// Text to search for
        needle: String,
    },
    /// Replace a literal, case-sensitive search text
    Replace {
        /// Markdown file
        file: PathBuf,

        /// Text to search for
        find: String,

        /// Replacement, inserted verbatim
        replacement: String,

        /// Replace every occurrence instead of the first
        #[arg(long)]
        all: bool,

        /// Write the result back to the file instead of stdout
        #[arg(long)]
        in_place: bool,
    },
}

fn main() -> Result<()> {
    init_miette();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.max_length)?;

    match cli.command {
        Commands::Stats { file } => {
            let (session, _) = open_session(&file, config)?;
            let outputs = session.outputs();
            println!("characters: {}", outputs.character_count);
            println!("words:      {}", outputs.word_count);
            println!(
                "length:     {}",
                if outputs.is_valid { "ok" } else { "over limit" }
            );
        }
        Commands::Find { file, needle } => {
            let (mut session, _) = open_session(&file, config)?;
            session.set_find_text(needle, Instant::now());
            session.rebuild_index();

            let index = session.find().index();
            println!("{} match(es)", index.len());
            if let Some(engine) = session.engine() {
                for i in 0..index.len() {
                    if let Some(range) = index.range(i) {
                        let context = engine.text_between(range).into_diagnostic()?;
                        println!("{:>6}..{:<6} {context}", range.start, range.end);
                    }
                }
            }
        }
        Commands::Replace {
            file,
            find,
            replacement,
            all,
            in_place,
        } => {
            let (mut session, updates) = open_session(&file, config)?;
            let now = Instant::now();
            session.set_find_text(find, now);
            session.set_replace_text(replacement);

            let changed = if all {
                session.replace_all(now)
            } else {
                session.replace_one(now)
            };
            if !changed {
                tracing::info!("no occurrences, nothing replaced");
            }
            settle(&mut session);

            let markdown = updates
                .borrow()
                .last()
                .cloned()
                .unwrap_or_else(|| session.markdown().to_string());
            if in_place {
                if changed {
                    std::fs::write(&file, &markdown)
                        .into_diagnostic()
                        .wrap_err_with(|| format!("writing {}", file.display()))?;
                }
            } else {
                print!("{markdown}");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, max_length: Option<usize>) -> Result<EditorConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading config {}", path.display()))?;
            EditorConfig::from_json(&json).into_diagnostic()?
        }
        None => EditorConfig::default(),
    };
    if let Some(max_length) = max_length {
        config.max_length = max_length;
    }
    Ok(config)
}

type Updates = Rc<RefCell<Vec<String>>>;

/// Load a file into a session over the plain engine. The returned list
/// collects every markdown update the session publishes.
fn open_session(file: &Path, config: EditorConfig) -> Result<(EditorSession<PlainEngine>, Updates)> {
    let markdown = std::fs::read_to_string(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", file.display()))?;

    let updates: Updates = Rc::default();
    let sink = Rc::clone(&updates);
    let mut session = EditorSession::new(
        &markdown,
        config,
        move |md: &str| sink.borrow_mut().push(md.to_string()),
        NoStats,
    );
    session.attach(PlainEngine::new(&markdown), Instant::now());
    Ok((session, updates))
}

/// Run pending tasks until none are left, jumping straight to each deadline.
fn settle(session: &mut EditorSession<PlainEngine>) {
    while let Some(deadline) = session.next_deadline() {
        session.poll(deadline);
    }
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
