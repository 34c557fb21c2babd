use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tudu_core::{Item, MemStore, Msg, Outcome, RemoteStore, Session, SessionConfig, ORDER_BY_TITLE};

mod config;
mod logging;
mod theme;
mod view;

/// How long quitting waits for requests that are still in flight.
const EXIT_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "tudu", version, about = "Realtime-synced todo list")]
struct Cli {
    /// Store backend (overrides settings.toml)
    #[arg(long, global = true, value_enum)]
    store: Option<StoreKind>,
    /// Realtime Database URL, e.g. https://<db>.firebaseio.com
    #[arg(long, global = true)]
    url: Option<String>,
    /// Database secret or ID token for the Realtime Database
    #[arg(long, global = true)]
    auth: Option<String>,
    /// Collection path holding the todos
    #[arg(long, global = true)]
    collection: Option<String>,
    /// Pre-populate the memory store (repeatable)
    #[arg(long = "seed", value_name = "TITLE", global = true)]
    seeds: Vec<String>,
    /// Make every mutation against the memory store fail
    #[arg(long, global = true, hide = true)]
    offline: bool,
    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    log_stderr: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Mem,
    Rtdb,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive list view (default)
    View,
    /// Print the current list
    List {
        /// Case-insensitive substring filter
        #[arg(long)]
        search: Option<String>,
        /// Sort alphabetically instead of store order
        #[arg(long)]
        sort: bool,
        #[arg(long)]
        json: bool,
    },
    /// Add a new item
    Add {
        title: String,
        #[arg(long)]
        json: bool,
    },
    /// Replace an item's title
    Edit {
        // push ids start with '-'
        #[arg(allow_hyphen_values = true)]
        id: String,
        title: String,
    },
    /// Remove an item
    Delete {
        #[arg(allow_hyphen_values = true)]
        id: String,
    },
    /// Show effective settings and paths
    Config {
        #[arg(long)]
        json: bool,
    },
}

enum Backend {
    Memory { seeds: Vec<String>, offline: bool },
    #[cfg_attr(not(feature = "rtdb"), allow(dead_code))]
    Rtdb { url: String, auth: Option<String> },
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    if let Err(err) = logging::init(cli.log_stderr) {
        eprintln!("tudu: logging disabled: {err:#}");
    }
    let settings = config::load_settings();
    let command = cli.command.take().unwrap_or(Commands::View);

    if let Commands::Config { json } = command {
        return print_config(&settings, json);
    }

    let backend = resolve_backend(&cli, &settings)?;
    let collection = cli
        .collection
        .clone()
        .unwrap_or_else(|| settings.storage.collection().to_string());
    let session_config = SessionConfig {
        collection,
        order_by: ORDER_BY_TITLE.to_string(),
        search_delay: settings.search.delay(),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    // mutations are spawned from the synchronous view loop
    let _guard = rt.enter();
    let store = open_store(backend, &session_config.collection)?;
    let mut session = rt
        .block_on(Session::start(store, session_config))
        .context("subscribing to the collection")?;
    rt.block_on(session.next_snapshot());

    let result = match command {
        Commands::View => {
            let palette = theme::Palette::from_settings(&settings.tui);
            let alt_screen = settings.tui.alt_screen.unwrap_or(true);
            let res = view::run_view(&mut session, &palette, alt_screen);
            if rt
                .block_on(tokio::time::timeout(EXIT_GRACE, session.flush()))
                .is_err()
            {
                warn!(inflight = session.inflight(), "exiting with requests in flight");
            }
            res
        }
        Commands::List { search, sort, json } => {
            if let Some(term) = search {
                let now = Instant::now();
                let delay = session.config().search_delay;
                session.dispatch(Msg::SearchEdited {
                    value: term,
                    at: now,
                });
                session.tick(now + delay);
            }
            if sort {
                session.dispatch(Msg::SortToggled);
            }
            print_items(&session.state().visible(), json)
        }
        Commands::Add { title, json } => {
            if title.is_empty() {
                bail!("nothing to add: title is empty");
            }
            session.dispatch(Msg::DraftEdited(title.clone()));
            session.dispatch(Msg::AddRequested);
            match settle(&rt, &mut session)? {
                Outcome::Created(id) if json => {
                    let item = Item::new(id, title);
                    println!("{}", serde_json::to_string_pretty(&item)?);
                    Ok(())
                }
                Outcome::Created(id) => {
                    println!("added {id}");
                    Ok(())
                }
                other => bail!("unexpected outcome {other:?}"),
            }
        }
        Commands::Edit { id, title } => {
            ensure_exists(&session, &id)?;
            session.dispatch(Msg::ItemEdited {
                id: id.clone(),
                title,
            });
            settle(&rt, &mut session)?;
            println!("updated {id}");
            Ok(())
        }
        Commands::Delete { id } => {
            ensure_exists(&session, &id)?;
            session.dispatch(Msg::DeleteRequested(id.clone()));
            settle(&rt, &mut session)?;
            println!("deleted {id}");
            Ok(())
        }
        Commands::Config { .. } => unreachable!("handled before the store is opened"),
    };

    session.shutdown();
    result
}

fn resolve_backend(cli: &Cli, settings: &config::Settings) -> Result<Backend> {
    let (configured_url, configured_auth) = match &settings.storage {
        config::Storage::Rtdb {
            url, auth_token, ..
        } => (Some(url.clone()), auth_token.clone()),
        config::Storage::Memory { .. } => (None, None),
    };
    let kind = cli.store.unwrap_or(match settings.storage {
        config::Storage::Rtdb { .. } => StoreKind::Rtdb,
        config::Storage::Memory { .. } => StoreKind::Mem,
    });
    match kind {
        StoreKind::Mem => Ok(Backend::Memory {
            seeds: cli.seeds.clone(),
            offline: cli.offline,
        }),
        StoreKind::Rtdb => {
            if !cli.seeds.is_empty() || cli.offline {
                bail!("--seed and --offline only apply to the memory store");
            }
            let Some(url) = cli.url.clone().or(configured_url).filter(|u| !u.trim().is_empty())
            else {
                bail!("the rtdb store needs --url or storage.url in settings.toml");
            };
            Ok(Backend::Rtdb {
                url,
                auth: cli.auth.clone().or(configured_auth),
            })
        }
    }
}

fn open_store(backend: Backend, collection: &str) -> Result<Arc<dyn RemoteStore>> {
    match backend {
        Backend::Memory { seeds, offline } => {
            let store = MemStore::new();
            for title in &seeds {
                store.seed(collection, title);
            }
            store.set_offline(offline);
            info!(seeded = seeds.len(), offline, "using memory store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "rtdb")]
        Backend::Rtdb { url, auth } => {
            info!(%url, "using realtime database");
            Ok(Arc::new(tudu_core::RtdbStore::new(&url, auth)?))
        }
        #[cfg(not(feature = "rtdb"))]
        Backend::Rtdb { .. } => bail!("this build has no rtdb support"),
    }
}

/// Waits for the issued request and reports the first failure as an error.
fn settle(rt: &Runtime, session: &mut Session) -> Result<Outcome> {
    rt.block_on(session.flush());
    let mut outcomes = session.take_outcomes().into_iter();
    match outcomes.next() {
        Some(Outcome::Failed(err)) => Err(err.into()),
        Some(outcome) => Ok(outcome),
        None => bail!("no request was issued"),
    }
}

fn ensure_exists(session: &Session, id: &str) -> Result<()> {
    if session.state().item(id).is_none() {
        bail!("no item with id {id}");
    }
    Ok(())
}

fn print_items(items: &[&Item], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        for item in items {
            println!("{}\t{}", item.id, item.title);
        }
    }
    Ok(())
}

fn print_config(settings: &config::Settings, json: bool) -> Result<()> {
    let shown = settings.redacted();
    if json {
        let v = serde_json::json!({
            "config_dir": config::config_dir(),
            "settings_path": config::settings_path(),
            "state_dir": config::state_dir(),
            "log_path": config::log_path(),
            "collection": shown.storage.collection(),
            "storage": shown.storage,
            "search": shown.search,
            "tui": shown.tui,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("settings: {}", config::settings_path().display());
        println!("log:      {}", config::log_path().display());
        println!();
        print!("{}", toml::to_string_pretty(&shown)?);
    }
    Ok(())
}
