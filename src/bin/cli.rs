//! Kodigo CLI
//!
//! Drives the three views against a running `kodigo-api`:
//! - Manage tasks
//! - Book appointments
//! - Chat
//! - Watch any page live

use chrono::Datelike;
use clap::{Parser, Subcommand};
use kodigo::client::RemoteStore;
use kodigo::config::{generate_default_config, Config};
use kodigo::models::DEFAULT_AUTHOR;
use kodigo::store::DocumentStore;
use kodigo::sync::ViewState;
use kodigo::views::{render, shell, AppointmentsView, ChatView, TaskListView, ViewResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kodigo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Realtime tasks, appointments and chat")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL (default: from config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file (default: search the usual locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Task list
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Appointment scheduler
    Appointments {
        #[command(subcommand)]
        action: AppointmentAction,
    },

    /// Realtime chat
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Print the task list
    List,
    /// Add a task
    Add { text: String },
    /// Flip a task between done and not done
    Toggle { id: String },
    /// Delete a task
    Delete { id: String },
    /// Follow the task list live
    Watch,
}

#[derive(Subcommand)]
pub enum AppointmentAction {
    /// Print booked appointments
    List,
    /// Book an appointment
    Add {
        patient: String,
        /// Local date-time, e.g. 2025-06-01T09:30
        time: String,
    },
    /// Follow booked appointments live
    Watch,
}

#[derive(Subcommand)]
pub enum ChatAction {
    /// Post a message
    Send {
        text: String,
        #[arg(short, long, default_value = DEFAULT_AUTHOR)]
        author: String,
    },
    /// Follow the conversation live
    Watch {
        /// Name whose messages are highlighted
        #[arg(short, long, default_value = DEFAULT_AUTHOR)]
        author: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.client.server_url = url.clone();
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kodigo=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let remote = RemoteStore::from_config(&config.client)?;

    match cli.command {
        Commands::Tasks { action } => {
            let mut view = TaskListView::mount(connect(remote)).await;
            let ready = view.list_mut().wait_for(|s| !s.is_loading()).await;
            bail_on_error(&ready);

            let result = match action {
                TaskAction::List => {
                    print!("{}", render::tasks(&ready, None));
                    Ok("")
                }
                TaskAction::Add { text } => view.add_task(text).await.map(|_| "Task added."),
                TaskAction::Toggle { id } => view.toggle_by_id(&id).await.map(|_| "Task updated."),
                TaskAction::Delete { id } => view.delete(&id).await.map(|_| "Task deleted."),
                TaskAction::Watch => {
                    watch("/", view.list_mut().watch(), |state| {
                        render::tasks(state, None)
                    })
                    .await;
                    Ok("")
                }
            };
            view.unmount();
            report(result);
        }

        Commands::Appointments { action } => {
            let mut view = AppointmentsView::mount(connect(remote)).await;
            let ready = view.list_mut().wait_for(|s| !s.is_loading()).await;
            bail_on_error(&ready);

            let result = match action {
                AppointmentAction::List => {
                    print!("{}", render::appointments(&ready, None));
                    Ok("")
                }
                AppointmentAction::Add { patient, time } => view
                    .book(patient, time)
                    .await
                    .map(|_| "Appointment booked."),
                AppointmentAction::Watch => {
                    watch("/appointments", view.list_mut().watch(), |state| {
                        render::appointments(state, None)
                    })
                    .await;
                    Ok("")
                }
            };
            view.unmount();
            report(result);
        }

        Commands::Chat { action } => {
            let mut view = ChatView::mount(connect(remote)).await;
            let ready = view.list_mut().wait_for(|s| !s.is_loading()).await;
            bail_on_error(&ready);

            let result = match action {
                ChatAction::Send { text, author } => {
                    view.set_author(author);
                    view.send(text).await.map(|_| "Sent.")
                }
                ChatAction::Watch { author } => {
                    view.set_author(author);
                    let me = view.form.display_author();
                    watch("/chat", view.list_mut().watch(), |state| {
                        render::chat(state, &me, None)
                    })
                    .await;
                    Ok("")
                }
            };
            view.unmount();
            report(result);
        }

        Commands::Status => match remote.health().await {
            Ok(health) => {
                println!("Kodigo v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Server: {} (v{})", remote.base_url(), health.version);
                println!("Status: {}", health.status);
                println!();
                println!("Store:");
                println!("  Collections: {}", health.collections);
                println!("  Documents: {}", health.documents);
                println!("  Live queries: {}", health.live_queries);
                println!("  WebSocket connections: {}", health.ws_connections);
                println!();
                println!("Uptime: {}", format_duration(health.uptime_seconds));
            }
            Err(e) => {
                eprintln!("Cannot connect to Kodigo API at {}", remote.base_url());
                eprintln!("Error: {}", e);
                eprintln!();
                eprintln!("Make sure the Kodigo API server is running:");
                eprintln!("  cargo run --bin kodigo-api");
                std::process::exit(1);
            }
        },

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn connect(remote: RemoteStore) -> Arc<dyn DocumentStore> {
    Arc::new(remote)
}

/// A failed live query blocks the page; print it and stop
fn bail_on_error<T>(state: &ViewState<T>) {
    if let Some(message) = state.error() {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

/// Print the outcome of an action; failures exit non-zero
fn report(result: ViewResult<&str>) {
    match result {
        Ok("") => {}
        Ok(message) => println!("{}", message),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Re-render the page on every state change until the live query ends
async fn watch<T>(
    route: &str,
    mut state: tokio::sync::watch::Receiver<ViewState<T>>,
    body: impl Fn(&ViewState<T>) -> String,
) {
    let year = chrono::Local::now().year();

    loop {
        let page = {
            let current = state.borrow_and_update();
            body(&current)
        };
        println!("{}", shell::navbar(route));
        println!();
        print!("{}", page);
        println!();
        println!("{}", shell::footer(year));
        println!();

        let terminal = state.borrow().is_error();
        if terminal {
            break;
        }

        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
