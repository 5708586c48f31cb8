mod commands;
mod config;
mod openweather;
mod server;

use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    cmd_init, cmd_todo_add, cmd_todo_delete, cmd_todo_export, cmd_todo_list, cmd_todo_toggle,
    cmd_weather_current, cmd_weather_export, cmd_weather_forecast, cmd_weather_forget,
    cmd_weather_history, cmd_weather_locations, cmd_weather_save,
};
use crate::config::Config;
use crate::openweather::OpenWeatherClient;
use dashkit_core::db::Schema;

#[derive(Parser)]
#[command(
    name = "dashkit",
    version,
    about = "A task manager and a weather dashboard",
    long_about = "A task manager and a weather dashboard backed by SQLite.\n\n\
Each app can be served as a web page, driven from the command line, or\n\
exported to a static HTML file."
)]
struct Cli {
    /// Directory holding the app databases (default: $DASHKIT_DATA_DIR or ./data)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and both databases
    Init,
    /// Manage todos
    Todo {
        #[command(subcommand)]
        command: TodoCommands,
    },
    /// Look up weather and manage saved locations
    Weather {
        #[command(subcommand)]
        command: WeatherCommands,
    },
}

#[derive(Subcommand)]
enum TodoCommands {
    /// Serve the task manager page and JSON API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// List todos
    List {
        /// Status filter: all, pending, completed
        #[arg(long)]
        status: Option<String>,
        /// Priority filter: all, low, medium, high
        #[arg(long)]
        priority: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a todo
    Add {
        /// Todo title
        title: String,
        /// Optional longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Priority: low, medium, high
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a todo between pending and completed
    Toggle {
        /// Todo ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a todo
    Delete {
        /// Todo ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the task manager page to a static HTML file
    Export {
        /// Output file
        #[arg(default_value = "todo.html")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum WeatherCommands {
    /// Serve the weather dashboard page and JSON API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8081")]
        port: u16,
        /// Address to bind to (use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Show current weather for a city (recorded in search history)
    Current {
        /// City name
        city: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the 5-day forecast for a city
    Forecast {
        /// City name
        city: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent searches
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved locations
    Locations {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up a city and save it as a location
    Save {
        /// City name
        city: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved location
    Forget {
        /// Saved location ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the weather dashboard to a static HTML file
    Export {
        /// Output file
        #[arg(default_value = "weather.html")]
        path: PathBuf,
        /// Load this city (and its forecast) before rendering
        #[arg(long)]
        city: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;

    match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Todo { command } => run_todo(&config, command).await,
        Commands::Weather { command } => run_weather(&config, command).await,
    }
}

async fn run_todo(config: &Config, command: TodoCommands) -> Result<()> {
    let db = config.open_db(Schema::Todo)?;

    match command {
        TodoCommands::Serve { port, bind } => server::todo::start_server(db, &bind, port).await,
        TodoCommands::List {
            status,
            priority,
            json,
        } => cmd_todo_list(&db, status.as_deref(), priority.as_deref(), json),
        TodoCommands::Add {
            title,
            description,
            priority,
            json,
        } => cmd_todo_add(&db, title, description, &priority, json),
        TodoCommands::Toggle { id, json } => cmd_todo_toggle(&db, id, json),
        TodoCommands::Delete { id, json } => cmd_todo_delete(&db, id, json),
        TodoCommands::Export { path } => cmd_todo_export(&db, &path),
    }
}

async fn run_weather(config: &Config, command: WeatherCommands) -> Result<()> {
    let db = Mutex::new(config.open_db(Schema::Weather)?);
    let client = OpenWeatherClient::new_with_base_url(config.api_key.clone(), &config.base_url)?;

    match command {
        WeatherCommands::Serve { port, bind } => {
            let db = db.into_inner().unwrap_or_else(PoisonError::into_inner);
            server::weather::start_server(db, Arc::new(client), &bind, port).await
        }
        WeatherCommands::Current { city, json } => {
            cmd_weather_current(&client, &db, &city, json).await
        }
        WeatherCommands::Forecast { city, json } => {
            cmd_weather_forecast(&client, &city, json).await
        }
        WeatherCommands::History { json } => cmd_weather_history(&db, json),
        WeatherCommands::Locations { json } => cmd_weather_locations(&db, json),
        WeatherCommands::Save { city, json } => cmd_weather_save(&client, &db, &city, json).await,
        WeatherCommands::Forget { id, json } => cmd_weather_forget(&db, id, json),
        WeatherCommands::Export { path, city } => {
            cmd_weather_export(&client, &db, &path, city.as_deref()).await
        }
    }
}
