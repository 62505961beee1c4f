//! `pragya` -- command-line client for the Pragya API.
//!
//! Keeps a session on disk (or in the OS keychain) and renews it
//! transparently when the API answers 401.
//!
//! # Environment variables
//!
//! | Variable                           | Default                     | Description                    |
//! |------------------------------------|-----------------------------|--------------------------------|
//! | `PRAGYA_API_URL`                   | `http://localhost:3001/api` | API base URL                   |
//! | `PRAGYA_SESSION_STORE`             | `file`                      | `file`, `keyring` or `memory`  |
//! | `PRAGYA_SESSION_FILE`              | `~/.pragya/session.json`    | Session file for the file store |
//! | `PRAGYA_HTTP_TIMEOUT_SECS`         | `30`                        | Per-request timeout            |
//! | `PRAGYA_HTTP_CONNECT_TIMEOUT_SECS` | `10`                        | Connect timeout                |

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use pragya_lib::config::{ClientConfig, StoreKind};
use pragya_lib::navigation::{LoginNavigator, LoginRedirect};
use pragya_lib::types::{LoginRequest, RegisterRequest};
use pragya_lib::{ApiClient, ApiRequest, AuthService};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pragya")]
#[command(about = "Pragya API client with transparent session renewal")]
struct Cli {
    /// API base URL (overrides PRAGYA_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where the session is kept (overrides PRAGYA_SESSION_STORE)
    #[arg(long, global = true)]
    store: Option<StoreArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreArg {
    File,
    Keyring,
    Memory,
}

impl From<StoreArg> for StoreKind {
    fn from(value: StoreArg) -> Self {
        match value {
            StoreArg::File => StoreKind::File,
            StoreArg::Keyring => StoreKind::Keyring,
            StoreArg::Memory => StoreKind::Memory,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session
    Login {
        email: String,
        #[arg(long, env = "PRAGYA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and store the session
    Register {
        email: String,
        #[arg(long, env = "PRAGYA_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "STUDENT")]
        role: String,
        /// Extra profile field as key=value (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Fetch the signed-in user from the API
    Me,
    /// Show the cached user without calling the API
    Whoami,
    /// GET a path and print the JSON response
    Get { path: String },
    /// Send an arbitrary request with an optional JSON body
    Request {
        method: String,
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Download a file
    Download {
        path: String,
        /// Output file (defaults to the server-provided name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Stand-in for the login screen on a terminal.
struct TerminalNavigator;

impl LoginNavigator for TerminalNavigator {
    fn redirect_to_login(&self, redirect: LoginRedirect) {
        eprintln!("Session expired ({}). Run `pragya login <email>` to sign in again.", redirect.reason);
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn print_json(value: &impl serde::Serialize) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_base_url(url)?;
    }
    if let Some(store) = cli.store {
        config.store = store.into();
    }

    tracing::debug!(base_url = %config.base_url, store = ?config.store, "client configured");

    let client = ApiClient::from_config(&config, config.session_store()?)?
        .with_navigator(Arc::new(TerminalNavigator));
    let auth = AuthService::new(client.clone());

    match cli.command {
        Command::Login { email, password } => {
            let user = auth.login(&LoginRequest::new(email, password)).await?;
            eprintln!("Signed in as {} ({})", user.email, user.role);
        }
        Command::Register {
            email,
            password,
            role,
            fields,
        } => {
            let request = fields
                .into_iter()
                .fold(RegisterRequest::new(email, password, role), |req, (k, v)| {
                    req.with_profile_field(k, v)
                });
            let user = auth.register(&request).await?;
            eprintln!("Registered {} ({})", user.email, user.role);
        }
        Command::Logout => {
            auth.logout().await?;
            eprintln!("Signed out");
        }
        Command::Me => print_json(&auth.me().await?)?,
        Command::Whoami => match auth.current_user().await? {
            Some(user) => print_json(&user)?,
            None => eprintln!("Not signed in"),
        },
        Command::Get { path } => {
            let value: Value = client.get_json(&path).await?;
            print_json(&value)?;
        }
        Command::Request { method, path, data } => {
            let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut request = ApiRequest::new(method, &path);
            if let Some(data) = data {
                let body: Value = serde_json::from_str(&data)?;
                request = request.json(&body)?;
            }
            let response = client.send(request).await?.error_for_status()?;
            if response.bytes().is_empty() {
                eprintln!("{}", response.status());
            } else {
                match response.json::<Value>() {
                    Ok(value) => print_json(&value)?,
                    Err(_) => println!("{}", response.text()),
                }
            }
        }
        Command::Download { path, out } => {
            let file = client.download(&path).await?;
            let target = out
                .or_else(|| file.filename.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("download.bin"));
            tokio::fs::write(&target, &file.bytes).await?;
            eprintln!(
                "Saved {} bytes ({}) to {}",
                file.bytes.len(),
                file.content_type,
                target.display()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pragya=info,pragya_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", pragya_lib::redact_secrets(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}
