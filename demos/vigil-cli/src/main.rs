//! Command-line driver for the Vigil client state layer.
//!
//! Run with: cargo run -p vigil-cli -- <command>
//!
//! Point it at a server with `VIGIL_BASE_URL` (default
//! `http://localhost:8080`). The token and theme preference are kept in the
//! platform data directory unless `VIGIL_STORAGE_PATH` says otherwise.

use std::sync::Arc;

use anyhow::{Context, bail};
use futures::StreamExt;
use vigil_client::HttpClient;
use vigil_core::{ClientConfig, KeyValueStorage, MonitorDraft, MonitorId};
use vigil_monitors::MonitorStore;
use vigil_session::{
    CredentialStore, SessionStore, ThemeStore,
    storage::{FileStorage, NoopStorage},
};

const USAGE: &str = "usage: vigil <command>

commands:
  status                              show setup and session state
  setup <username> <email> <password> create the first admin account
  register <username> <email> <password>
  login <username> <password>
  logout
  monitors                            list monitors
  add <name> <url> [interval-secs]    create an HTTP monitor
  rm <id>                             delete a monitor
  theme [toggle|dark|light]           show or change the theme preference";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let config = ClientConfig::from_env();
    let storage = open_storage(&config);

    let client = HttpClient::new(config.clone()).context("building HTTP client")?;
    let credentials = CredentialStore::with_key(Arc::clone(&storage), config.token_key.clone());
    let session = SessionStore::new(client.clone(), credentials);
    let monitors = MonitorStore::new(client.with_session(session.state_handle()));
    let theme = ThemeStore::with_key(Arc::clone(&storage), config.theme_key.clone());

    // The demo's only subscriber: log every committed session change.
    let mut changes = session.stream();
    let watcher = tokio::spawn(async move {
        while let Some(state) = changes.next().await {
            tracing::debug!(phase = ?state.phase(), "Session state");
        }
    });

    let result = run(command, &args[1..], &session, &monitors, &theme).await;
    watcher.abort();
    result
}

fn open_storage(config: &ClientConfig) -> Arc<dyn KeyValueStorage> {
    let opened = match &config.storage_path {
        Some(path) => FileStorage::open(path),
        None => FileStorage::open_default(),
    };

    match opened {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            tracing::warn!(error = %e, "No durable storage, credentials will not persist");
            Arc::new(NoopStorage)
        }
    }
}

async fn run(
    command: &str,
    args: &[String],
    session: &SessionStore<HttpClient>,
    monitors: &MonitorStore<HttpClient>,
    theme: &ThemeStore,
) -> anyhow::Result<()> {
    match (command, args) {
        ("status", []) => {
            let setup = session.check_setup_status().await;
            session.check_auth().await;
            let state = session.state();
            println!("setup:   {setup:?}");
            println!("session: {:?}", state.phase());
            if let Some(user) = state.user() {
                println!("user:    {}", user.username);
            }
        }
        ("setup", [username, email, password]) => {
            let outcome = session.setup(username, email, password).await;
            report(outcome.success, outcome.error.as_deref())?;
        }
        ("register", [username, email, password]) => {
            let outcome = session.register(username, email, password).await;
            report(outcome.success, outcome.error.as_deref())?;
        }
        ("login", [username, password]) => {
            report(session.login(username, password).await, Some("Login failed"))?;
        }
        ("logout", []) => {
            session.logout();
            println!("ok");
        }
        ("monitors", []) => {
            session.check_auth().await;
            for monitor in monitors.fetch_all().await? {
                println!(
                    "{:>5}  {:<24} {:<8} {}",
                    monitor.id,
                    monitor.name().unwrap_or("-"),
                    monitor.current_status().unwrap_or("-"),
                    monitor.url().unwrap_or("-"),
                );
            }
        }
        ("add", [name, url, rest @ ..]) if rest.len() <= 1 => {
            require_session(session).await?;
            let mut draft = MonitorDraft::named(name.as_str())
                .with_url(url.as_str())
                .with_kind("http");
            if let Some(interval) = rest.first() {
                draft = draft.with_interval(interval.parse().context("interval must be seconds")?);
            }
            let created = monitors.create(&draft).await?;
            println!("created monitor {}", created.id);
        }
        ("rm", [id]) => {
            require_session(session).await?;
            let id = MonitorId(id.parse().context("monitor id must be a number")?);
            monitors.delete(id).await?;
            println!("deleted monitor {id}");
        }
        ("theme", []) => println!("{}", if theme.get() { "dark" } else { "light" }),
        ("theme", [mode]) => {
            match mode.as_str() {
                "toggle" => {
                    theme.toggle();
                }
                "dark" => theme.set(true),
                "light" => theme.set(false),
                other => bail!("unknown theme mode: {other}"),
            }
            println!("{}", if theme.get() { "dark" } else { "light" });
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}

async fn require_session(session: &SessionStore<HttpClient>) -> anyhow::Result<()> {
    if session.check_auth().await {
        Ok(())
    } else {
        bail!("not logged in")
    }
}

fn report(success: bool, error: Option<&str>) -> anyhow::Result<()> {
    if success {
        println!("ok");
        Ok(())
    } else {
        bail!("{}", error.unwrap_or("failed"))
    }
}
