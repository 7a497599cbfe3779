use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use codestreak_client::{
    ClientConfig, FriendsController, HttpGateway, MemoryCache, MutationOutcome, PendingMutation,
    ProfileLoader, RemoteGateway, ResponseCache, SearchDebouncer, SledCache, Store,
};
use codestreak_common::non_api_structs::SearchPhase;
use codestreak_common::{FriendRequestId, StreakRequestId, Username};

/// Drives the friends engine from a terminal and prints every published snapshot as a JSON line.
#[derive(Parser)]
#[command(name = "codestreak", version)]
struct Cli {
    /// Overrides CODESTREAK_API_URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Persist cached responses here instead of in memory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load friends, requests and streaks.
    Friends,
    Add { username: String },
    Accept { id: u64 },
    Reject { id: u64 },
    Cancel { id: u64 },
    Unfriend { username: String },
    Streak { username: String },
    StreakAccept { id: u64 },
    StreakReject { id: u64 },
    StreakCancel { id: u64 },
    StreakEnd { username: String },
    Search { query: String },
    Profile { username: String },
}

fn print_json(state: &impl Serialize) {
    match serde_json::to_string(state) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(%err, "could not print snapshot"),
    }
}

fn echo<S: Serialize + Send + Sync + 'static>(store: &Store<S>) {
    store.subscribe(|state: &Arc<S>| print_json(&**state)).detach();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    let gateway: Arc<dyn RemoteGateway> = Arc::new(HttpGateway::new(&config).context("building http client")?);
    let cache: Arc<dyn ResponseCache> = match &cli.cache_dir {
        Some(dir) => Arc::new(SledCache::open(dir)?),
        None => Arc::new(MemoryCache::new()),
    };

    match cli.command {
        Command::Search { query } => search(gateway, &config, &query).await,
        Command::Profile { username } => {
            let username = Username::from(&username).context("username must not be empty")?;
            let profile = ProfileLoader::new(gateway, Some(cache), &config);
            echo(profile.store());
            profile.load(&username).await;
            match &profile.store().current().error {
                Some(error) => bail!("{error}"),
                None => Ok(()),
            }
        }
        command => {
            let friends = FriendsController::new(gateway, Some(cache), &config);
            echo(friends.store());
            friends.load_all().await;
            let pending = match command {
                Command::Friends | Command::Search { .. } | Command::Profile { .. } => return Ok(()),
                Command::Add { username } => friends.send_friend_request(&username),
                Command::Accept { id } => friends.accept_friend_request(FriendRequestId(id)),
                Command::Reject { id } => friends.reject_friend_request(FriendRequestId(id)),
                Command::Cancel { id } => friends.cancel_friend_request(FriendRequestId(id)),
                Command::Unfriend { username } => friends.remove_friend(&username),
                Command::Streak { username } => friends.send_streak_request(&username),
                Command::StreakAccept { id } => friends.accept_streak_request(StreakRequestId(id)),
                Command::StreakReject { id } => friends.reject_streak_request(StreakRequestId(id)),
                Command::StreakCancel { id } => friends.cancel_streak_request(StreakRequestId(id)),
                Command::StreakEnd { username } => friends.delete_friend_streak(&username),
            };
            settle(pending).await
        }
    }
}

async fn settle(pending: PendingMutation) -> Result<()> {
    match pending.await {
        MutationOutcome::Committed => Ok(()),
        MutationOutcome::RolledBack(err) | MutationOutcome::Rejected(err) => bail!("{}", err.user_message()),
    }
}

async fn search(gateway: Arc<dyn RemoteGateway>, config: &ClientConfig, query: &str) -> Result<()> {
    let search = SearchDebouncer::new(gateway, config);
    if query.trim().chars().count() < config.min_query_len {
        bail!("search needs at least {} characters", config.min_query_len);
    }
    let mut updates = search.store().updates();
    search.on_query_changed(query);
    let mut dispatched = false;
    let wait = config.search_debounce + config.request_timeout;
    let settled = tokio::time::timeout(wait, async {
        while let Some(state) = updates.recv().await {
            print_json(&*state);
            match state.phase {
                SearchPhase::InFlight => dispatched = true,
                SearchPhase::Idle if dispatched => return Some(state),
                _ => {}
            }
        }
        None
    })
    .await
    .context("search timed out")?;
    match settled.and_then(|state| state.error.clone()) {
        Some(error) => bail!("{error}"),
        None => Ok(()),
    }
}
