use std::{path::PathBuf, sync::Arc};

use discovery_digest::{
    config::{poll_interval, WatchList},
    prometheus::PrometheusClient,
    Context, ScanOutcome, ScanWindows,
};
use rocket::routes;
use serde::Deserialize;
use shared::{github::GithubClient, telegram::TelegramSubscriber};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

#[derive(Deserialize)]
struct Env {
    github_token: String,
    repos_file: PathBuf,
    telegram_token: String,
    telegram_chat_id: String,
    poll_interval_minutes: Option<u64>,
}

#[rocket::get("/metrics")]
pub async fn metrics(
    state: &rocket::State<Context>,
) -> Option<(
    rocket::http::ContentType,
    rocket::response::content::RawHtml<String>,
)> {
    let used = state.github.rate_limit_used().await.ok()?;
    state.prometheus.set_read_requests(used);
    let metrics = state.prometheus.encode().ok()?;
    Some((
        rocket::http::ContentType::new(
            "application/openmetrics-text",
            " version=1.0.0; charset=utf-8",
        ),
        rocket::response::content::RawHtml(metrics),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let env = envy::from_env::<Env>()?;
    let telegram = TelegramSubscriber::new(env.telegram_token, env.telegram_chat_id);

    let subscriber = tracing_subscriber::registry()
        .with(telegram.clone())
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    let watch_list = WatchList::load_from_file(&env.repos_file)?;
    info!("Watching {} repositories", watch_list.repositories.len());

    let context = Context {
        github: GithubClient::new(env.github_token)?.into(),
        telegram: telegram.into(),
        prometheus: Arc::new(PrometheusClient::default()),
        watch_list: watch_list.into(),
    };
    let interval = poll_interval(env.poll_interval_minutes)?;

    tokio::select! {
        _ = run(context.clone(), interval) => {
        }
        _ = signal::ctrl_c() => {
            tracing::warn!("Received SIGINT. Exiting.");
        }
        _ = rocket::build()
            .mount("/", routes![metrics])
            .manage(context)
            .launch() => {
            }
    }
    tracing::warn!("Exiting digest worker...");

    Ok(())
}

async fn run(context: Context, period: tokio::time::Duration) {
    tracing::warn!("Starting digest worker...");

    let mut interval = tokio::time::interval(period);
    let lookback = chrono::Duration::from_std(period).unwrap_or_default();
    let mut windows = ScanWindows::new(
        &context.watch_list.repositories,
        chrono::Utc::now() - lookback,
    );

    loop {
        interval.tick().await;
        let outcomes = context.scan_all(&mut windows, chrono::Utc::now()).await;
        let sent = outcomes
            .iter()
            .filter(|outcome| **outcome == ScanOutcome::Notified)
            .count();
        let failed = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        info!("Scan finished, {sent} digests sent, {failed} repositories to retry");
    }
}
