#[macro_use]
extern crate rocket;

mod entrypoints;

use std::path::PathBuf;

use discovery_server::{db, metrics::DiscoveryMetrics, BulkSettings};
use rocket_prometheus::PrometheusMetrics;
use shared::telegram::TelegramSubscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, serde::Deserialize)]
pub struct Env {
    telegram_token: Option<String>,
    telegram_chat_id: Option<String>,
    issue_template_file: Option<PathBuf>,
    bulk_concurrency: Option<usize>,
}

#[launch]
async fn rocket() -> _ {
    dotenv::dotenv().ok();

    let env = envy::from_env::<Env>().expect("Failed to load environment variables");

    // Alerts are optional for local runs
    let telegram = match (env.telegram_token, env.telegram_chat_id) {
        (Some(token), Some(chat_id)) => Some(TelegramSubscriber::new(token, chat_id)),
        _ => None,
    };
    let subscriber = tracing_subscriber::registry()
        .with(telegram)
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let settings = BulkSettings::load(env.issue_template_file.as_deref(), env.bulk_concurrency)
        .expect("Failed to load bulk issue settings");

    let prometheus = PrometheusMetrics::new();
    let metrics = DiscoveryMetrics::register(&prometheus).expect("Failed to register metrics");

    let cors = rocket_cors::CorsOptions::default()
        .to_cors()
        .expect("Failed to create CORS options");

    rocket::build()
        .attach(db::stage())
        .attach(prometheus.clone())
        .attach(cors)
        .manage(settings)
        .manage(metrics)
        .mount("/metrics", prometheus)
        .attach(entrypoints::stage())
}
