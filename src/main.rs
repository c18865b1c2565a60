use crate::admission::AdmissionController;
use crate::catalog::{LocalCatalog, TimeslotCatalog};
use crate::configuration::Configuration;
use crate::configuration_handler::EnvConfiguration;
use crate::ledger::DeliveryLedger;
use crate::query::BookingQueryService;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod admission;
mod catalog;
mod configuration;
mod configuration_handler;
mod counter;
mod error;
mod http;
mod ledger;
mod query;
#[cfg(test)]
mod testutils;
mod types;

#[derive(Clone)]
pub struct AppState<C: TimeslotCatalog> {
    pub catalog: C,
    pub admission: AdmissionController<C>,
    pub queries: BookingQueryService,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let configuration = EnvConfiguration;
    let ledger = match configuration.database_path() {
        Some(path) => DeliveryLedger::open(&path),
        None => DeliveryLedger::open_in_memory(),
    }
    .expect("failed to open delivery ledger");

    let catalog = LocalCatalog::default();
    catalog.insert_example_timeslots();

    let state = AppState {
        catalog: catalog.clone(),
        admission: AdmissionController::new(catalog, ledger.clone()),
        queries: BookingQueryService::new(ledger),
    };

    let address = format!("127.0.0.1:{}", configuration.port());
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("failed to bind listener");
    info!("delivery manager listening on {address}");
    http::serve(state, listener).await;
}
