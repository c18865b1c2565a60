use crate::admission::AdmissionController;
use crate::catalog::LocalCatalog;
use crate::http;
use crate::ledger::DeliveryLedger;
use crate::query::BookingQueryService;
use crate::AppState;
use std::net::SocketAddr;
use tokio::{net::TcpListener, task::JoinHandle};

/// Fresh application state over an in-memory ledger and an empty local
/// catalog. The catalog and ledger handles are returned for seeding.
pub fn local_state() -> (AppState<LocalCatalog>, LocalCatalog, DeliveryLedger) {
    let catalog = LocalCatalog::default();
    let ledger = DeliveryLedger::open_in_memory().unwrap();
    let state = AppState {
        catalog: catalog.clone(),
        admission: AdmissionController::new(catalog.clone(), ledger.clone()),
        queries: BookingQueryService::new(ledger.clone()),
    };
    (state, catalog, ledger)
}

/// Serve the app on an ephemeral port so parallel tests never collide.
pub async fn spawn_server(state: AppState<LocalCatalog>) -> (JoinHandle<()>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (tokio::spawn(http::serve(state, listener)), addr)
}
