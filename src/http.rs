use crate::catalog::TimeslotCatalog;
use crate::error::BookingError;
use crate::types::{Delivery, Timeslot};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeslotsRequest {
    postcode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryRequest {
    user_id: String,
    timeslot_id: Uuid,
}

pub fn app<C: TimeslotCatalog>(state: AppState<C>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/timeslots", post(list_timeslots))
        .route("/deliveries", post(book_delivery))
        .route("/deliveries/:id", get(get_delivery).delete(cancel_delivery))
        .route("/deliveries/daily", get(daily_deliveries))
        .route("/deliveries/weekly", get(weekly_deliveries))
        .with_state(state)
        .layer(cors)
}

pub async fn serve<C: TimeslotCatalog>(state: AppState<C>, listener: TcpListener) {
    axum::serve(listener, app(state)).await.unwrap();
}

fn error_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::TimeslotNotFound(_) | BookingError::DeliveryNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        BookingError::TimeslotCapacityExceeded { .. } | BookingError::DayCapacityExceeded { .. } => {
            StatusCode::CONFLICT
        }
        BookingError::Transient => StatusCode::SERVICE_UNAVAILABLE,
        BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: BookingError) -> (StatusCode, String) {
    if let BookingError::Storage(_) = &err {
        error!("{err}");
    }
    (error_status(&err), err.to_string())
}

async fn list_timeslots<C: TimeslotCatalog>(
    State(state): State<AppState<C>>,
    Json(request): Json<TimeslotsRequest>,
) -> Json<Vec<Timeslot>> {
    Json(state.catalog.by_postcode(&request.postcode))
}

async fn book_delivery<C: TimeslotCatalog>(
    State(state): State<AppState<C>>,
    Json(request): Json<DeliveryRequest>,
) -> Result<(StatusCode, Json<Delivery>), (StatusCode, String)> {
    match state
        .admission
        .book_delivery(&request.user_id, request.timeslot_id)
    {
        Ok(delivery) => Ok((StatusCode::CREATED, Json(delivery))),
        Err(err) => Err(error_response(err)),
    }
}

async fn get_delivery<C: TimeslotCatalog>(
    State(state): State<AppState<C>>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<Delivery>, (StatusCode, String)> {
    match state.queries.delivery(delivery_id) {
        Ok(delivery) => Ok(Json(delivery)),
        Err(err) => Err(error_response(err)),
    }
}

async fn cancel_delivery<C: TimeslotCatalog>(
    State(state): State<AppState<C>>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<Delivery>, (StatusCode, String)> {
    match state.admission.cancel_delivery(delivery_id) {
        Ok(delivery) => Ok(Json(delivery)),
        Err(err) => Err(error_response(err)),
    }
}

async fn daily_deliveries<C: TimeslotCatalog>(
    State(state): State<AppState<C>>,
) -> Result<Json<Vec<Delivery>>, (StatusCode, String)> {
    match state.queries.daily_deliveries(Utc::now().date_naive()) {
        Ok(deliveries) => Ok(Json(deliveries)),
        Err(err) => Err(error_response(err)),
    }
}

async fn weekly_deliveries<C: TimeslotCatalog>(
    State(state): State<AppState<C>>,
) -> Result<Json<Vec<Delivery>>, (StatusCode, String)> {
    match state.queries.weekly_deliveries(Utc::now().date_naive()) {
        Ok(deliveries) => Ok(Json(deliveries)),
        Err(err) => Err(error_response(err)),
    }
}
