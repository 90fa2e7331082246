use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use orders_core::{MissingSelector, Order, OrderRequest, RoutingConfig};
use orders_data::{BackendRouter, OrderStore};
use std::sync::Arc;

use crate::error::{ApiError, INVALID_BODY};

const API_DOC: &str = include_str!("../api.yaml");

/// Shared handler state.
#[derive(Debug)]
pub struct AppState {
    router: BackendRouter,
    header: HeaderName,
    missing_selector: MissingSelector,
}

impl AppState {
    /// # Errors
    /// Returns an error if `routing.header` is not a valid header name.
    pub fn new(router: BackendRouter, routing: &RoutingConfig) -> anyhow::Result<Self> {
        let header = HeaderName::from_bytes(routing.header.trim().as_bytes())?;
        Ok(Self {
            router,
            header,
            missing_selector: routing.missing_selector,
        })
    }

    #[must_use]
    pub const fn router(&self) -> &BackendRouter {
        &self.router
    }

    /// Picks the store for a request from its routing header.
    ///
    /// # Errors
    /// Returns 400 when the header is absent and the policy is `reject`.
    fn store(&self, headers: &HeaderMap) -> Result<&dyn OrderStore, ApiError> {
        let value = match headers.get(&self.header) {
            Some(value) => Some(value.to_str().unwrap_or_default()),
            None if self.missing_selector == MissingSelector::Reject => {
                return Err(ApiError::bad_request(format!(
                    "Missing {} header.",
                    self.header
                )));
            }
            None => None,
        };

        let route = self.router.route(value);
        tracing::debug!("Routing request to {} backend", route);
        Ok(self.router.repository(route))
    }
}

/// Creates an order from a JSON body.
///
/// # Errors
/// 400 for unreadable or invalid payloads, 409 for an existing key, 500
/// otherwise.
pub async fn insert_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let store = state.store(&headers)?;

    let request: OrderRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request(INVALID_BODY))?;
    let order = request.validate()?;

    tracing::debug!("Inserting order: {:?}", order);
    store
        .insert(&order)
        .await
        .map_err(|e| ApiError::from_store(e, &format!("Error inserting order {order:?}")))?;

    Ok(StatusCode::CREATED)
}

/// Lists orders from every namespace.
///
/// # Errors
/// 500 if the store fails.
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let store = state.store(&headers)?;
    tracing::debug!("Retrieving orders");

    let orders = store
        .list_all()
        .await
        .map_err(|e| ApiError::from_store(e, "Error retrieving orders"))?;
    Ok(Json(orders))
}

/// Lists the orders of one namespace.
///
/// # Errors
/// 500 if the store fails.
pub async fn get_namespace_orders(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let store = state.store(&headers)?;
    tracing::debug!("Retrieving orders for namespace: {}", namespace);

    let orders = store
        .list_by_namespace(&namespace)
        .await
        .map_err(|e| ApiError::from_store(e, "Error retrieving orders"))?;
    Ok(Json(orders))
}

/// # Errors
/// 500 if the store fails.
pub async fn delete_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let store = state.store(&headers)?;
    tracing::debug!("Deleting all orders");

    store
        .delete_all()
        .await
        .map_err(|e| ApiError::from_store(e, "Error deleting orders"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
/// 500 if the store fails.
pub async fn delete_namespace_orders(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let store = state.store(&headers)?;
    tracing::debug!("Deleting orders in namespace {}", namespace);

    store.delete_by_namespace(&namespace).await.map_err(|e| {
        ApiError::from_store(e, &format!("Error deleting orders in namespace {namespace}"))
    })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serves the OpenAPI document.
pub async fn api_doc() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], API_DOC)
}

pub async fn api_doc_redirect() -> Redirect {
    Redirect::permanent("/api.yaml")
}
