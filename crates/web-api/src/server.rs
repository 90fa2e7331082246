use crate::handlers::{self, AppState};
use axum::{routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route(
                "/orders",
                get(handlers::get_orders)
                    .post(handlers::insert_order)
                    .delete(handlers::delete_orders),
            )
            .route(
                "/namespace/:namespace/orders",
                get(handlers::get_namespace_orders).delete(handlers::delete_namespace_orders),
            )
            .route("/api.yaml", get(handlers::api_doc))
            .route("/", get(handlers::api_doc_redirect))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address and runs
    /// until `shutdown` resolves.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
