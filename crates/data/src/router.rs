//! Per-request backend selection.

use std::sync::Arc;

use crate::error::OrderStoreError;
use crate::repositories::OrderStore;

/// Which of the two bound stores serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Primary,
    Secondary,
}

impl Route {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holds the primary and secondary stores bound at startup.
///
/// A request goes to the primary store only when its routing value equals
/// the selector exactly; everything else, including a missing value, goes to
/// the secondary store.
#[derive(Clone)]
pub struct BackendRouter {
    primary: Arc<dyn OrderStore>,
    secondary: Arc<dyn OrderStore>,
    selector: String,
}

impl std::fmt::Debug for BackendRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRouter")
            .field("primary", &self.primary.backend_name())
            .field("secondary", &self.secondary.backend_name())
            .field("selector", &self.selector)
            .finish()
    }
}

impl BackendRouter {
    #[must_use]
    pub fn new(
        primary: Arc<dyn OrderStore>,
        secondary: Arc<dyn OrderStore>,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            secondary,
            selector: selector.into(),
        }
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Case-sensitive exact match against the selector. An empty value never
    /// matches, even against an empty selector.
    #[must_use]
    pub fn route(&self, value: Option<&str>) -> Route {
        match value {
            Some(v) if !v.is_empty() && v == self.selector => Route::Primary,
            _ => Route::Secondary,
        }
    }

    #[must_use]
    pub fn repository(&self, route: Route) -> &dyn OrderStore {
        match route {
            Route::Primary => self.primary.as_ref(),
            Route::Secondary => self.secondary.as_ref(),
        }
    }

    #[must_use]
    pub fn select(&self, value: Option<&str>) -> &dyn OrderStore {
        self.repository(self.route(value))
    }

    /// Tears down both stores. The secondary is torn down even if the
    /// primary fails; the first error is returned and the second logged.
    ///
    /// # Errors
    /// Returns the teardown error of the primary store, else of the secondary.
    pub async fn teardown(&self) -> Result<(), OrderStoreError> {
        let primary = self.primary.teardown().await;
        let secondary = self.secondary.teardown().await;

        match (primary, secondary) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(first), Err(second)) => {
                tracing::error!("Secondary teardown failed too: {}", second);
                Err(first)
            }
        }
    }
}
