//! Order model and request validation.
//!
//! An [`Order`] can only be built through validation, so storage code never
//! sees an order with an empty id or a zero total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace assigned to orders submitted without one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Maximum length of `order_id` and `namespace` (`VARCHAR(64)` columns).
pub const MAX_KEY_LEN: usize = 64;

/// Fractional digits kept by the `total` column (`DECIMAL(8,2)`).
pub const TOTAL_SCALE: u32 = 2;

/// Exclusive upper bound on `|total|` for a `DECIMAL(8,2)` column.
const TOTAL_LIMIT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Reasons a submitted order is rejected before reaching storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("order_id cannot be empty")]
    EmptyOrderId,

    #[error("total cannot be zero")]
    ZeroTotal,

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("total {0} has more than 2 fractional digits")]
    TotalPrecision(Decimal),

    #[error("total {0} is out of range")]
    TotalOutOfRange(Decimal),
}

/// A validated order. Identity is `(order_id, namespace)`.
///
/// Deserializing goes through [`OrderRequest::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderRequest")]
pub struct Order {
    order_id: String,
    namespace: String,
    #[serde(with = "rust_decimal::serde::float")]
    total: Decimal,
}

impl Order {
    /// Validates the fields and builds an order.
    ///
    /// An empty namespace becomes [`DEFAULT_NAMESPACE`].
    ///
    /// # Errors
    /// Returns a [`ValidationError`] describing the first failing field.
    pub fn new(
        order_id: impl Into<String>,
        namespace: impl Into<String>,
        total: Decimal,
    ) -> Result<Self, ValidationError> {
        let order_id = order_id.into();
        let mut namespace = namespace.into();

        if order_id.is_empty() {
            return Err(ValidationError::EmptyOrderId);
        }
        if total.is_zero() {
            return Err(ValidationError::ZeroTotal);
        }
        if namespace.is_empty() {
            namespace = DEFAULT_NAMESPACE.to_string();
        }
        if order_id.chars().count() > MAX_KEY_LEN {
            return Err(ValidationError::TooLong {
                field: "order_id",
                max: MAX_KEY_LEN,
            });
        }
        if namespace.chars().count() > MAX_KEY_LEN {
            return Err(ValidationError::TooLong {
                field: "namespace",
                max: MAX_KEY_LEN,
            });
        }
        if total.normalize().scale() > TOTAL_SCALE {
            return Err(ValidationError::TotalPrecision(total));
        }
        if total.abs() >= TOTAL_LIMIT {
            return Err(ValidationError::TotalOutOfRange(total));
        }

        Ok(Self {
            order_id,
            namespace,
            total,
        })
    }

    /// Rebuilds an order from a stored row without re-validating it.
    #[must_use]
    pub fn from_row(order_id: String, namespace: String, total: Decimal) -> Self {
        Self {
            order_id,
            namespace,
            total,
        }
    }

    #[must_use]
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }
}

impl TryFrom<OrderRequest> for Order {
    type Error = ValidationError;

    fn try_from(request: OrderRequest) -> Result<Self, Self::Error> {
        request.validate()
    }
}

/// Order payload as received over HTTP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total: Option<Decimal>,
}

impl OrderRequest {
    /// Turns the payload into a validated [`Order`].
    ///
    /// # Errors
    /// A missing total is reported as [`ValidationError::ZeroTotal`].
    pub fn validate(self) -> Result<Order, ValidationError> {
        Order::new(
            self.order_id,
            self.namespace.unwrap_or_default(),
            self.total.unwrap_or(Decimal::ZERO),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_order() {
        let order = Order::new("66", "shop", dec!(1234.5)).unwrap();
        assert_eq!(order.order_id, "66");
        assert_eq!(order.namespace, "shop");
        assert_eq!(order.total, dec!(1234.5));
    }

    #[test]
    fn test_empty_namespace_defaults() {
        let order = Order::new("66", "", dec!(10)).unwrap();
        assert_eq!(order.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_empty_order_id_rejected() {
        assert_eq!(
            Order::new("", "shop", dec!(10)),
            Err(ValidationError::EmptyOrderId)
        );
    }

    #[test]
    fn test_zero_total_rejected() {
        assert_eq!(
            Order::new("66", "shop", dec!(0.00)),
            Err(ValidationError::ZeroTotal)
        );
    }

    #[test]
    fn test_negative_total_allowed() {
        let order = Order::new("refund-1", "", dec!(-25.10)).unwrap();
        assert_eq!(order.total, dec!(-25.10));
    }

    #[test]
    fn test_long_keys_rejected() {
        let long = "x".repeat(MAX_KEY_LEN + 1);
        assert_eq!(
            Order::new(long.clone(), "", dec!(1)),
            Err(ValidationError::TooLong {
                field: "order_id",
                max: MAX_KEY_LEN
            })
        );
        assert_eq!(
            Order::new("1", long, dec!(1)),
            Err(ValidationError::TooLong {
                field: "namespace",
                max: MAX_KEY_LEN
            })
        );
        assert!(Order::new("x".repeat(MAX_KEY_LEN), "", dec!(1)).is_ok());
    }

    #[test]
    fn test_total_precision() {
        assert!(Order::new("1", "", dec!(1.25)).is_ok());
        // Trailing zeros do not count.
        assert!(Order::new("1", "", dec!(1.2500)).is_ok());
        assert_eq!(
            Order::new("1", "", dec!(1.255)),
            Err(ValidationError::TotalPrecision(dec!(1.255)))
        );
    }

    #[test]
    fn test_total_range() {
        assert!(Order::new("1", "", dec!(999999.99)).is_ok());
        assert_eq!(
            Order::new("1", "", dec!(1000000)),
            Err(ValidationError::TotalOutOfRange(dec!(1000000)))
        );
        assert!(Order::new("1", "", dec!(-1000000)).is_err());
    }

    #[test]
    fn test_request_json_without_namespace() {
        let req: OrderRequest =
            serde_json::from_str(r#"{"order_id": "66", "total": 1234.5}"#).unwrap();
        let order = req.validate().unwrap();
        assert_eq!(order.namespace, DEFAULT_NAMESPACE);
        assert_eq!(order.total, dec!(1234.5));
    }

    #[test]
    fn test_request_json_missing_fields() {
        let req: OrderRequest = serde_json::from_str(r#"{"namespace": "shop"}"#).unwrap();
        assert_eq!(req.validate(), Err(ValidationError::EmptyOrderId));

        let req: OrderRequest = serde_json::from_str(r#"{"order_id": "1"}"#).unwrap();
        assert_eq!(req.validate(), Err(ValidationError::ZeroTotal));
    }

    #[test]
    fn test_order_deserialization_validates() {
        let err = serde_json::from_str::<Order>(r#"{"order_id":"","namespace":"","total":0}"#);
        assert!(err.is_err());

        let order: Order =
            serde_json::from_str(r#"{"order_id":"66","namespace":"","total":12.5}"#).unwrap();
        assert_eq!(order, Order::new("66", "default", dec!(12.5)).unwrap());
    }

    #[test]
    fn test_order_serializes_total_as_number() {
        let order = Order::new("66", "shop", dec!(12.5)).unwrap();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["order_id"], "66");
        assert_eq!(json["namespace"], "shop");
        assert_eq!(json["total"].as_f64(), Some(12.5));
    }
}
