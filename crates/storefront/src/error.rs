//! Unified error handling with Sentry integration.
//!
//! Client operations return `Result<T, AppError>`. Presentation layers show
//! [`AppError::user_message`] and keep the `Display` form for logs.

use spice_market_core::{EmailError, ProductId};
use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::handoff::HandoffError;
use crate::seed::SeedError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// A read against the gateway failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A cart mutation was rejected; the cart view is unchanged.
    #[error("Cart update failed: {0}")]
    CartUpdate(#[source] GatewayError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Seed catalog error: {0}")]
    Seed(#[from] SeedError),

    #[error("Handoff error: {0}")]
    Handoff(#[from] HandoffError),

    /// Checkout was attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Required contact fields were left blank.
    #[error("Missing contact fields: {}", .0.join(", "))]
    IncompleteContact(Vec<&'static str>),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Product key does not resolve.
    #[error("Not found: product {0}")]
    NotFound(ProductId),
}

impl AppError {
    /// Short message safe to show to a purchaser.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway(err) if err.is_unavailable() => "Connecting to the store...".to_string(),
            Self::Gateway(GatewayError::RateLimited(secs)) => {
                format!("The store is busy, please try again in {secs} seconds")
            }
            Self::Gateway(_) => "Failed to load data from the store".to_string(),
            Self::CartUpdate(_) => "Failed to update cart".to_string(),
            Self::Config(_) | Self::Seed(_) => "The store is not configured correctly".to_string(),
            Self::Handoff(_) => "An order is already awaiting confirmation".to_string(),
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::IncompleteContact(_) => "Please fill in all required fields".to_string(),
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::NotFound(_) => "Product not found".to_string(),
        }
    }

    /// Whether the error is worth reporting to Sentry.
    ///
    /// An unreachable gateway and purchaser mistakes are expected.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Gateway(err) | Self::CartUpdate(err) => !err.is_unavailable(),
            Self::Config(_) | Self::Seed(_) => true,
            Self::Handoff(_)
            | Self::EmptyCart
            | Self::IncompleteContact(_)
            | Self::InvalidEmail(_)
            | Self::NotFound(_) => false,
        }
    }

    /// Log the error and send it to Sentry if reportable.
    pub fn capture(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "Storefront error not reported");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Set quantity", Some(&[("product_id", "3"), ("quantity", "2")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound(ProductId::new(12));
        assert_eq!(err.to_string(), "Not found: product 12");

        let err = AppError::CartUpdate(GatewayError::Remote("rejected".to_string()));
        assert_eq!(err.to_string(), "Cart update failed: Remote call failed: rejected");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AppError::CartUpdate(GatewayError::Remote("x".to_string())).user_message(),
            "Failed to update cart"
        );
        assert_eq!(
            AppError::Gateway(GatewayError::Unavailable("x".to_string())).user_message(),
            "Connecting to the store..."
        );
        assert_eq!(
            AppError::Gateway(GatewayError::RateLimited(30)).user_message(),
            "The store is busy, please try again in 30 seconds"
        );
        assert_eq!(AppError::EmptyCart.user_message(), "Your cart is empty");
    }

    #[test]
    fn test_reportable() {
        assert!(AppError::Gateway(GatewayError::Remote("x".to_string())).is_reportable());
        assert!(!AppError::Gateway(GatewayError::Unavailable("x".to_string())).is_reportable());
        assert!(!AppError::EmptyCart.is_reportable());
    }

    #[test]
    fn test_capture_without_client_is_noop() {
        AppError::Gateway(GatewayError::Remote("x".to_string())).capture();
        add_breadcrumb("cart", "Set quantity", Some(&[("product_id", "1")]));
    }
}
