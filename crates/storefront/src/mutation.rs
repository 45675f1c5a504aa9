//! Cart writes.
//!
//! The gateway is the only authority on cart contents: a mutation never
//! edits a cached view. It waits for the gateway to acknowledge the write,
//! then invalidates the views that depend on the cart so the next read
//! fetches the acknowledged state.

use spice_market_core::ProductId;
use tracing::{info, instrument, warn};

use crate::cache::{EntityCache, QueryKey};
use crate::gateway::{Gateway, GatewayError};

/// Views derived from the raw cart.
pub const CART_VIEWS: [QueryKey; 2] = [QueryKey::Cart, QueryKey::CartWithProducts];

/// Executes cart mutations and invalidates dependent views.
///
/// Mutations are not serialized against each other; concurrent writes to
/// the same product resolve in whatever order the gateway acknowledges them.
pub struct MutationCoordinator<'a, G> {
    gateway: &'a G,
    cache: &'a EntityCache,
}

impl<'a, G: Gateway> MutationCoordinator<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G, cache: &'a EntityCache) -> Self {
        Self { gateway, cache }
    }

    /// Set the cart quantity for `id`. A quantity of 0 removes the line.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged. The cache is left untouched.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn set_quantity(&self, id: ProductId, quantity: u64) -> Result<(), GatewayError> {
        if let Err(err) = self.gateway.set_cart_quantity(id, quantity).await {
            warn!(error = %err, "Cart update rejected");
            return Err(err);
        }

        for key in CART_VIEWS {
            self.cache.invalidate(key);
        }
        info!(quantity, "Cart updated");
        Ok(())
    }
}
