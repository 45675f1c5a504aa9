//! In-process gateway.
//!
//! Behaves like the remote service (sequential ids, duplicate cart entries,
//! 0-quantity deletes) and adds knobs the real service does not have:
//! per-call latency, an offline switch, one-shot failure injection and call
//! counters. The CLI demo and the test suites run against it.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use spice_market_core::{CartEntry, NewProduct, Product, ProductId};
use tracing::debug;

use super::{Gateway, GatewayError};

/// A gateway operation, used to target fault injection and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListProducts,
    GetProduct,
    CreateProduct,
    GetCart,
    SetCartQuantity,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListProducts => "list_products",
            Self::GetProduct => "get_product",
            Self::CreateProduct => "create_product",
            Self::GetCart => "get_cart",
            Self::SetCartQuantity => "set_cart_quantity",
        };
        f.write_str(name)
    }
}

/// Number of calls received per operation.
///
/// Counted when the call arrives, before latency or failures apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_products: usize,
    pub get_product: usize,
    pub create_product: usize,
    pub get_cart: usize,
    pub set_cart_quantity: usize,
}

impl CallCounts {
    fn record(&mut self, op: Operation) {
        let counter = match op {
            Operation::ListProducts => &mut self.list_products,
            Operation::GetProduct => &mut self.get_product,
            Operation::CreateProduct => &mut self.create_product,
            Operation::GetCart => &mut self.get_cart,
            Operation::SetCartQuantity => &mut self.set_cart_quantity,
        };
        *counter += 1;
    }
}

#[derive(Default)]
struct MemoryState {
    products: Vec<Product>,
    cart: Vec<CartEntry>,
    last_id: u64,
    offline: bool,
    fail_next: HashSet<Operation>,
    calls: CallCounts,
}

/// Gateway backed by process memory. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<Mutex<MemoryState>>,
    latency: Option<Duration>,
}

impl InMemoryGateway {
    /// An empty catalog and an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the catalog, assigning ids from 1.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = NewProduct>) -> Self {
        let gateway = Self::new();
        {
            let mut state = gateway.lock();
            for product in products {
                insert_product(&mut state, product);
            }
        }
        gateway
    }

    /// Delay every call by `latency` before it takes effect.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// While offline, every call fails with [`GatewayError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make the next call to `op` fail with [`GatewayError::Remote`].
    pub fn fail_next(&self, op: Operation) {
        self.lock().fail_next.insert(op);
    }

    /// Append a raw cart entry, bypassing the one-entry-per-product collapse
    /// of `set_cart_quantity`.
    pub fn push_raw_cart_entry(&self, entry: CartEntry) {
        self.lock().cart.push(entry);
    }

    /// Delete a product from the catalog. Cart entries referencing it stay.
    pub fn remove_product(&self, id: ProductId) {
        self.lock().products.retain(|product| product.id != id);
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Current catalog, without counting a call.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    /// Current raw cart, without counting a call.
    #[must_use]
    pub fn cart_entries(&self) -> Vec<CartEntry> {
        self.lock().cart.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call<T>(
        &self,
        op: Operation,
        apply: impl FnOnce(&mut MemoryState) -> T,
    ) -> Result<T, GatewayError> {
        self.lock().calls.record(op);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if state.offline {
            return Err(GatewayError::Unavailable(
                "in-memory gateway is offline".to_string(),
            ));
        }
        if state.fail_next.remove(&op) {
            debug!(%op, "Injected gateway failure");
            return Err(GatewayError::Remote(format!("injected failure for {op}")));
        }
        Ok(apply(&mut state))
    }
}

fn insert_product(state: &mut MemoryState, product: NewProduct) -> ProductId {
    state.last_id += 1;
    let id = ProductId::new(state.last_id);
    state.products.push(product.into_product(id));
    id
}

impl Gateway for InMemoryGateway {
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        self.call(Operation::ListProducts, |state| state.products.clone())
            .await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, GatewayError> {
        self.call(Operation::GetProduct, |state| {
            state.products.iter().find(|product| product.id == id).cloned()
        })
        .await
    }

    async fn create_product(&self, product: NewProduct) -> Result<ProductId, GatewayError> {
        self.call(Operation::CreateProduct, |state| {
            insert_product(state, product)
        })
        .await
    }

    async fn get_cart(&self) -> Result<Vec<CartEntry>, GatewayError> {
        self.call(Operation::GetCart, |state| state.cart.clone()).await
    }

    async fn set_cart_quantity(&self, id: ProductId, quantity: u64) -> Result<(), GatewayError> {
        self.call(Operation::SetCartQuantity, |state| {
            // Collapse every entry for the product into the first one.
            let mut kept = false;
            state.cart.retain_mut(|entry| {
                if entry.product_id != id {
                    return true;
                }
                if kept || quantity == 0 {
                    return false;
                }
                entry.quantity = quantity;
                kept = true;
                true
            });
            if !kept && quantity > 0 {
                state.cart.push(CartEntry::new(id, quantity));
            }
        })
        .await
    }
}
