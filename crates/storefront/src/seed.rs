//! One-shot catalog bootstrap.
//!
//! When a session first sees a confirmed-empty catalog it creates the seed
//! records, one `create_product` call at a time. The guard moves
//! `Unattempted -> Seeding -> Done` and never goes back; a catalog that is
//! emptied later in the session is not re-seeded.
//!
//! A failed create stops the batch. The records created so far stay in the
//! catalog and the guard still ends in `Done`, so a flaky gateway cannot
//! trigger repeated seeding.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use spice_market_core::{NewProduct, Price, Product, ProductId, SeedState};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cache::CachedView;
use crate::gateway::{Gateway, GatewayError};

/// Errors loading a seed catalog.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse seed catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid seed record {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

#[derive(Deserialize)]
struct CatalogFile {
    products: Vec<NewProduct>,
}

/// Ordered records created by the seed guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCatalog {
    records: Vec<NewProduct>,
}

impl SeedCatalog {
    /// The built-in spice catalog.
    #[must_use]
    pub fn spices() -> Self {
        let spice = |name: &str, description: &str, cents: u64, image: &str| NewProduct {
            name: name.to_string(),
            description: description.to_string(),
            price: Price::from_cents(cents),
            image_url: format!("{image}.dim_800x800.png"),
            available: true,
        };

        Self {
            records: vec![
                spice(
                    "Turmeric Powder",
                    "Premium quality turmeric powder with vibrant color and earthy flavor. \
                     Perfect for curries, golden milk, and anti-inflammatory dishes.",
                    899,
                    "turmeric-powder",
                ),
                spice(
                    "Red Chili Powder",
                    "Fiery red chili powder made from sun-dried chilies. \
                     Adds heat and rich color to your favorite dishes.",
                    749,
                    "chili-powder",
                ),
                spice(
                    "Cumin Seeds",
                    "Aromatic cumin seeds with a warm, earthy flavor. \
                     Essential for tempering and spice blends.",
                    649,
                    "cumin-seeds",
                ),
                spice(
                    "Coriander Seeds",
                    "Fresh coriander seeds with a citrusy, slightly sweet flavor. \
                     Perfect for grinding fresh or using whole.",
                    599,
                    "coriander-seeds",
                ),
                spice(
                    "Garam Masala",
                    "Our signature blend of warming spices including cardamom, cinnamon, \
                     cloves, and more. The heart of Indian cuisine.",
                    999,
                    "garam-masala",
                ),
                spice(
                    "Black Pepper",
                    "Premium whole black peppercorns with bold, pungent flavor. \
                     Freshly grind for maximum aroma and taste.",
                    1099,
                    "black-pepper",
                ),
            ],
        }
    }

    /// Build a catalog from records, validating each.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::Invalid`] for a blank name or a zero price.
    pub fn new(records: Vec<NewProduct>) -> Result<Self, SeedError> {
        for (index, record) in records.iter().enumerate() {
            if record.name.trim().is_empty() {
                return Err(SeedError::Invalid {
                    index,
                    reason: "name is empty".to_string(),
                });
            }
            if record.price == Price::ZERO {
                return Err(SeedError::Invalid {
                    index,
                    reason: format!("{} has no price", record.name),
                });
            }
        }
        Ok(Self { records })
    }

    /// Parse a YAML catalog with a top-level `products` list.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a record is invalid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SeedError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.products)
    }

    /// Read and parse a YAML catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml_str(&yaml)
    }

    #[must_use]
    pub fn records(&self) -> &[NewProduct] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for SeedCatalog {
    fn default() -> Self {
        Self::spices()
    }
}

/// A create call that failed and ended the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFailure {
    pub name: String,
    pub error: GatewayError,
}

/// What a seeding run did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeedReport {
    /// Ids of created products, in record order.
    pub created: Vec<ProductId>,
    pub failed: Option<SeedFailure>,
    /// Records not attempted because an earlier one failed.
    pub skipped: usize,
}

impl SeedReport {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// Result of asking the guard to seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The catalog view is loading, failed, or stale; nothing was decided.
    CatalogNotReady,
    /// The catalog already has products.
    NotNeeded,
    /// Seeding already ran or is running in this session.
    AlreadyAttempted,
    Seeded(SeedReport),
}

/// Session-scoped seeding guard.
pub struct SeedGuard {
    state: Mutex<SeedState>,
    catalog: SeedCatalog,
}

impl SeedGuard {
    #[must_use]
    pub const fn new(catalog: SeedCatalog) -> Self {
        Self {
            state: Mutex::new(SeedState::Unattempted),
            catalog,
        }
    }

    #[must_use]
    pub fn state(&self) -> SeedState {
        *self.lock()
    }

    #[must_use]
    pub const fn catalog(&self) -> &SeedCatalog {
        &self.catalog
    }

    /// Seed the catalog if `products` confirms it is empty and no attempt
    /// has been made this session.
    ///
    /// Only a fresh, successfully loaded, empty view counts as confirmation.
    #[instrument(skip_all, fields(state = ?self.state()))]
    pub async fn run<G: Gateway>(
        &self,
        gateway: &G,
        products: &CachedView<Vec<Product>>,
    ) -> SeedOutcome {
        let confirmed = products.error.is_none() && !products.stale;
        match &products.value {
            Some(existing) if confirmed => {
                if !existing.is_empty() {
                    return SeedOutcome::NotNeeded;
                }
            }
            _ => return SeedOutcome::CatalogNotReady,
        }

        if !self.begin() {
            debug!("Seeding already attempted this session");
            return SeedOutcome::AlreadyAttempted;
        }
        let _done = MarkDone(&self.state);

        info!(records = self.catalog.len(), "Seeding empty catalog");
        let report = self.create_all(gateway).await;
        if let Some(failure) = &report.failed {
            warn!(
                product = %failure.name,
                error = %failure.error,
                created = report.created.len(),
                skipped = report.skipped,
                "Seeding stopped early"
            );
        } else {
            info!(created = report.created.len(), "Catalog seeded");
        }
        SeedOutcome::Seeded(report)
    }

    async fn create_all<G: Gateway>(&self, gateway: &G) -> SeedReport {
        let records = self.catalog.records();
        let mut report = SeedReport::default();

        for (index, record) in records.iter().enumerate() {
            match gateway.create_product(record.clone()).await {
                Ok(id) => {
                    debug!(product = %record.name, %id, "Seed product created");
                    report.created.push(id);
                }
                Err(error) => {
                    report.failed = Some(SeedFailure {
                        name: record.name.clone(),
                        error,
                    });
                    report.skipped = records.len() - index - 1;
                    break;
                }
            }
        }
        report
    }

    /// `Unattempted -> Seeding`, decided before the first suspension point.
    fn begin(&self) -> bool {
        let mut state = self.lock();
        if state.is_attempted() {
            return false;
        }
        *state = SeedState::Seeding;
        true
    }

    fn lock(&self) -> MutexGuard<'_, SeedState> {
        lock_state(&self.state)
    }
}

impl Default for SeedGuard {
    fn default() -> Self {
        Self::new(SeedCatalog::default())
    }
}

fn lock_state(state: &Mutex<SeedState>) -> MutexGuard<'_, SeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Moves the guard to `Done` however the run ends, including cancellation.
struct MarkDone<'a>(&'a Mutex<SeedState>);

impl Drop for MarkDone<'_> {
    fn drop(&mut self) {
        *lock_state(self.0) = SeedState::Done;
    }
}
