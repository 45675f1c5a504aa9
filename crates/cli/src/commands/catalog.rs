//! Catalog commands.

use spice_market_core::{Product, ProductId, ViewStatus};
use spice_market_storefront::gateway::Gateway;
use spice_market_storefront::seed::SeedOutcome;
use spice_market_storefront::{AppError, StorefrontClient};
use tracing::{info, warn};

/// List the catalog, seeding it first if this session finds it empty.
pub async fn list<G: Gateway>(client: &StorefrontClient<G>) -> Result<(), AppError> {
    report_seed(&client.ensure_seeded().await);

    let products = client.all_products().await.into_loaded()?;
    info!(count = products.len(), "Catalog");
    for product in &products {
        log_product(product);
    }
    Ok(())
}

/// Show one product, or report it as unavailable.
pub async fn show<G: Gateway>(client: &StorefrontClient<G>, id: ProductId) -> Result<(), AppError> {
    let view = client.product(id).await;
    if view.status() == ViewStatus::Loading {
        warn!("Gateway not reachable yet");
    }

    match view.into_loaded()? {
        Some(product) => {
            log_product(&product);
            info!("  {}", product.description);
            Ok(())
        }
        None => Err(AppError::NotFound(id)),
    }
}

/// Run the seed guard explicitly.
pub async fn seed<G: Gateway>(client: &StorefrontClient<G>) -> Result<(), AppError> {
    let outcome = client.ensure_seeded().await;
    report_seed(&outcome);
    if let SeedOutcome::Seeded(report) = outcome
        && let Some(failure) = report.failed
    {
        return Err(AppError::Gateway(failure.error));
    }
    Ok(())
}

pub fn report_seed(outcome: &SeedOutcome) {
    match outcome {
        SeedOutcome::Seeded(report) if report.is_complete() => {
            info!(created = report.created.len(), "Seeded empty catalog");
        }
        SeedOutcome::Seeded(report) => {
            warn!(
                created = report.created.len(),
                skipped = report.skipped,
                "Catalog only partially seeded"
            );
        }
        SeedOutcome::NotNeeded => info!("Catalog already has products"),
        SeedOutcome::AlreadyAttempted => info!("Seeding already ran this session"),
        SeedOutcome::CatalogNotReady => warn!("Catalog not loaded; seeding skipped"),
    }
}

fn log_product(product: &Product) {
    let availability = if product.available { "" } else { " (sold out)" };
    info!(
        "#{:<3} {:<20} {:>8}{}",
        product.id.to_string(),
        product.name,
        product.price.to_string(),
        availability
    );
}
