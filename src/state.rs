use std::sync::Arc;

use log::info;

use crate::{
    auth::TokenService,
    config::Config,
    db::Database,
    error::AppError,
    payments::{PaymentGateway, StripeGateway},
    rate_limit::RateLimiter,
};

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub tokens: TokenService,
    /// `None` until a Stripe secret key is configured.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub limiter: RateLimiter,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let db = Database::new(&config.db_path)?;
        db.create_schema().await?;

        let gateway = config.stripe_secret_key.as_ref().map(|key| {
            info!("[STRIPE] Checkout enabled against {}", config.stripe_api_base);
            Arc::new(StripeGateway::new(key.clone(), config.stripe_api_base.clone()))
                as Arc<dyn PaymentGateway>
        });

        Ok(Self {
            tokens: TokenService::new(&config.jwt_secret, config.jwt_expires_in_days),
            limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window_secs),
            db,
            gateway,
            config,
        })
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn gateway(&self) -> Result<&dyn PaymentGateway, AppError> {
        self.gateway
            .as_deref()
            .ok_or_else(|| AppError::Internal("Stripe is not configured".into()))
    }
}
