use std::{collections::HashMap, time::Instant};

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error, ResponseError,
};
use log::warn;
use tokio::sync::Mutex;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket per client key. A full bucket holds `capacity` requests and
/// refills completely over one window.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new(capacity: u32, window_secs: u64) -> Self {
        let capacity = f64::from(capacity);
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_per_sec: capacity / window_secs.max(1) as f64,
        }
    }

    pub async fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now()).await
    }

    async fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Middleware for the `/api` scope, keyed by the proxy-aware client address.
pub async fn limit_by_ip<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    if let Some(state) = req.app_data::<web::Data<AppState>>().cloned() {
        if !state.limiter.allow(&ip).await {
            warn!("[API] Rate limit hit for {ip}");
            let response = AppError::TooManyRequests.error_response();
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_bucket_empties_and_refills() {
        let limiter = RateLimiter::new(2, 10);
        let start = Instant::now();

        assert!(limiter.allow_at("1.2.3.4", start).await);
        assert!(limiter.allow_at("1.2.3.4", start).await);
        assert!(!limiter.allow_at("1.2.3.4", start).await);

        // Other clients have their own bucket.
        assert!(limiter.allow_at("5.6.7.8", start).await);

        // 0.2 tokens per second, so one token after six seconds.
        assert!(limiter.allow_at("1.2.3.4", start + Duration::from_secs(6)).await);
        assert!(!limiter.allow_at("1.2.3.4", start + Duration::from_secs(6)).await);
    }
}
