use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use futures::future::BoxFuture;
use natours::{
    error::AppError,
    payments::{CheckoutRequest, CheckoutSession, PaymentGateway},
};

/// Hands out predictable session ids and remembers what it was asked for.
#[derive(Default)]
pub struct FakeGateway {
    opened: AtomicUsize,
    pub requests: Mutex<Vec<CheckoutRequest>>,
}

impl PaymentGateway for FakeGateway {
    fn create_checkout_session<'a>(
        &'a self,
        request: &'a CheckoutRequest,
    ) -> BoxFuture<'a, Result<CheckoutSession, AppError>> {
        Box::pin(async move {
            let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
            self.requests.lock().unwrap().push(request.clone());
            Ok(CheckoutSession {
                id: format!("cs_test_fake_{n}"),
                url: Some(format!("https://checkout.test/pay/cs_test_fake_{n}")),
            })
        })
    }
}
