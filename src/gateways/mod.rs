use std::sync::Arc;

pub mod mock;
pub mod razorpay;

/// Outcome of asking the external gateway whether funds cleared for a
/// buyer-supplied transaction reference. `Pending` means the gateway has not
/// settled yet and a later re-check (or callback) is expected.
#[derive(Debug, Clone)]
pub enum VerificationStatus {
    Verified { amount_minor: Option<i64> },
    Rejected { reason: Option<String> },
    Pending,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Thin seam over the external payment verifier. The gateway is slow and
/// untrusted; every answer is re-verifiable.
#[async_trait::async_trait]
pub trait PaymentVerifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check_transaction(&self, reference: &str)
        -> Result<VerificationStatus, GatewayError>;
}

/// Adapter selection mirrors deployment config: `VERIFIER_ADAPTER=RAZORPAY`
/// talks to the real gateway, anything else runs the mock.
pub fn verifier_from_env() -> Arc<dyn PaymentVerifier> {
    let adapter = std::env::var("VERIFIER_ADAPTER").unwrap_or_else(|_| "MOCK".to_string());
    if adapter == "RAZORPAY" {
        Arc::new(razorpay::RazorpayVerifier {
            base_url: std::env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            key_id: std::env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            key_secret: std::env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            timeout_ms: std::env::var("GATEWAY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(2500),
            client: reqwest::Client::new(),
        })
    } else {
        Arc::new(mock::MockVerifier {
            behavior: std::env::var("MOCK_VERIFIER_BEHAVIOR")
                .unwrap_or_else(|_| "ALWAYS_VERIFIED".to_string()),
        })
    }
}
