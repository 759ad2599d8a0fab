use crate::gateways::{GatewayError, PaymentVerifier, VerificationStatus};

pub struct MockVerifier {
    pub behavior: String,
}

#[async_trait::async_trait]
impl PaymentVerifier for MockVerifier {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn check_transaction(
        &self,
        reference: &str,
    ) -> Result<VerificationStatus, GatewayError> {
        let status = match self.behavior.as_str() {
            "ALWAYS_REJECTED" => VerificationStatus::Rejected {
                reason: Some("mock decline".to_string()),
            },
            "ALWAYS_PENDING" => VerificationStatus::Pending,
            "ALWAYS_UNAVAILABLE" => {
                return Err(GatewayError::Unavailable("mock outage".to_string()));
            }
            // Default keys off the reference so one deployment can exercise
            // every path: "utr-reject-*" declines, "utr-pending-*" stays
            // unsettled, anything else verifies.
            _ => {
                if reference.starts_with("utr-reject") {
                    VerificationStatus::Rejected {
                        reason: Some("mock decline".to_string()),
                    }
                } else if reference.starts_with("utr-pending") {
                    VerificationStatus::Pending
                } else {
                    VerificationStatus::Verified { amount_minor: None }
                }
            }
        };

        Ok(status)
    }
}
