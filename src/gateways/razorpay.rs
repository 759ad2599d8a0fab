use crate::gateways::{GatewayError, PaymentVerifier, VerificationStatus};

pub struct RazorpayVerifier {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl PaymentVerifier for RazorpayVerifier {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    async fn check_transaction(
        &self,
        reference: &str,
    ) -> Result<VerificationStatus, GatewayError> {
        let url = format!("{}/v1/payments/{}", self.base_url, reference);
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(GatewayError::Unavailable("gateway timeout".to_string()));
            }
            Err(e) => return Err(GatewayError::Unavailable(e.to_string())),
        };

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(VerificationStatus::Rejected {
                reason: Some("unknown transaction reference".to_string()),
            });
        }
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!("HTTP_{}", status.as_u16())));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(VerificationStatus::Rejected {
                reason: Some(body.chars().take(200).collect()),
            });
        }

        let v: serde_json::Value = resp.json().await.unwrap_or_default();
        let gateway_state = v.get("status").and_then(|s| s.as_str()).unwrap_or("");
        let outcome = match gateway_state {
            "captured" => VerificationStatus::Verified {
                amount_minor: v.get("amount").and_then(serde_json::Value::as_i64),
            },
            "failed" => VerificationStatus::Rejected {
                reason: v
                    .get("error_description")
                    .and_then(|d| d.as_str())
                    .map(ToString::to_string),
            },
            // created / authorized: funds not settled yet, re-check later
            _ => VerificationStatus::Pending,
        };

        Ok(outcome)
    }
}
