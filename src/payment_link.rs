use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::domain::errors::DomainError;
use crate::domain::payment::to_minor_units;

/// Builds hosted checkout URLs: the provider expects its parameters as a
/// base64 blob appended to the checkout path.
#[derive(Debug, Clone)]
pub struct PaymentLinkBuilder {
    merchant_id: String,
    checkout_url: String,
    return_url: String,
}

impl PaymentLinkBuilder {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            merchant_id: config.merchant_id.clone(),
            checkout_url: config.checkout_url.trim_end_matches('/').to_string(),
            return_url: config.return_url.clone(),
        }
    }

    pub fn link(
        &self,
        order_id: Uuid,
        user_id: &str,
        total_price: &BigDecimal,
    ) -> Result<String, DomainError> {
        let amount = to_minor_units(total_price)?;
        let params = format!(
            "m={};ac.order_id={};a={};c={}",
            self.merchant_id,
            order_id,
            amount,
            self.return_url.replace("{user_id}", user_id)
        );
        Ok(format!("{}/{}", self.checkout_url, STANDARD.encode(params)))
    }
}
