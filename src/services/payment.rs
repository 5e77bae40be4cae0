//! Payment gateway adapter.
//!
//! The gateway is opaque: initialization yields a redirect link for the shopper,
//! verification yields a pass/fail status for a transaction reference.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::PaymentConfig;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub tx_ref: String,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub redirect_url: String,
    #[serde(default = "default_payment_type")]
    pub payment_type: String,
    pub customer: Customer,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "phonenumber")]
    pub phone_number: Option<String>,
}

fn default_currency() -> String { "NGN".to_string() }
fn default_payment_type() -> String { "card".to_string() }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PaymentStatus { Successful, Failed }

impl PaymentStatus {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Successful => "Transaction successful",
            Self::Failed => "Transaction failed",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the link the shopper is redirected to.
    async fn initialize(&self, request: &PaymentRequest) -> Result<String>;
    async fn verify(&self, tx_ref: &str) -> Result<PaymentStatus>;
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<GatewayData>,
}

#[derive(Debug, Deserialize)]
struct GatewayData {
    #[serde(default)]
    link: Option<String>,
}

/// Flutterwave v3 REST client.
pub struct FlutterwaveGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl FlutterwaveGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| EcommerceError::Gateway(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String { format!("{}/{}", self.base_url, path) }

    async fn read(response: reqwest::Response) -> Result<GatewayResponse> {
        let response = response.error_for_status().map_err(|e| EcommerceError::Gateway(e.to_string()))?;
        response.json::<GatewayResponse>().await.map_err(|e| EcommerceError::Gateway(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    async fn initialize(&self, request: &PaymentRequest) -> Result<String> {
        let response = self.client.post(self.url("payments"))
            .bearer_auth(&self.secret_key)
            .json(request)
            .send().await
            .map_err(|e| EcommerceError::Gateway(e.to_string()))?;
        link_from(Self::read(response).await?)
    }

    async fn verify(&self, tx_ref: &str) -> Result<PaymentStatus> {
        let response = self.client.get(self.url("transactions/verify_by_reference"))
            .bearer_auth(&self.secret_key)
            .query(&[("tx_ref", tx_ref)])
            .send().await
            .map_err(|e| EcommerceError::Gateway(e.to_string()))?;
        Ok(status_from(&Self::read(response).await?))
    }
}

fn link_from(body: GatewayResponse) -> Result<String> {
    body.data.and_then(|d| d.link).ok_or_else(|| {
        EcommerceError::Gateway(body.message.unwrap_or_else(|| format!("no payment link (status '{}')", body.status)))
    })
}

fn status_from(body: &GatewayResponse) -> PaymentStatus {
    if body.status == "success" { PaymentStatus::Successful } else { PaymentStatus::Failed }
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self { Self { gateway } }

    pub async fn process_payment(&self, request: &PaymentRequest) -> Result<String> {
        info!(tx_ref = %request.tx_ref, amount = %request.amount, "Processing payment");
        if request.amount <= Decimal::ZERO {
            return Err(EcommerceError::invalid("payment amount must be greater than zero"));
        }
        let link = self.gateway.initialize(request).await.inspect_err(|e| {
            error!(tx_ref = %request.tx_ref, error = %e, "Payment initialization failed");
        })?;
        info!(tx_ref = %request.tx_ref, "Payment initialization successful");
        Ok(link)
    }

    pub async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentStatus> {
        info!(tx_ref, "Verifying payment");
        let status = self.gateway.verify(tx_ref).await.inspect_err(|e| {
            error!(tx_ref, error = %e, "Payment verification failed");
        })?;
        info!(tx_ref, result = status.message(), "Payment verification result");
        Ok(status)
    }
}
