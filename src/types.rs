use std::env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price_half_quantity: f64,
}

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    pub price_half_quantity: f64,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

/// One line item of the order JSON the assistant emits when a purchase is
/// confirmed. Quantity is any JSON number: the half-unit pricing convention
/// makes fractional quantities (e.g. 1.5 units) legitimate.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    pub product: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// The terminal order payload: `products`, `total_price` and `address` must
/// all be present for a reply to count as an order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPayload {
    pub products: Vec<OrderItem>,
    pub total_price: f64,
    pub address: String,
}

/// Outcome of classifying an assistant reply: plain conversation or a
/// completed order ready for payment.
#[derive(Debug)]
pub enum AssistantReply {
    Text(String),
    Order(OrderPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentItem {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_item_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentLink {
    pub preference_id: String,
    pub payment_link: String,
    pub payment_link_mobile: Option<String>,
    pub total: f64,
}

#[derive(Debug, Deserialize)]
pub struct PaymentLinkRequest {
    pub title: String,
    pub amount: f64,
    pub description: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub external_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderPaymentRequest {
    pub order_id: i64,
    pub items: Vec<PaymentItem>,
    pub customer_name: Option<String>,
}

/// Twilio posts inbound WhatsApp messages as form fields with these names.
#[derive(Debug, Deserialize)]
pub struct WhatsappInbound {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

fn default_item_quantity() -> f64 {
    1.0
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub business_name: String,
    pub business_kind: String,
    pub store_address: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub mp_access_token: String,
    pub mp_cbu: String,
}

impl Config {
    /// Resolves the full configuration from the environment. Missing required
    /// credentials are fatal: the caller aborts startup with the returned
    /// message.
    pub fn from_env() -> Result<Config, String> {
        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let twilio_account_sid = env::var("TWILIO_ACCOUNT_SID").unwrap_or_default();
        let twilio_auth_token = env::var("TWILIO_AUTH_TOKEN").unwrap_or_default();
        let twilio_from_number = env::var("TWILIO_FROM_NUMBER").unwrap_or_default();
        let mp_access_token = env::var("MP_ACCESS_TOKEN").unwrap_or_default();
        let mp_cbu = env::var("CBU").unwrap_or_default();

        let missing = [
            ("OPENAI_API_KEY", &openai_api_key),
            ("TWILIO_ACCOUNT_SID", &twilio_account_sid),
            ("TWILIO_AUTH_TOKEN", &twilio_auth_token),
            ("TWILIO_FROM_NUMBER", &twilio_from_number),
            ("MP_ACCESS_TOKEN", &mp_access_token),
            ("CBU", &mp_cbu),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            ));
        }

        Ok(Config {
            openai_api_key,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Our Store".to_string()),
            business_kind: env::var("BUSINESS_KIND").unwrap_or_else(|_| "business".to_string()),
            store_address: env::var("ADDRESS")
                .unwrap_or_else(|_| "Av. Siempre Viva 742, Springfield".to_string()),
            twilio_account_sid,
            twilio_auth_token,
            twilio_from_number,
            mp_access_token,
            mp_cbu,
        })
    }
}
