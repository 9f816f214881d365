use std::sync::Arc;

use serde_json::{json, Value};

use crate::app::AppState;
use crate::types::{PaymentItem, PaymentLink};

const MP_PREFERENCES_URL: &str = "https://api.mercadopago.com/checkout/preferences";

/// Creates a single-item checkout preference and returns its link.
pub async fn create_payment_link(
    state: &Arc<AppState>,
    title: &str,
    amount: f64,
    description: Option<&str>,
    quantity: i64,
    external_reference: Option<&str>,
) -> Result<PaymentLink, String> {
    let mut preference = json!({
        "items": [
            {
                "title": title,
                "description": description.unwrap_or(title),
                "quantity": quantity,
                "unit_price": amount,
                "currency_id": "ARS"
            }
        ],
        "back_urls": {
            "success": "https://www.tu-sitio.com/success",
            "failure": "https://www.tu-sitio.com/failure",
            "pending": "https://www.tu-sitio.com/pending"
        },
        "auto_return": "approved",
        "payment_methods": {
            "excluded_payment_types": [],
            "installments": 1
        },
        "statement_descriptor": state.config.business_name,
    });
    if let Some(reference) = external_reference {
        preference["external_reference"] = json!(reference);
    }

    let total = amount * quantity as f64;
    create_preference(state, preference, total).await
}

/// Creates one preference covering the full item list of an order. The total
/// is the sum of price * quantity across items; no sanity validation is
/// applied before the provider call.
pub async fn create_order_payment_link(
    state: &Arc<AppState>,
    order_id: i64,
    items: &[PaymentItem],
    customer_name: Option<&str>,
) -> Result<PaymentLink, String> {
    println!(
        "creating payment preference for order {order_id} ({})",
        customer_name.unwrap_or("Cliente")
    );
    let preference = order_preference_payload(order_id, items, &state.config.business_name);
    let total = order_total(items);
    create_preference(state, preference, total).await
}

pub fn order_total(items: &[PaymentItem]) -> f64 {
    items.iter().map(|item| item.price * item.quantity).sum()
}

pub fn order_preference_payload(order_id: i64, items: &[PaymentItem], business_name: &str) -> Value {
    json!({
        "items": items
            .iter()
            .map(|item| json!({
                "title": item.name,
                "description": item.description.as_deref().unwrap_or(&item.name),
                "quantity": item.quantity,
                "unit_price": item.price,
                "currency_id": "ARS"
            }))
            .collect::<Vec<_>>(),
        "external_reference": format!("order_{order_id}"),
        "back_urls": {
            "success": format!("https://www.tu-sitio.com/order/{order_id}/success"),
            "failure": format!("https://www.tu-sitio.com/order/{order_id}/failure"),
            "pending": format!("https://www.tu-sitio.com/order/{order_id}/pending")
        },
        "auto_return": "approved",
        "payment_methods": {
            "excluded_payment_types": [],
            "installments": 1
        },
        "statement_descriptor": business_name,
    })
}

async fn create_preference(
    state: &Arc<AppState>,
    preference: Value,
    total: f64,
) -> Result<PaymentLink, String> {
    let response = state
        .http
        .post(MP_PREFERENCES_URL)
        .bearer_auth(&state.config.mp_access_token)
        .json(&preference)
        .send()
        .await
        .map_err(|err| format!("mercadopago request failed: {err}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("mercadopago returned {status}: {body}"));
    }

    let payload = response
        .json::<Value>()
        .await
        .map_err(|err| format!("mercadopago parse failed: {err}"))?;

    let payment_link = payload
        .get("init_point")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if payment_link.is_empty() {
        return Err("mercadopago response had no init_point".to_string());
    }

    Ok(PaymentLink {
        preference_id: payload
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        payment_link,
        payment_link_mobile: payload
            .get("sandbox_init_point")
            .and_then(Value::as_str)
            .map(str::to_string),
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, price: f64, quantity: f64) -> PaymentItem {
        PaymentItem {
            name: name.to_string(),
            price,
            quantity,
            description: None,
        }
    }

    #[test]
    fn order_total_sums_price_times_quantity() {
        let items = vec![
            item("Empanada", 200.0, 6.0),
            item("Coca Cola 1.5L", 800.0, 1.0),
        ];
        assert!((order_total(&items) - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn order_total_accepts_fractional_quantities() {
        let items = vec![item("Empanada", 400.0, 1.5)];
        assert!((order_total(&items) - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn preference_payload_carries_every_item_in_ars() {
        let items = vec![item("Empanada", 200.0, 6.0), item("Pizza", 1500.0, 1.0)];
        let payload = order_preference_payload(42, &items, "La Esquina");

        let payload_items = payload["items"].as_array().expect("items array");
        assert_eq!(payload_items.len(), 2);
        assert_eq!(payload_items[0]["title"], "Empanada");
        assert_eq!(payload_items[0]["quantity"], 6.0);
        assert_eq!(payload_items[0]["unit_price"], 200.0);
        assert_eq!(payload_items[1]["currency_id"], "ARS");

        assert_eq!(payload["external_reference"], "order_42");
        assert_eq!(payload["statement_descriptor"], "La Esquina");
        assert_eq!(payload["payment_methods"]["installments"], 1);
    }

    #[test]
    fn preference_item_description_defaults_to_its_name() {
        let items = vec![item("Empanada", 200.0, 1.0)];
        let payload = order_preference_payload(1, &items, "La Esquina");
        assert_eq!(payload["items"][0]["description"], "Empanada");
    }

    #[test]
    fn preference_item_description_can_be_overridden() {
        let mut seasoned = item("Empanada", 200.0, 1.0);
        seasoned.description = Some("Empanada de carne picante".to_string());
        let payload = order_preference_payload(1, &[seasoned], "La Esquina");
        assert_eq!(
            payload["items"][0]["description"],
            "Empanada de carne picante"
        );
    }
}
