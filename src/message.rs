use std::sync::Arc;

use serde_json::Value;

use crate::app::AppState;

/// Formats a phone number with the transport's required address scheme.
pub fn whatsapp_address(number: &str) -> String {
    let trimmed = number.trim();
    if trimmed.starts_with("whatsapp:") {
        trimmed.to_string()
    } else {
        format!("whatsapp:{trimmed}")
    }
}

/// Strips the transport address scheme, leaving the bare phone number used as
/// the conversation user id.
pub fn strip_whatsapp_prefix(address: &str) -> String {
    address
        .trim()
        .strip_prefix("whatsapp:")
        .unwrap_or(address.trim())
        .to_string()
}

/// Delivers one text message over the WhatsApp channel. Returns the
/// provider-assigned message SID on success; failures are reported, never
/// raised, so the webhook handler can log and still acknowledge the
/// transport.
pub async fn send_whatsapp_message(
    state: &Arc<AppState>,
    body: &str,
    to_number: &str,
) -> Result<String, String> {
    let url = format!(
        "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
        state.config.twilio_account_sid
    );
    let from = whatsapp_address(&state.config.twilio_from_number);
    let to = whatsapp_address(to_number);

    let response = state
        .http
        .post(&url)
        .basic_auth(
            &state.config.twilio_account_sid,
            Some(&state.config.twilio_auth_token),
        )
        .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
        .send()
        .await
        .map_err(|err| format!("twilio request failed: {err}"))?;

    let status = response.status();
    let payload = response
        .json::<Value>()
        .await
        .unwrap_or_else(|_| Value::Null);

    if !status.is_success() {
        let code = payload.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(format!("twilio returned {status} (code {code}): {message}"));
    }

    let sid = payload
        .get("sid")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if sid.is_empty() {
        return Err("twilio response had no message sid".to_string());
    }
    Ok(sid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_address_adds_scheme() {
        assert_eq!(whatsapp_address("+5491122334455"), "whatsapp:+5491122334455");
    }

    #[test]
    fn whatsapp_address_keeps_existing_scheme() {
        assert_eq!(
            whatsapp_address("whatsapp:+5491122334455"),
            "whatsapp:+5491122334455"
        );
    }

    #[test]
    fn strip_whatsapp_prefix_round_trips() {
        assert_eq!(
            strip_whatsapp_prefix("whatsapp:+5491122334455"),
            "+5491122334455"
        );
        assert_eq!(strip_whatsapp_prefix("+5491122334455"), "+5491122334455");
    }
}
