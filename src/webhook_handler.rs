use axum::{body::Bytes, http::StatusCode};
use serde_json::Value;

/// Mercado Pago Webhook Handler
///
/// Receives payment and subscription notifications from Mercado Pago and logs them.
/// Every delivery is acknowledged with 200 so the provider stops retrying; nothing is
/// persisted and signatures are not verified.
pub async fn mercadopago_webhook(body: Bytes) -> (StatusCode, &'static str) {
    match serde_json::from_slice::<Value>(&body) {
        Ok(event) => {
            let topic = event
                .get("type")
                .or_else(|| event.get("topic"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let action = event
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or("-");
            let resource_id = event
                .get("data")
                .and_then(|d| d.get("id"))
                .map(|id| match id {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "-".to_string());

            tracing::info!(
                topic,
                action,
                resource_id = %resource_id,
                "Received Mercado Pago webhook: {}",
                event
            );
        }
        Err(e) => {
            tracing::warn!(
                "Received Mercado Pago webhook with non-JSON body ({} bytes): {}",
                body.len(),
                e
            );
        }
    }

    (StatusCode::OK, "OK")
}
