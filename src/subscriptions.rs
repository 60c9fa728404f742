/// Subscription creation flow
///
/// Maps a plan key to a Mercado Pago plan id, works out which plan API the id belongs to and
/// creates the subscription, returning the checkout URL the frontend redirects to.
use crate::errors::{AppError, ResultExt};
use crate::mercadopago_client::{pick_redirect_url, MercadoPagoClient, PlanApi};
use crate::models::{SubscriptionCreated, SubscriptionRequest};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use moka::future::Cache;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Answer for requests without a usable `plan_key`/`email` pair.
pub const MISSING_FIELDS: &str = "Campos obrigatórios: plan_key e email";

const PLAN_NOT_RECOGNISED: &str = "Não consegui validar esse PLAN_ID no Mercado Pago. \
     Verifique: (1) ID do plano (2) token/conta correta (3) produção vs teste.";

/// Failure of a subscription request, rendered as `{ ok: false, ... }`.
#[derive(Debug)]
pub enum SubscriptionError {
    /// The request cannot be served as sent (400).
    Invalid {
        message: String,
        plan_id: Option<String>,
    },
    /// Configuration, transport or provider failure.
    Failed(AppError),
}

impl SubscriptionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SubscriptionError::Invalid {
            message: message.into(),
            plan_id: None,
        }
    }
}

impl From<AppError> for SubscriptionError {
    fn from(err: AppError) -> Self {
        SubscriptionError::Failed(err)
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        match self {
            SubscriptionError::Invalid { message, plan_id } => {
                let mut body = Map::new();
                body.insert("ok".into(), json!(false));
                body.insert("error".into(), json!(message));
                if let Some(plan_id) = plan_id {
                    body.insert("planId".into(), json!(plan_id));
                }
                (StatusCode::BAD_REQUEST, Json(Value::Object(body))).into_response()
            }
            SubscriptionError::Failed(err) => {
                let status = err.status_code();
                match err.upstream_body() {
                    Some(mp) => tracing::error!(
                        "Subscription creation failed ({}): {} | Mercado Pago body: {}",
                        status,
                        err,
                        mp
                    ),
                    None => tracing::error!("Subscription creation failed ({}): {}", status, err),
                }

                let body = json!({
                    "ok": false,
                    "error": "Falha ao criar assinatura no Mercado Pago",
                    "status": status.as_u16(),
                    "mp": err.upstream_body().cloned(),
                    "message": err.root().to_string(),
                });
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Everything a subscription request needs from the application state.
pub struct SubscriptionService<'a> {
    pub client: Option<&'a MercadoPagoClient>,
    pub plans: &'a BTreeMap<String, String>,
    pub plan_api_cache: &'a Cache<String, PlanApi>,
    pub frontend_url: &'a str,
    pub backend_url: &'a str,
}

impl SubscriptionService<'_> {
    /// Creates a subscription for the requested plan.
    pub async fn create(
        &self,
        request: SubscriptionRequest,
    ) -> Result<SubscriptionCreated, SubscriptionError> {
        let client = self.client.ok_or_else(|| {
            AppError::Configuration("MP_ACCESS_TOKEN não configurado".to_string())
        })?;

        let (plan_key, email) = match (non_blank(request.plan_key), non_blank(request.email)) {
            (Some(plan_key), Some(email)) => (plan_key, email),
            _ => return Err(SubscriptionError::invalid(MISSING_FIELDS)),
        };

        if !is_valid_email(&email)? {
            return Err(SubscriptionError::invalid(format!(
                "email inválido ({})",
                email
            )));
        }

        let plan_id = self.plans.get(&plan_key).cloned().ok_or_else(|| {
            SubscriptionError::invalid(format!(
                "plan_key inválido ({}). Chaves válidas: {}",
                plan_key,
                self.plans.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;

        let plan_api = self.resolve_plan_api(client, &plan_id).await.ok_or_else(|| {
            SubscriptionError::Invalid {
                message: PLAN_NOT_RECOGNISED.to_string(),
                plan_id: Some(plan_id.clone()),
            }
        })?;

        let payload = self.build_payload(plan_api, &plan_id, &plan_key, &email);
        tracing::info!(
            "Creating {} subscription for plan {} ({})",
            plan_api.label(),
            plan_key,
            plan_id
        );

        let data = client
            .post_json(plan_api.create_path(), &payload)
            .await
            .with_context(|| format!("Creating subscription for plan {}", plan_key))?;

        let redirect_url = pick_redirect_url(&data);
        if redirect_url.is_none() {
            tracing::warn!("Mercado Pago response carries no redirect URL");
        }

        Ok(SubscriptionCreated {
            ok: true,
            plan_key,
            plan_id,
            mp_type: plan_api.label().to_string(),
            redirect_url,
            mp: data,
        })
    }

    /// Resolves the plan API, memoising successful resolutions.
    async fn resolve_plan_api(&self, client: &MercadoPagoClient, plan_id: &str) -> Option<PlanApi> {
        if let Some(api) = self.plan_api_cache.get(plan_id).await {
            tracing::debug!("Plan API cache HIT for {}", plan_id);
            return Some(api);
        }

        let api = client.resolve_plan_api(plan_id).await?;
        self.plan_api_cache.insert(plan_id.to_string(), api).await;
        Some(api)
    }

    /// Minimal payload accepted by both plan APIs.
    pub fn build_payload(
        &self,
        plan_api: PlanApi,
        plan_id: &str,
        plan_key: &str,
        email: &str,
    ) -> Value {
        let mut payload = Map::new();
        payload.insert(plan_api.plan_field().to_string(), json!(plan_id));
        payload.insert("payer_email".into(), json!(email));
        payload.insert("reason".into(), json!(format!("RUBI - {}", plan_key)));
        payload.insert(
            "back_url".into(),
            json!(format!("{}/assinatura/retorno", self.frontend_url)),
        );
        payload.insert("external_reference".into(), json!(email));
        payload.insert(
            "notification_url".into(),
            json!(format!("{}/api/webhooks/mercadopago", self.backend_url)),
        );
        Value::Object(payload)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loose shape check: something@domain.tld, no whitespace.
pub fn is_valid_email(email: &str) -> Result<bool, AppError> {
    static EMAIL_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let re = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"))
        .as_ref()
        .map_err(|e| AppError::InternalError(format!("Invalid email pattern: {}", e)))?;
    Ok(re.is_match(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn plans() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("essencial_mensal".to_string(), "plan-essencial".to_string()),
            ("pro_mensal".to_string(), "plan-pro".to_string()),
        ])
    }

    fn plan_cache() -> Cache<String, PlanApi> {
        Cache::builder()
            .time_to_live(Duration::from_secs(60))
            .build()
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("cliente@padaria.com.br").unwrap());
        assert!(!is_valid_email("cliente@padaria").unwrap());
        assert!(!is_valid_email("cliente padaria@x.com").unwrap());
        assert!(!is_valid_email("").unwrap());
    }

    #[tokio::test]
    async fn test_malformed_email_rejected_before_plan_lookup() {
        let plans = plans();
        let cache = plan_cache();
        let client = MercadoPagoClient::new("http://127.0.0.1:9", "token");
        let service = SubscriptionService {
            client: Some(&client),
            plans: &plans,
            plan_api_cache: &cache,
            frontend_url: "https://front.example",
            backend_url: "https://back.example",
        };

        let err = service
            .create(SubscriptionRequest {
                plan_key: Some("pro_mensal".into()),
                email: Some("dono@padaria".into()),
            })
            .await
            .unwrap_err();
        match err {
            SubscriptionError::Invalid { message, plan_id } => {
                assert_eq!(message, "email inválido (dono@padaria)");
                assert_eq!(plan_id, None);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_uses_plan_field_of_variant() {
        let plans = plans();
        let cache = plan_cache();
        let service = SubscriptionService {
            client: None,
            plans: &plans,
            plan_api_cache: &cache,
            frontend_url: "https://front.example",
            backend_url: "https://back.example",
        };

        let payload =
            service.build_payload(PlanApi::Preapproval, "plan-pro", "pro_mensal", "a@b.com");
        assert_eq!(payload["preapproval_plan_id"], "plan-pro");
        assert!(payload.get("plan_id").is_none());
        assert_eq!(payload["payer_email"], "a@b.com");
        assert_eq!(payload["external_reference"], "a@b.com");
        assert_eq!(payload["reason"], "RUBI - pro_mensal");
        assert_eq!(payload["back_url"], "https://front.example/assinatura/retorno");
        assert_eq!(
            payload["notification_url"],
            "https://back.example/api/webhooks/mercadopago"
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_configuration_error() {
        let plans = plans();
        let cache = plan_cache();
        let service = SubscriptionService {
            client: None,
            plans: &plans,
            plan_api_cache: &cache,
            frontend_url: "https://front.example",
            backend_url: "https://back.example",
        };

        let err = service
            .create(SubscriptionRequest {
                plan_key: Some("pro_mensal".into()),
                email: Some("a@b.com".into()),
            })
            .await
            .unwrap_err();
        match err {
            SubscriptionError::Failed(e) => {
                assert!(matches!(e, AppError::Configuration(_)));
                assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected configuration failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_plan_lists_valid_keys() {
        let plans = plans();
        let cache = plan_cache();
        let client = MercadoPagoClient::new("http://127.0.0.1:9", "token");
        let service = SubscriptionService {
            client: Some(&client),
            plans: &plans,
            plan_api_cache: &cache,
            frontend_url: "https://front.example",
            backend_url: "https://back.example",
        };

        let err = service
            .create(SubscriptionRequest {
                plan_key: Some("anual".into()),
                email: Some("a@b.com".into()),
            })
            .await
            .unwrap_err();
        match err {
            SubscriptionError::Invalid { message, .. } => {
                assert_eq!(
                    message,
                    "plan_key inválido (anual). Chaves válidas: essencial_mensal, pro_mensal"
                );
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
