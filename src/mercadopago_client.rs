use crate::errors::AppError;
use serde_json::Value;

/// The two Mercado Pago API shapes a plan id can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanApi {
    /// `/subscriptions/v1` plans, subscribed with `plan_id`.
    Subscriptions,
    /// Legacy `preapproval_plan` plans, subscribed with `preapproval_plan_id`.
    Preapproval,
}

impl PlanApi {
    /// Order in which plan ids are probed.
    pub const PROBE_ORDER: [PlanApi; 2] = [PlanApi::Subscriptions, PlanApi::Preapproval];

    /// Path that answers 2xx when `plan_id` exists under this API.
    pub fn probe_path(&self, plan_id: &str) -> String {
        match self {
            PlanApi::Subscriptions => format!("/subscriptions/v1/plans/{}", plan_id),
            PlanApi::Preapproval => format!("/preapproval_plan/{}", plan_id),
        }
    }

    /// Path where subscriptions for this API are created.
    pub fn create_path(&self) -> &'static str {
        match self {
            PlanApi::Subscriptions => "/subscriptions/v1/subscriptions",
            PlanApi::Preapproval => "/preapproval",
        }
    }

    /// Payload field carrying the plan id.
    pub fn plan_field(&self) -> &'static str {
        match self {
            PlanApi::Subscriptions => "plan_id",
            PlanApi::Preapproval => "preapproval_plan_id",
        }
    }

    /// Label reported to callers as `mp_type`.
    pub fn label(&self) -> &'static str {
        match self {
            PlanApi::Subscriptions => "NEW",
            PlanApi::Preapproval => "OLD",
        }
    }
}

/// Client for the Mercado Pago REST API.
#[derive(Clone)]
pub struct MercadoPagoClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoClient {
    /// Creates a new `MercadoPagoClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, normally `https://api.mercadopago.com`.
    /// * `access_token` - Account access token (`APP_USR-...`), sent as a bearer token.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// GETs `path` and returns the JSON body.
    pub async fn get_json(&self, path: &str) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Mercado Pago GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Mercado Pago request failed: {}", e))
            })?;

        Self::into_json(response).await
    }

    /// POSTs `body` as JSON to `path` and returns the JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Mercado Pago POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Mercado Pago request failed: {}", e))
            })?;

        Self::into_json(response).await
    }

    async fn into_json(response: reqwest::Response) -> Result<Value, AppError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::UpstreamRejected {
                status,
                body: serde_json::from_str(&error_text).ok(),
                message: format!("Mercado Pago returned {}: {}", status, error_text),
            });
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Mercado Pago response: {}", e))
        })
    }

    /// Finds which API shape `plan_id` belongs to.
    ///
    /// Probes [`PlanApi::PROBE_ORDER`] and returns the first variant whose plan lookup
    /// succeeds. Returns `None` when no variant recognises the id (wrong id, wrong account or
    /// sandbox/production mismatch).
    pub async fn resolve_plan_api(&self, plan_id: &str) -> Option<PlanApi> {
        for api in PlanApi::PROBE_ORDER {
            match self.get_json(&api.probe_path(plan_id)).await {
                Ok(_) => {
                    tracing::info!("Plan {} resolved as {} ({:?})", plan_id, api.label(), api);
                    return Some(api);
                }
                Err(e) => {
                    tracing::debug!("Plan {} is not a {:?} plan: {}", plan_id, api, e);
                }
            }
        }

        tracing::warn!("Plan {} not recognised by any Mercado Pago plan API", plan_id);
        None
    }
}

/// Picks the checkout URL out of a subscription creation response.
pub fn pick_redirect_url(data: &Value) -> Option<String> {
    ["init_point", "sandbox_init_point", "checkout_url", "url"]
        .iter()
        .filter_map(|field| data.get(field).and_then(Value::as_str))
        .find(|url| !url.is_empty())
        .map(str::to_string)
}
