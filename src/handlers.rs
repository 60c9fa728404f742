use crate::cache::ProspectCache;
use crate::config::Config;
use crate::errors::AppError;
use crate::mercadopago_client::{MercadoPagoClient, PlanApi};
use crate::models::*;
use crate::places_client::PlacesClient;
use crate::prospecting::ProspectService;
use crate::subscriptions::{SubscriptionError, SubscriptionService, MISSING_FIELDS};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Computed prospect lists keyed by query signature (24h TTL, checked on read).
    pub prospect_cache: ProspectCache,
    /// Google Places client (None when `GOOGLE_PLACES_API_KEY` is not configured).
    pub places_client: Option<PlacesClient>,
    /// Mercado Pago client (None when `MP_ACCESS_TOKEN` is not configured).
    pub mercadopago_client: Option<MercadoPagoClient>,
    /// Plan id -> resolved plan API, so plan ids are not re-probed on every request.
    pub plan_api_cache: Cache<String, PlanApi>,
}

impl AppState {
    /// Builds the state from configuration, creating the upstream clients whose
    /// credentials are present.
    pub fn from_config(config: Config) -> Self {
        let places_client = config
            .google_places_api_key
            .as_ref()
            .map(|key| PlacesClient::new(config.google_places_base_url.clone(), key.clone()));

        let mercadopago_client = config
            .mp_access_token
            .as_ref()
            .map(|token| {
                MercadoPagoClient::new(config.mercadopago_base_url.clone(), token.clone())
            });

        // Plan ids rarely move between API shapes; one hour keeps probes rare
        let plan_api_cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(1_000)
            .build();

        Self {
            config,
            prospect_cache: ProspectCache::new(),
            places_client,
            mercadopago_client,
            plan_api_cache,
        }
    }
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rubi-backend",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/prospect
///
/// Searches businesses for a niche in a city, scores them as leads and returns them sorted
/// by score. Results are cached per request signature for 24 hours.
///
/// # Returns
///
/// * `200` with a JSON array of leads.
/// * `200` with `{ google_status, google_error? }` when the places provider reports a
///   non-success status.
/// * `400` when the body is not a valid request or niche, city or state is missing.
/// * `500` on any upstream failure.
pub async fn prospect(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProspectRequest>, JsonRejection>,
) -> Result<Json<ProspectOutcome>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        AppError::BadRequest(format!(
            "Corpo da requisição inválido: {}",
            rejection.body_text()
        ))
    })?;
    tracing::info!("POST /api/prospect - params: {:?}", payload);

    let query = payload.validate()?;

    let places = state.places_client.clone().ok_or_else(|| {
        AppError::Configuration("GOOGLE_PLACES_API_KEY not configured".to_string())
    })?;

    let service = ProspectService::new(places, state.prospect_cache.clone());
    let outcome = service.build_results(&query).await?;

    Ok(Json(outcome))
}

/// POST /api/assinaturas/criar (also served at the legacy POST /create-subscription)
///
/// Creates a Mercado Pago subscription for `{ plan_key, email }` and returns the checkout
/// `redirect_url`. A body that cannot be read as that object is answered as missing
/// `plan_key` and `email`.
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<Json<SubscriptionCreated>, SubscriptionError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!("Unreadable subscription body: {}", rejection.body_text());
        SubscriptionError::invalid(MISSING_FIELDS)
    })?;
    tracing::info!(
        "POST /api/assinaturas/criar - plan_key: {:?}",
        payload.plan_key
    );

    let service = SubscriptionService {
        client: state.mercadopago_client.as_ref(),
        plans: &state.config.plans,
        plan_api_cache: &state.plan_api_cache,
        frontend_url: &state.config.frontend_url,
        backend_url: &state.config.backend_url,
    };

    let created = service.create(payload).await?;
    tracing::info!(
        "Subscription created for plan {} ({}), redirect: {:?}",
        created.plan_key,
        created.mp_type,
        created.redirect_url
    );

    Ok(Json(created))
}
