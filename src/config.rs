use serde::Deserialize;
use std::collections::BTreeMap;

/// Plan key that is always offered, even when its id has not been configured.
pub const DEFAULT_PLAN_KEY: &str = "essencial_mensal";
/// Placeholder id used for [`DEFAULT_PLAN_KEY`] until `MP_PLAN_ESSENCIAL_MENSAL` is set.
/// Plan resolution against it fails closed.
pub const UNCONFIGURED_PLAN_ID: &str = "COLE_AQUI_O_ID";

const PLAN_ENV_PREFIX: &str = "MP_PLAN_";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub google_places_api_key: Option<String>,
    pub google_places_base_url: String,
    pub mp_access_token: Option<String>,
    pub mercadopago_base_url: String,
    pub frontend_url: String,
    pub backend_url: String,
    /// Plan key -> Mercado Pago plan id.
    pub plans: BTreeMap<String, String>,
    /// Interval of the optional stale-entry sweep over the prospect cache.
    pub prospect_cache_sweep_secs: Option<u64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            google_places_api_key: optional_var("GOOGLE_PLACES_API_KEY"),
            google_places_base_url: url_var(
                "GOOGLE_PLACES_BASE_URL",
                "https://maps.googleapis.com/maps/api/place",
            )?,
            mp_access_token: optional_var("MP_ACCESS_TOKEN"),
            mercadopago_base_url: url_var("MERCADOPAGO_BASE_URL", "https://api.mercadopago.com")?,
            frontend_url: url_var("FRONTEND_URL", "https://rubidigital.base44.app")?,
            backend_url: url_var("BACKEND_URL", "https://rubi-backend.onrender.com")?,
            plans: plans_from_vars(std::env::vars()),
            prospect_cache_sweep_secs: optional_var("PROSPECT_CACHE_SWEEP_SECS")
                .map(|secs| {
                    secs.parse::<u64>()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or_else(|| {
                            anyhow::anyhow!("PROSPECT_CACHE_SWEEP_SECS must be a positive integer")
                        })
                })
                .transpose()?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("Google Places Base URL: {}", config.google_places_base_url);
        tracing::debug!("Mercado Pago Base URL: {}", config.mercadopago_base_url);
        tracing::debug!("Frontend URL: {}", config.frontend_url);
        tracing::debug!("Backend URL: {}", config.backend_url);
        tracing::debug!("Server Port: {}", config.port);
        if config.google_places_api_key.is_none() {
            tracing::warn!("GOOGLE_PLACES_API_KEY not set; /api/prospect will fail");
        }
        if config.mp_access_token.is_none() {
            tracing::warn!("MP_ACCESS_TOKEN not set; subscription creation will fail");
        }
        if config.plans.get(DEFAULT_PLAN_KEY).map(String::as_str) == Some(UNCONFIGURED_PLAN_ID) {
            tracing::warn!("MP_PLAN_ESSENCIAL_MENSAL not set; using placeholder plan id");
        }
        tracing::info!(
            "Subscription plans available: {}",
            config.plans.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        Ok(config)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let url = optional_var(name).unwrap_or_else(|| default.to_string());
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

/// Builds the plan catalog from `MP_PLAN_<KEY>=<plan id>` pairs.
///
/// The key is the lower-cased suffix, so `MP_PLAN_PRO_MENSAL` becomes `pro_mensal`.
/// [`DEFAULT_PLAN_KEY`] is always present.
pub fn plans_from_vars<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut plans: BTreeMap<String, String> = vars
        .into_iter()
        .filter_map(|(name, value)| {
            let key = name.strip_prefix(PLAN_ENV_PREFIX)?.to_lowercase();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key, value.to_string()))
        })
        .collect();

    plans
        .entry(DEFAULT_PLAN_KEY.to_string())
        .or_insert_with(|| UNCONFIGURED_PLAN_ID.to_string());

    plans
}
