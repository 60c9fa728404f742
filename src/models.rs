use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============ Prospecting ============

/// Ratings strictly below this value mark an underperforming business.
pub const LOW_RATING_THRESHOLD: f64 = 4.0;

/// One candidate lead, as returned by the place details endpoint plus its computed score.
///
/// Provider fields the service does not interpret are kept in `extra` and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    /// Business name.
    #[serde(default)]
    pub name: String,
    /// Local-format phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_phone_number: Option<String>,
    /// Business website.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Average user rating, 0.0 to 5.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Full street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    /// Provider operational status (e.g. "OPERATIONAL").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_status: Option<String>,
    /// Location and viewport, forwarded untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    /// Lead priority computed by [`crate::scoring::calculate_score`].
    #[serde(default)]
    pub score: i32,
    /// Any other provider fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BusinessRecord {
    /// Whether the business publishes a (non-empty) website.
    pub fn has_website(&self) -> bool {
        self.website.as_deref().is_some_and(|w| !w.is_empty())
    }

    /// Whether the business publishes a (non-empty) phone number.
    pub fn has_phone(&self) -> bool {
        self.formatted_phone_number
            .as_deref()
            .is_some_and(|p| !p.is_empty())
    }

    /// Whether the business has a rating below [`LOW_RATING_THRESHOLD`].
    ///
    /// A rating of zero is treated as "no rating".
    pub fn has_low_rating(&self) -> bool {
        self.rating
            .is_some_and(|r| r != 0.0 && r < LOW_RATING_THRESHOLD)
    }
}

/// Body of `POST /api/prospect`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectRequest {
    pub niche: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub no_website_only: Option<bool>,
    pub low_rating_only: Option<bool>,
}

/// Validated prospecting parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProspectQuery {
    pub niche: String,
    pub city: String,
    pub state: String,
    pub no_website_only: Option<bool>,
    pub low_rating_only: Option<bool>,
}

impl ProspectQuery {
    /// Free-text query in the shape the places provider expects.
    pub fn search_text(&self) -> String {
        format!("{} em {} {}", self.niche, self.city, self.state)
    }
}

/// Result of the prospecting pipeline.
///
/// Serialized untagged: either a JSON array of leads or the provider status object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProspectOutcome {
    Leads(Vec<BusinessRecord>),
    UpstreamStatus(UpstreamStatus),
}

/// The places provider answered, but with a non-success domain status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamStatus {
    pub google_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_error: Option<String>,
}

// ============ Places API ============

/// Success sentinel of the places provider `status` field.
pub const PLACES_STATUS_OK: &str = "OK";

#[derive(Debug, Clone, Deserialize)]
pub struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<PlaceSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceSummary {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result: Option<BusinessRecord>,
}

// ============ Subscriptions ============

/// Body of `POST /api/assinaturas/criar`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionRequest {
    pub plan_key: Option<String>,
    pub email: Option<String>,
}

/// Successful subscription creation.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCreated {
    pub ok: bool,
    pub plan_key: String,
    #[serde(rename = "planId")]
    pub plan_id: String,
    pub mp_type: String,
    pub redirect_url: Option<String>,
    /// Raw provider response.
    pub mp: Value,
}
