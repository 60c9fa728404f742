use crate::errors::AppError;
use crate::models::{BusinessRecord, PlaceDetailsResponse, TextSearchResponse};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Fields requested for every place details lookup.
pub const DETAIL_FIELDS: &str =
    "name,formatted_phone_number,website,rating,formatted_address,business_status,geometry";

/// Client for the Google Places text search and place details endpoints.
#[derive(Clone)]
pub struct PlacesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    /// Creates a new `PlacesClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Places API root, e.g. `https://maps.googleapis.com/maps/api/place`.
    /// * `api_key` - Google API key sent as the `key` query parameter.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Runs a free-text place search.
    ///
    /// A non-`OK` provider status is returned as data, not as an error.
    pub async fn text_search(&self, query: &str) -> Result<TextSearchResponse, AppError> {
        tracing::info!("Places text search: {}", query);
        self.get_json("textsearch/json", &[("query", query)]).await
    }

    /// Fetches the details of one place.
    pub async fn place_details(&self, place_id: &str) -> Result<BusinessRecord, AppError> {
        tracing::debug!("Places details lookup: {}", place_id);
        let details: PlaceDetailsResponse = self
            .get_json(
                "details/json",
                &[("place_id", place_id), ("fields", DETAIL_FIELDS)],
            )
            .await?;

        details.result.ok_or_else(|| {
            AppError::ExternalApiError(format!(
                "Place details for {} returned no result (status {}: {})",
                place_id,
                details.status.as_deref().unwrap_or("unknown"),
                details.error_message.as_deref().unwrap_or("no message")
            ))
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, AppError> {
        // Build URL with proper parameter encoding to prevent injection attacks
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("key", self.api_key.as_str()));
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}", self.base_url, endpoint),
            &query,
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        // Redact key from logs to prevent credential exposure
        tracing::debug!("Places URL: {}/{}?...&key=[REDACTED]", self.base_url, endpoint);

        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Places request failed: {}", e.without_url()))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Places API returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Places API returned status {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!(
                "Failed to parse Places response: {}",
                e.without_url()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = PlacesClient::new("https://example.com/place/", "key");
        assert_eq!(client.base_url, "https://example.com/place");
    }
}
