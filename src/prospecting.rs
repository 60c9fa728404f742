/// Prospecting pipeline
///
/// 1. Look the request signature up in the prospect cache
/// 2. Text search on the places provider
/// 3. Concurrent details lookup for the first results
/// 4. Score, filter and sort the leads
/// 5. Cache and return
use crate::cache::{ProspectCache, QuerySignature};
use crate::errors::{AppError, ResultExt};
use crate::models::{
    BusinessRecord, ProspectOutcome, ProspectQuery, ProspectRequest, UpstreamStatus,
    PLACES_STATUS_OK,
};
use crate::places_client::PlacesClient;
use crate::scoring::calculate_score;
use futures::future::try_join_all;

/// Upper bound on details lookups per search.
pub const MAX_DETAIL_LOOKUPS: usize = 15;

impl ProspectRequest {
    /// Checks that the text parameters are present and non-blank.
    pub fn validate(self) -> Result<ProspectQuery, AppError> {
        fn required(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        match (
            required(self.niche),
            required(self.city),
            required(self.state),
        ) {
            (Some(niche), Some(city), Some(state)) => Ok(ProspectQuery {
                niche,
                city,
                state,
                no_website_only: self.no_website_only,
                low_rating_only: self.low_rating_only,
            }),
            _ => Err(AppError::BadRequest(
                "Campos obrigatórios: niche, city e state".to_string(),
            )),
        }
    }
}

pub struct ProspectService {
    places: PlacesClient,
    cache: ProspectCache,
}

impl ProspectService {
    pub fn new(places: PlacesClient, cache: ProspectCache) -> Self {
        Self { places, cache }
    }

    /// Builds the scored lead list for `query`, serving it from cache when fresh.
    pub async fn build_results(&self, query: &ProspectQuery) -> Result<ProspectOutcome, AppError> {
        let signature = QuerySignature::new(query);

        if let Some(cached) = self.cache.get(&signature) {
            tracing::debug!("Prospect cache HIT: {}", signature);
            return Ok(ProspectOutcome::Leads(cached));
        }
        tracing::info!("Prospect cache MISS: {}", signature);

        let search = self
            .places
            .text_search(&query.search_text())
            .await
            .context("Places text search failed")?;

        if search.status != PLACES_STATUS_OK {
            tracing::warn!(
                "Places text search returned status {} for {}",
                search.status,
                signature
            );
            return Ok(ProspectOutcome::UpstreamStatus(UpstreamStatus {
                google_status: search.status,
                google_error: search.error_message,
            }));
        }

        let lookups = search
            .results
            .iter()
            .take(MAX_DETAIL_LOOKUPS)
            .map(|place| async move {
                let place_id = place.place_id.as_deref().ok_or_else(|| {
                    AppError::ExternalApiError("Places result without place_id".to_string())
                })?;
                self.places.place_details(place_id).await
            });

        // Any failed lookup fails the whole batch; remaining lookups are dropped.
        let detailed = try_join_all(lookups)
            .await
            .context("Places details lookup failed")?;

        let leads = rank_leads(detailed, query);

        tracing::info!(
            "Prospect search {} produced {} lead(s) from {} result(s)",
            signature,
            leads.len(),
            search.results.len()
        );

        self.cache.put(signature, leads.clone());
        Ok(ProspectOutcome::Leads(leads))
    }
}

/// Scores every record, applies the requested filters and sorts by descending score.
pub fn rank_leads(records: Vec<BusinessRecord>, query: &ProspectQuery) -> Vec<BusinessRecord> {
    let mut leads: Vec<BusinessRecord> = records
        .into_iter()
        .map(|mut record| {
            record.score = calculate_score(&record);
            record
        })
        .filter(|record| query.no_website_only != Some(true) || !record.has_website())
        .filter(|record| query.low_rating_only != Some(true) || record.has_low_rating())
        .collect();

    leads.sort_by(|a, b| b.score.cmp(&a.score));
    leads
}
