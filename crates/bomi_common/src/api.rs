//! Backend API client and wire types.
//!
//! The backend is the source of truth for premiums and coverage facts; this
//! crate never computes them, only requests and displays. Requests are
//! built from explicit fields - arbitrary client input is never passed
//! through, and insurer codes are translated to backend enum names before
//! any comparison call.
//!
//! No retry logic. Timeouts are the HTTP client's; any failure surfaces as
//! `BomiError::Backend` and the dialogue layer turns it into an error-state
//! message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::catalog;
use crate::config::BomiConfig;
use crate::error::BomiError;
use crate::slots::{PlanVariantScope, Sex, SortBy};

/// One coverage candidate from the candidate-search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCandidate {
    pub coverage_code: String,
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateSearchRequest {
    pub coverage_query_text: String,
    pub max_candidates: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateSearchResponse {
    #[serde(default)]
    pub candidates: Vec<CoverageCandidate>,
}

/// Comparison request. `insurers` carries backend enum names (MERITZ...),
/// never short codes.
#[derive(Debug, Clone, Serialize)]
pub struct CompareRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_code: Option<String>,
    pub age: u8,
    pub gender: String,
    pub insurers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coverage_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_variant_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompareResponse {
    #[serde(default)]
    pub insurer_rows: Value,
    #[serde(default)]
    pub q12_report: Option<Q12Report>,
    #[serde(default)]
    pub sections: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Q12Report {
    #[serde(default)]
    pub insurers: Vec<String>,
    pub summary: Q12Summary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Q12Summary {
    #[serde(default)]
    pub pros_cons: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PremiumRankingResponse {
    #[serde(default)]
    pub query_params: Value,
    #[serde(default)]
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupportMatrixResponse {
    #[serde(default)]
    pub matrix: Vec<SupportMatrixRow>,
}

/// One insurer's support row. Cells are kept as raw JSON
/// (`{status_icon, display, color, coverage_kind, evidence_refs}`) and go
/// through the table normalizer for display.
#[derive(Debug, Clone, Deserialize)]
pub struct SupportMatrixRow {
    pub insurer_key: String,
    #[serde(default)]
    pub in_situ: Value,
    #[serde(default)]
    pub borderline: Value,
}

/// Translate internal insurer codes to backend enum names. Unknown codes
/// are a validation error - nothing unchecked reaches the backend.
pub fn to_enum_names(codes: &[String]) -> Result<Vec<String>, BomiError> {
    codes
        .iter()
        .map(|code| {
            catalog::enum_name_for(code)
                .map(str::to_string)
                .ok_or_else(|| BomiError::Validation(format!("unknown insurer code: {}", code)))
        })
        .collect()
}

/// HTTP client for the comparison backend.
#[derive(Debug, Clone)]
pub struct CompareClient {
    base_url: String,
    client: reqwest::Client,
}

impl CompareClient {
    pub fn new(config: &BomiConfig) -> Result<Self, BomiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.timeout_secs))
            .build()
            .map_err(|e| BomiError::Backend(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url: config.backend.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Search coverage candidates for a free-text query.
    pub async fn search_candidates(
        &self,
        query: &str,
        max_candidates: u8,
    ) -> Result<CandidateSearchResponse, BomiError> {
        let request = CandidateSearchRequest {
            coverage_query_text: query.to_string(),
            max_candidates,
        };
        self.post_json("/coverage/candidates", &request).await
    }

    /// Run a comparison. Requires at least two insurers; rejected before
    /// any network traffic otherwise.
    pub async fn compare(
        &self,
        coverage_code: Option<&str>,
        age: u8,
        sex: Sex,
        insurer_codes: &[String],
        coverage_codes: &[String],
        sort_by: Option<SortBy>,
        scope: Option<PlanVariantScope>,
        as_of_date: Option<&str>,
    ) -> Result<CompareResponse, BomiError> {
        if insurer_codes.len() < 2 {
            return Err(BomiError::Validation(
                "comparison requires at least 2 insurers".to_string(),
            ));
        }
        let request = CompareRequest {
            coverage_code: coverage_code.map(str::to_string),
            age,
            gender: sex.as_str().to_string(),
            insurers: to_enum_names(insurer_codes)?,
            coverage_codes: coverage_codes.to_vec(),
            sort_by: sort_by.map(|s| s.as_str().to_string()),
            plan_variant_scope: scope.map(|s| s.as_str().to_string()),
            as_of_date: as_of_date.map(str::to_string),
        };
        self.post_json("/compare_v2", &request).await
    }

    /// Coverage detail (single-insurer explanation flow). Unlike
    /// [`compare`](Self::compare) this accepts a single insurer.
    pub async fn coverage_detail(
        &self,
        insurer_codes: &[String],
        coverage_codes: &[String],
    ) -> Result<CompareResponse, BomiError> {
        if insurer_codes.is_empty() {
            return Err(BomiError::Validation(
                "coverage detail requires at least 1 insurer".to_string(),
            ));
        }
        let request = serde_json::json!({
            "insurers": to_enum_names(insurer_codes)?,
            "coverage_codes": coverage_codes,
        });
        self.post_json("/q13", &request).await
    }

    /// Premium ranking (Q1).
    pub async fn premium_ranking(
        &self,
        age: u8,
        sex: Sex,
        plan_variant: PlanVariantScope,
        sort_by: SortBy,
        top_n: u8,
        as_of_date: Option<&str>,
    ) -> Result<PremiumRankingResponse, BomiError> {
        let url = format!("{}/premium/ranking", self.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("age", age.to_string()),
            ("sex", sex.as_str().to_string()),
            ("plan_variant", plan_variant.as_str().to_string()),
            ("sort_by", sort_by.as_str().to_string()),
            ("top_n", top_n.to_string()),
        ];
        if let Some(date) = as_of_date {
            query.push(("as_of_date", date.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| BomiError::Backend(format!("premium ranking request failed: {}", e)))?;
        Self::read_json(response).await
    }

    /// Support matrix (Q4): in-situ / borderline support per insurer.
    pub async fn support_matrix(
        &self,
        insurer_codes: &[String],
    ) -> Result<SupportMatrixResponse, BomiError> {
        if insurer_codes.is_empty() {
            return Err(BomiError::Validation(
                "support matrix requires at least 1 insurer".to_string(),
            ));
        }
        let url = format!("{}/support/matrix", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("insurers", insurer_codes.join(","))])
            .send()
            .await
            .map_err(|e| BomiError::Backend(format!("support matrix request failed: {}", e)))?;
        Self::read_json(response).await
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BomiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BomiError::Backend(format!("request to {} failed: {}", path, e)))?;
        Self::read_json(response).await
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, BomiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BomiError::Backend(format!("HTTP {} from backend", status)));
        }
        response
            .json()
            .await
            .map_err(|e| BomiError::Backend(format!("invalid backend response: {}", e)))
    }
}
