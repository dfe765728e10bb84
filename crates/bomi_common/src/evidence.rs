//! Evidence ranking and deduplication.
//!
//! The backend attaches document excerpts (doc type + page + excerpt) to
//! the values it returns. Per rendered slot we deduplicate them, score by
//! keyword relevance and document-type priority, and keep the best few.
//! Heuristic ranking, not an exact-match guarantee; ties keep original
//! payload order (the sort is stable).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog;

/// Max excerpt length before truncation.
const EXCERPT_MAX: usize = 320;
/// Dedup key uses only the excerpt head, so re-paginated duplicates with
/// trailing differences still collapse.
const DEDUP_PREFIX: usize = 100;

/// One supporting document excerpt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub doc_type: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl EvidenceRef {
    fn dedup_key(&self) -> (String, u32, String) {
        let prefix: String = self.excerpt.chars().take(DEDUP_PREFIX).collect();
        (self.doc_type.clone(), self.page, prefix)
    }
}

/// Score one evidence item for a slot: +100 per slot keyword present in
/// the excerpt (case-insensitive), plus the doc-type priority weight,
/// minus 0.1 per page number so earlier pages win close calls.
fn score(evidence: &EvidenceRef, keywords: &[&str]) -> f64 {
    let excerpt = evidence.excerpt.to_lowercase();
    let keyword_hits = keywords
        .iter()
        .filter(|k| excerpt.contains(&k.to_lowercase()))
        .count() as f64;

    keyword_hits * 100.0 + catalog::doc_type_weight(&evidence.doc_type)
        - 0.1 * evidence.page as f64
}

/// Deduplicate, rank, and trim evidence for one slot.
pub fn filter_and_rank_evidences(
    evidences: &[EvidenceRef],
    slot_name: &str,
    max_count: usize,
) -> Vec<EvidenceRef> {
    let keywords = catalog::evidence_keywords(slot_name);

    let mut seen: HashSet<(String, u32, String)> = HashSet::new();
    let mut unique: Vec<EvidenceRef> = Vec::new();
    for ev in evidences {
        if seen.insert(ev.dedup_key()) {
            unique.push(ev.clone());
        }
    }

    // Stable sort: equal scores keep payload order.
    unique.sort_by(|a, b| {
        score(b, &keywords)
            .partial_cmp(&score(a, &keywords))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    unique.truncate(max_count);

    for ev in &mut unique {
        if ev.excerpt.chars().count() > EXCERPT_MAX {
            let cut: String = ev.excerpt.chars().take(EXCERPT_MAX).collect();
            ev.excerpt = format!("{}...", cut);
        }
    }
    unique
}
