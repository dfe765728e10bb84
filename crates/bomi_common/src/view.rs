//! View models handed to the presentation layer.
//!
//! The output contract is fixed per query kind: a Q1 answer carries a
//! premium-ranking view model and nothing else, every other kind carries
//! title/bullets/sections. Modeling the message as an enum makes the
//! "never both shapes at once" invariant unrepresentable instead of
//! merely checked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{PremiumRankingResponse, Q12Report, SupportMatrixResponse};
use crate::classify::QueryKind;
use crate::evidence::{filter_and_rank_evidences, EvidenceRef};
use crate::table::{normalize_table_section, render_cell_value, NormalizedRow, NormalizedTable};

/// How many evidence excerpts a support-matrix answer cites.
const MAX_MATRIX_EVIDENCES: usize = 3;

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Premium-ranking view model (Q1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumRankingVm {
    pub title: String,
    pub table: NormalizedTable,
}

/// An assistant answer, shaped per query kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantMessageVm {
    /// Q1 exposes `view_model` and structurally cannot carry sections.
    Q1 { view_model: PremiumRankingVm },
    /// Every other kind: title, summary bullets, normalized sections.
    Report {
        query_kind: QueryKind,
        title: String,
        #[serde(default)]
        summary_bullets: Vec<String>,
        #[serde(default)]
        sections: Vec<NormalizedTable>,
    },
}

/// Build the Q1 view model from a premium-ranking response. Rows arrive as
/// arbitrary JSON and go through the cell normalizer.
pub fn build_q1_vm(response: &PremiumRankingResponse, title: impl Into<String>) -> AssistantMessageVm {
    let section = serde_json::json!({
        "columns": ["순위", "보험사", "상품", "보험료"],
        "rows": response.rows,
    });
    AssistantMessageVm::Q1 {
        view_model: PremiumRankingVm {
            title: title.into(),
            table: normalize_table_section(&section),
        },
    }
}

/// Build a report view model from normalized sections, with the three-part
/// summary attached when the backend sent one.
pub fn build_report_vm(
    query_kind: QueryKind,
    title: impl Into<String>,
    sections: Vec<NormalizedTable>,
    report: Option<&Q12Report>,
) -> AssistantMessageVm {
    let mut summary_bullets = Vec::new();
    if let Some(report) = report {
        summary_bullets.extend(report.summary.pros_cons.iter().cloned());
        if !report.summary.recommendation.is_empty() {
            summary_bullets.push(format!("추천: {}", report.summary.recommendation));
        }
    }
    AssistantMessageVm::Report {
        query_kind,
        title: title.into(),
        summary_bullets,
        sections,
    }
}

/// Build the Q4 support-matrix table: one row per insurer, in-situ and
/// borderline cells rendered through the cell normalizer. The cells'
/// evidence refs are deduplicated, ranked, and cited as summary bullets.
pub fn build_support_matrix_vm(response: &SupportMatrixResponse) -> AssistantMessageVm {
    let columns = vec![
        "보험사".to_string(),
        "제자리암".to_string(),
        "경계성종양".to_string(),
    ];
    let mut evidences: Vec<EvidenceRef> = Vec::new();
    let rows = response
        .matrix
        .iter()
        .map(|row| {
            for cell in [&row.in_situ, &row.borderline] {
                evidences.extend(cell_evidences(cell));
            }
            NormalizedRow {
                label: row.insurer_key.clone(),
                values: vec![
                    render_cell_value(&row.in_situ),
                    render_cell_value(&row.borderline),
                ],
            }
        })
        .collect();

    let summary_bullets = filter_and_rank_evidences(&evidences, "지원여부", MAX_MATRIX_EVIDENCES)
        .into_iter()
        .map(|ev| format!("{} p.{}: {}", ev.doc_type, ev.page, ev.excerpt))
        .collect();

    AssistantMessageVm::Report {
        query_kind: QueryKind::Q4,
        title: "지원 여부".to_string(),
        summary_bullets,
        sections: vec![NormalizedTable {
            title: "지원 여부".to_string(),
            columns,
            rows,
        }],
    }
}

/// Pull `evidence_refs` out of one matrix cell, tolerating any shape.
fn cell_evidences(cell: &serde_json::Value) -> Vec<EvidenceRef> {
    cell.get("evidence_refs")
        .and_then(|refs| serde_json::from_value(refs.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_q1_vm_normalizes_rows() {
        let response = PremiumRankingResponse {
            query_params: json!({}),
            rows: vec![
                json!({"cells": [1, "삼성화재", "무배당 암보험", {"amount": 45000, "unit": "원"}]}),
                json!([2, "메리츠화재", "암보험플러스", {"amount": 47500, "unit": "원"}]),
            ],
        };
        let vm = build_q1_vm(&response, "보험료 순위");
        let AssistantMessageVm::Q1 { view_model } = vm else {
            panic!("expected Q1 view model");
        };
        assert_eq!(view_model.table.columns.len(), 4);
        assert_eq!(view_model.table.rows[0].values[2], "45,000 원");
        for row in &view_model.table.rows {
            assert_eq!(row.values.len(), 3);
        }
    }

    #[test]
    fn test_q1_serialization_has_no_sections() {
        let vm = build_q1_vm(&PremiumRankingResponse::default(), "t");
        let json = serde_json::to_value(&vm).unwrap();
        assert_eq!(json["kind"], "q1");
        assert!(json.get("sections").is_none());
        assert!(json.get("summary_bullets").is_none());
        assert!(json.get("view_model").is_some());
    }

    #[test]
    fn test_report_vm_carries_recommendation() {
        let report: Q12Report = serde_json::from_value(json!({
            "insurers": ["SAMSUNG", "MERITZ"],
            "summary": {
                "pros_cons": ["삼성: 한도 높음", "메리츠: 보험료 낮음"],
                "recommendation": "보험료 우선이면 메리츠"
            }
        }))
        .unwrap();
        let vm = build_report_vm(QueryKind::Q3, "비교 리포트", vec![], Some(&report));
        let AssistantMessageVm::Report { summary_bullets, .. } = vm else {
            panic!("expected report view model");
        };
        assert_eq!(summary_bullets.len(), 3);
        assert!(summary_bullets[2].starts_with("추천:"));
    }

    #[test]
    fn test_support_matrix_vm() {
        let response: SupportMatrixResponse = serde_json::from_value(json!({
            "matrix": [
                {"insurer_key": "samsung", "in_situ": {"display": "지원"}, "borderline": {"display": "미지원"}},
                {"insurer_key": "meritz", "in_situ": true, "borderline": null}
            ]
        }))
        .unwrap();
        let vm = build_support_matrix_vm(&response);
        let AssistantMessageVm::Report { sections, .. } = vm else {
            panic!("expected report view model");
        };
        assert_eq!(sections[0].rows[0].values, vec!["지원", "미지원"]);
        assert_eq!(sections[0].rows[1].values, vec!["O", "-"]);
    }

    #[test]
    fn test_support_matrix_cites_ranked_evidence() {
        let response: SupportMatrixResponse = serde_json::from_value(json!({
            "matrix": [{
                "insurer_key": "samsung",
                "in_situ": {
                    "display": "지원",
                    "evidence_refs": [
                        {"doc_type": "약관", "page": 12, "excerpt": "제자리암 보장 지원 여부 안내"},
                        {"doc_type": "약관", "page": 12, "excerpt": "제자리암 보장 지원 여부 안내"},
                        {"doc_type": "블로그", "page": 1, "excerpt": "무관한 내용"}
                    ]
                },
                "borderline": null
            }]
        }))
        .unwrap();
        let vm = build_support_matrix_vm(&response);
        let AssistantMessageVm::Report { summary_bullets, .. } = vm else {
            panic!("expected report view model");
        };
        // Duplicates collapse; the keyword-bearing 약관 excerpt ranks first.
        assert_eq!(summary_bullets.len(), 2);
        assert!(summary_bullets[0].starts_with("약관 p.12:"));
    }
}
