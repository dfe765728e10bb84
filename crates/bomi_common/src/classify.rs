//! Query classification: free text to one of the fixed query kinds.
//!
//! Two classifiers, both pure functions of the text:
//!
//! - [`classify`] routes a fresh message to a top-level query kind (Q1-Q4)
//!   through an ordered decision list - first match wins, later rules never
//!   override an earlier one.
//! - [`classify_ex`] is the clarification-flow variant. Its ordering is
//!   deliberate: an explanation request ("설명해줘") that happens to name two
//!   insurers must not be misrouted to a raw comparison unless comparison
//!   words are also present.

use serde::{Deserialize, Serialize};

use crate::extract::{extract_disease_subtype, is_comparison_intent};
use crate::text::normalize;

/// Top-level query kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    /// Premium ranking.
    Q1,
    /// Coverage-limit difference.
    Q2,
    /// Three-part comparison report.
    Q3,
    /// Support matrix (in-situ / borderline).
    Q4,
    Unknown,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Q1 => "Q1",
            QueryKind::Q2 => "Q2",
            QueryKind::Q3 => "Q3",
            QueryKind::Q4 => "Q4",
            QueryKind::Unknown => "UNKNOWN",
        }
    }
}

/// Clarification-flow kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExKind {
    /// Single-insurer explanation.
    Ex1Detail,
    /// Coverage-limit difference, self-contained.
    Ex2,
    /// Multi-insurer structural comparison.
    Ex3,
    /// Boundary/eligibility matrix.
    Ex4,
}

impl ExKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExKind::Ex1Detail => "EX1_DETAIL",
            ExKind::Ex2 => "EX2",
            ExKind::Ex3 => "EX3",
            ExKind::Ex4 => "EX4",
        }
    }
}

const EXPLAIN_WORDS: &[&str] = &["설명해", "설명", "알려줘", "알려주세요"];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Classify a message into a top-level query kind. Ordered decision list;
/// return on first match.
pub fn classify(raw: &str) -> QueryKind {
    let t = normalize(raw);

    // 1. Premium ranking: "보험료" plus a ranking/sorting signal.
    if t.contains("보험료")
        && (t.contains("저렴") || t.contains("정렬") || t.contains("top") || t.contains("순"))
    {
        return QueryKind::Q1;
    }

    // 2. Limit difference.
    if (t.contains("보장한도") || t.contains("한도")) && (t.contains("다른") || t.contains("차이")) {
        return QueryKind::Q2;
    }

    // 3. Comparison report.
    if (t.contains("비교") || t.contains("종합")) && (t.contains("진단") || t.contains("암")) {
        return QueryKind::Q3;
    }

    // 4. Support matrix.
    if t.contains("제자리암") || t.contains("경계성종양") || (t.contains("지원") && t.contains("여부")) {
        return QueryKind::Q4;
    }

    QueryKind::Unknown
}

/// Clarification-flow classifier. Explanation beats comparison unless
/// comparison words are present alongside it; eligibility beats the
/// self-contained limit-difference kind.
pub fn classify_ex(raw: &str) -> Option<ExKind> {
    let t = normalize(raw);

    let explain = contains_any(&t, EXPLAIN_WORDS);
    // The comparison signal here is the structural one (two insurers plus a
    // comparison word or 와/과 particle plus a resolvable coverage); a bare
    // "다른" without named insurers falls through to EX2.
    let compare = is_comparison_intent(raw);

    if explain && !compare {
        return Some(ExKind::Ex1Detail);
    }
    if compare {
        return Some(ExKind::Ex3);
    }
    if extract_disease_subtype(raw).is_some() || (t.contains("지원") && t.contains("여부")) {
        return Some(ExKind::Ex4);
    }
    if t.contains("담보중") || t.contains("보장한도가다른") {
        return Some(ExKind::Ex2);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q1_classification() {
        assert_eq!(classify("보험료 저렴한 순서로 top 4"), QueryKind::Q1);
        assert_eq!(classify("보험료 정렬해줘"), QueryKind::Q1);
    }

    #[test]
    fn test_q2_classification() {
        assert_eq!(classify("보장한도가 다른 상품 찾아줘"), QueryKind::Q2);
        assert_eq!(classify("한도 차이 알려줘"), QueryKind::Q2);
    }

    #[test]
    fn test_q3_classification() {
        assert_eq!(classify("삼성 메리츠 암진단비 비교"), QueryKind::Q3);
        assert_eq!(classify("종합 암보험 리포트"), QueryKind::Q3);
    }

    #[test]
    fn test_q4_classification() {
        assert_eq!(classify("제자리암 지원 여부"), QueryKind::Q4);
        assert_eq!(classify("경계성종양도 되나요"), QueryKind::Q4);
        assert_eq!(classify("갑상선암 지원 여부 알려줘"), QueryKind::Q4);
    }

    #[test]
    fn test_unknown_classification() {
        assert_eq!(classify("안녕하세요"), QueryKind::Unknown);
        assert_eq!(classify(""), QueryKind::Unknown);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let text = "보험료 저렴한 순서로 top 4";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        // Contains both Q1 signals (보험료+순) and Q3 signals (비교+암);
        // Q1 is checked first and must win.
        assert_eq!(classify("암보험 비교해서 보험료 저렴한 순으로"), QueryKind::Q1);
    }

    #[test]
    fn test_ex_explain_beats_comparison() {
        // Two insurers named, but the user asked for an explanation and no
        // comparison word is present.
        assert_eq!(classify_ex("삼성 암진단비 설명해줘"), Some(ExKind::Ex1Detail));
    }

    #[test]
    fn test_ex_comparison_when_compare_words_present() {
        assert_eq!(classify_ex("삼성과 메리츠 암진단비 비교 설명해줘"), Some(ExKind::Ex3));
        assert_eq!(classify_ex("삼성 메리츠 암진단비 차이"), Some(ExKind::Ex3));
    }

    #[test]
    fn test_ex_eligibility() {
        assert_eq!(classify_ex("제자리암도 되나요"), Some(ExKind::Ex4));
        assert_eq!(classify_ex("지원 여부 확인"), Some(ExKind::Ex4));
    }

    #[test]
    fn test_ex_limit_difference() {
        assert_eq!(classify_ex("담보 중 뭐가 좋아"), Some(ExKind::Ex2));
        assert_eq!(classify_ex("보장한도가 다른 담보"), Some(ExKind::Ex2));
    }

    #[test]
    fn test_ex_none() {
        assert_eq!(classify_ex("안녕"), None);
    }
}
