//! Fixed keyword tables.
//!
//! All Korean-name-to-code mappings live here as plain data so the matching
//! algorithms stay table-driven and each table can be unit-tested and
//! extended without touching control flow. Order matters in every table:
//! extractors iterate top to bottom and earlier entries win.

/// Insurer alias table: Korean name (or romanized fragment) to internal code.
///
/// Iteration order is the collection order for multi-insurer extraction, and
/// aliases for the same insurer are adjacent with the long form first so a
/// match on "삼성화재" does not double-count via "삼성".
pub const INSURER_ALIASES: &[(&str, &str)] = &[
    ("삼성화재", "samsung"),
    ("삼성", "samsung"),
    ("메리츠화재", "meritz"),
    ("메리츠", "meritz"),
    ("한화손해보험", "hanwha"),
    ("한화", "hanwha"),
    ("현대해상", "hyundai"),
    ("현대", "hyundai"),
    ("kb손해보험", "kb"),
    ("kb", "kb"),
    ("롯데손해보험", "lotte"),
    ("롯데", "lotte"),
    // 홍국 is a common misspelling of 흥국; both map to the same code.
    ("흥국화재", "heungkuk"),
    ("흥국", "heungkuk"),
    ("홍국화재", "heungkuk"),
    ("홍국", "heungkuk"),
];

/// Internal code / backend short code / backend enum name.
///
/// The comparison endpoint only accepts enum names; short codes (`N01`…)
/// appear in backend payloads and must be translated before any request.
pub const INSURER_CODES: &[(&str, &str, &str)] = &[
    ("meritz", "N01", "MERITZ"),
    ("hanwha", "N02", "HANWHA"),
    ("lotte", "N03", "LOTTE"),
    ("heungkuk", "N04", "HEUNGKUK"),
    ("samsung", "N05", "SAMSUNG"),
    ("hyundai", "N06", "HYUNDAI"),
    ("kb", "N07", "KB"),
];

/// Coverage name patterns, longest-specific-first. The first pattern with
/// any keyword present in the normalized text wins.
pub const COVERAGE_PATTERNS: &[(&[&str], &str)] = &[
    (&["암진단비유사암제외", "유사암제외암진단비"], "암진단비(유사암제외)"),
    (&["암직접입원비", "암직접치료입원비", "직접입원비"], "암직접입원비"),
    (&["암수술비", "암수술급여금"], "암수술비"),
    (&["항암방사선약물치료비", "항암치료비"], "항암방사선약물치료비"),
    (&["암통원비", "암통원일당"], "암통원비"),
    (&["유사암진단비"], "유사암진단비"),
    (&["암진단비"], "암진단비"),
];

/// Disease subtypes in fixed priority order.
pub const DISEASE_SUBTYPES: &[&str] = &[
    "제자리암",
    "경계성종양",
    "유사암",
    "기타피부암",
    "갑상선암",
    "대장점막내암",
];

/// Evidence document-type priority weights. Unknown types score 0.
pub const DOC_TYPE_PRIORITY: &[(&str, f64)] = &[
    ("가입설계서", 40.0),
    ("사업방법서", 30.0),
    ("약관", 20.0),
    ("상품요약서", 10.0),
];

/// Per-slot evidence keywords: an excerpt mentioning one of these is
/// strongly relevant to that slot.
pub const SLOT_EVIDENCE_KEYWORDS: &[(&str, &[&str])] = &[
    ("보장한도", &["보장한도", "한도", "가입금액", "보상한도"]),
    ("보험료", &["보험료", "납입", "월납", "총납"]),
    ("지급조건", &["지급", "조건", "지급사유", "면책"]),
    ("지원여부", &["지원", "여부", "보장", "담보"]),
];

/// Look up the internal code for an insurer alias, if the alias is known.
pub fn code_for_alias(alias: &str) -> Option<&'static str> {
    INSURER_ALIASES
        .iter()
        .find(|(a, _)| *a == alias)
        .map(|(_, code)| *code)
}

/// Translate an internal code or a backend short code to the enum name the
/// comparison endpoint expects.
pub fn enum_name_for(code: &str) -> Option<&'static str> {
    INSURER_CODES
        .iter()
        .find(|(c, short, _)| *c == code || *short == code)
        .map(|(_, _, name)| *name)
}

/// Priority weight for an evidence document type.
pub fn doc_type_weight(doc_type: &str) -> f64 {
    DOC_TYPE_PRIORITY
        .iter()
        .find(|(t, _)| *t == doc_type)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// Evidence keywords for a slot name. Falls back to the slot name itself so
/// ranking still has a signal for slots without a curated list.
pub fn evidence_keywords(slot_name: &str) -> Vec<&str> {
    SLOT_EVIDENCE_KEYWORDS
        .iter()
        .find(|(s, _)| *s == slot_name)
        .map(|(_, kws)| kws.to_vec())
        .unwrap_or_else(|| vec![slot_name])
}
