//! Slot extractors: free text to structured intent.
//!
//! Each extractor is a pure function `&str -> Option<T>`, tried
//! independently; the dialogue layer merges the resulting delta onto the
//! conversation's `SlotState` (new non-null wins, see `slots`). Matching
//! happens on [`text::normalize`] output unless a rule needs raw token
//! boundaries (standalone "m"/"f").
//!
//! Check order is part of the contract. The sex extractor evaluates male
//! patterns first, so ambiguous input resolves male; the age extractor
//! prefers an explicit decade token over a bucketed age.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog;
use crate::slots::{AgeBand, PlanVariantScope, PremiumMode, Sex, SlotState, SortBy};
use crate::text::normalize;

const MALE_WORDS: &[&str] = &["남자", "남성", "male", "남"];
const FEMALE_WORDS: &[&str] = &["여자", "여성", "female", "여"];

const SORT_TOTAL_WORDS: &[&str] = &["총납입", "전체납입", "총납"];
const SORT_MONTHLY_WORDS: &[&str] = &["월보험료", "월납", "매월"];

const SCOPE_ALL_WORDS: &[&str] = &["전체비교", "모두", "전부"];
const SCOPE_STANDARD_WORDS: &[&str] = &["일반만", "일반형만", "일반보험"];
const SCOPE_NO_REFUND_WORDS: &[&str] = &["무해지만", "무해지형만", "무해지보험"];

const MODE_TOTAL_WORDS: &[&str] = &["전체보험료", "총보험료", "전체", "총"];
const MODE_BY_COVERAGE_WORDS: &[&str] = &["담보별", "담보기준", "담보"];

/// Comparison keywords shared by intent detection and coverage-query
/// stripping.
const COMPARISON_WORDS: &[&str] = &["비교", "차이", "다른", "다르", "vs", "대"];

static AGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2})(대|세|살|년)?").unwrap());
static STANDALONE_M_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|[^a-z0-9])m([^a-z0-9]|$)").unwrap());
static STANDALONE_F_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|[^a-z0-9])f([^a-z0-9]|$)").unwrap());

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Extract sex. Male patterns are checked first; when both match, male
/// wins. That priority is check-order, kept literally (flagged in
/// DESIGN.md as an open product question).
pub fn extract_sex(raw: &str) -> Option<Sex> {
    let lower = raw.to_lowercase();
    let norm = normalize(raw);
    if contains_any(&norm, MALE_WORDS) || STANDALONE_M_RE.is_match(&lower) {
        return Some(Sex::M);
    }
    if contains_any(&norm, FEMALE_WORDS) || STANDALONE_F_RE.is_match(&lower) {
        return Some(Sex::F);
    }
    None
}

/// Extract age band. A direct decade token (`30대`/`40대`/`50대`) takes
/// precedence; otherwise a 2-digit number (optionally suffixed 세/살/년/대)
/// is bucketed: 20-34 → 30, 35-44 → 40, 45-80 → 50. Outside that range
/// there is no band.
pub fn extract_age_band(raw: &str) -> Option<AgeBand> {
    let norm = normalize(raw);
    for (token, band) in [
        ("30대", AgeBand::Band30),
        ("40대", AgeBand::Band40),
        ("50대", AgeBand::Band50),
    ] {
        if norm.contains(token) {
            return Some(band);
        }
    }
    let caps = AGE_RE.captures(&norm)?;
    let age: u32 = caps.get(1)?.as_str().parse().ok()?;
    match age {
        20..=34 => Some(AgeBand::Band30),
        35..=44 => Some(AgeBand::Band40),
        45..=80 => Some(AgeBand::Band50),
        _ => None,
    }
}

/// Extract the premium sort preference.
pub fn extract_sort_by(raw: &str) -> Option<SortBy> {
    let norm = normalize(raw);
    if contains_any(&norm, SORT_TOTAL_WORDS) {
        return Some(SortBy::Total);
    }
    if contains_any(&norm, SORT_MONTHLY_WORDS) {
        return Some(SortBy::Monthly);
    }
    None
}

/// Extract plan-variant scope. Q2 accepts a few extra colloquial forms
/// (둘다 / 일반으로 / 무해지로) the Q1 flow does not.
pub fn extract_plan_variant_scope(raw: &str, q2: bool) -> Option<PlanVariantScope> {
    let norm = normalize(raw);
    if contains_any(&norm, SCOPE_ALL_WORDS) || (q2 && norm.contains("둘다")) {
        return Some(PlanVariantScope::All);
    }
    if contains_any(&norm, SCOPE_STANDARD_WORDS) || (q2 && norm.contains("일반으로")) {
        return Some(PlanVariantScope::Standard);
    }
    if contains_any(&norm, SCOPE_NO_REFUND_WORDS) || (q2 && norm.contains("무해지로")) {
        return Some(PlanVariantScope::NoRefund);
    }
    None
}

/// Extract the premium mode (Q1 only). TOTAL keywords are checked before
/// BY_COVERAGE keywords.
pub fn extract_premium_mode(raw: &str) -> Option<PremiumMode> {
    let norm = normalize(raw);
    if contains_any(&norm, MODE_TOTAL_WORDS) {
        return Some(PremiumMode::Total);
    }
    if contains_any(&norm, MODE_BY_COVERAGE_WORDS) {
        return Some(PremiumMode::ByCoverage);
    }
    None
}

/// Words removed from raw text before treating the residue as a free-text
/// coverage query. Longest first so fragments of longer words survive as
/// themselves ("전체보험료" before "전체").
const COVERAGE_QUERY_STRIP_WORDS: &[&str] = &[
    "전체보험료",
    "총보험료",
    "월보험료",
    "보장한도",
    "전체납입",
    "총납입",
    "담보기준",
    "담보별",
    "비교해줘",
    "비교해서",
    "알려주세요",
    "보여줘",
    "찾아줘",
    "알려줘",
    "보험료",
    "비교해",
    "비교",
    "차이",
    "다른",
    "다르",
    "담보",
    "한도",
    "상품",
    "보험",
    "전체",
    "매월",
    "월납",
    "총납",
    "남성",
    "남자",
    "여성",
    "여자",
    "총",
];

static AGE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,3}\s*(대|세|살|년)?").unwrap());

/// Extract the free-text coverage query: strip every known slot keyword
/// from the raw text and keep whatever is left, if it is longer than one
/// character. Single leftover particles (로/을/를) fail the length gate on
/// their own.
pub fn extract_coverage_query(raw: &str) -> Option<String> {
    let mut residue = raw.to_lowercase();
    for word in COVERAGE_QUERY_STRIP_WORDS {
        residue = residue.replace(word, " ");
    }
    residue = AGE_TOKEN_RE.replace_all(&residue, " ").into_owned();

    // Stripping "담보별" out of "담보별로" leaves a detached particle; any
    // single-character token in the residue is noise, not query text.
    let cleaned = residue
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && !('\u{AC00}'..='\u{D7A3}').contains(&c)))
        .filter(|t| t.chars().count() > 1)
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.chars().count() > 1 {
        Some(cleaned)
    } else {
        None
    }
}

/// Extract insurer codes: every alias found in the normalized text, in
/// table-iteration order, deduplicated by code.
pub fn extract_insurers(raw: &str) -> Vec<String> {
    let norm = normalize(raw);
    let mut codes: Vec<String> = Vec::new();
    for (alias, code) in catalog::INSURER_ALIASES {
        if norm.contains(alias) && !codes.iter().any(|c| c == code) {
            codes.push((*code).to_string());
        }
    }
    codes
}

/// Extract a canonical coverage name: first pattern (longest-specific
/// first) with any keyword present wins.
pub fn extract_coverage_name(raw: &str) -> Option<&'static str> {
    let norm = normalize(raw);
    for (keywords, canonical) in catalog::COVERAGE_PATTERNS {
        if keywords.iter().any(|k| norm.contains(k)) {
            return Some(canonical);
        }
    }
    None
}

/// First matching disease subtype only. Some call sites want every match;
/// they use [`extract_disease_subtypes`]. The divergence mirrors the
/// per-call-site behavior of the flows this was built for and is
/// documented in DESIGN.md rather than unified.
pub fn extract_disease_subtype(raw: &str) -> Option<&'static str> {
    let norm = normalize(raw);
    catalog::DISEASE_SUBTYPES
        .iter()
        .find(|s| norm.contains(*s))
        .copied()
}

/// Every matching disease subtype, in table order.
pub fn extract_disease_subtypes(raw: &str) -> Vec<&'static str> {
    let norm = normalize(raw);
    catalog::DISEASE_SUBTYPES
        .iter()
        .filter(|s| norm.contains(*s))
        .copied()
        .collect()
}

/// Detect an insurer-switch utterance: a short message naming a single
/// different insurer ("메리츠는?", "그럼 한화는요", "삼성화재도?") that pivots
/// the conversation to that insurer while keeping every other slot.
pub fn detect_insurer_switch(raw: &str) -> Option<&'static str> {
    let mut norm = normalize(raw);
    if let Some(rest) = norm.strip_prefix("그럼") {
        norm = rest.to_string();
    }
    for (alias, code) in catalog::INSURER_ALIASES {
        if let Some(mut rest) = norm.strip_prefix(alias) {
            if let Some(r) = rest.strip_prefix("화재") {
                rest = r;
            }
            if matches!(rest, "" | "는" | "는요" | "도") {
                return Some(code);
            }
        }
    }
    None
}

/// Comparison intent: at least two insurers named, a comparison keyword or
/// a 와/과 particle present, and a coverage keyword resolvable. When true
/// the conversation hard-locks onto the two-insurer structural comparison
/// path and coverage reselection is suppressed.
pub fn is_comparison_intent(raw: &str) -> bool {
    let insurers = extract_insurers(raw);
    if insurers.len() < 2 {
        return false;
    }
    let norm = normalize(raw);
    let has_signal =
        contains_any(&norm, COMPARISON_WORDS) || norm.contains('와') || norm.contains('과');
    has_signal && extract_coverage_name(raw).is_some()
}

/// Q1 extraction pass: everything the premium-ranking flow can pick out of
/// one message. The coverage query is only meaningful in BY_COVERAGE mode,
/// so it is extracted only when that mode is (or just became) resolved.
pub fn extract_q1_slots(raw: &str, prior_mode: Option<PremiumMode>) -> SlotState {
    let premium_mode = extract_premium_mode(raw);
    let effective_mode = premium_mode.or(prior_mode);
    let coverage_query_text = if effective_mode == Some(PremiumMode::ByCoverage) {
        extract_coverage_query(raw)
    } else {
        None
    };
    SlotState {
        sex: extract_sex(raw),
        age_band: extract_age_band(raw),
        sort_by: extract_sort_by(raw),
        plan_variant_scope: extract_plan_variant_scope(raw, false),
        premium_mode,
        coverage_query_text,
        insurers: extract_insurers(raw),
        ..Default::default()
    }
}

/// Q2 extraction pass: the limit-difference flow always wants a coverage
/// query and accepts the Q2-only scope forms.
pub fn extract_q2_slots(raw: &str) -> SlotState {
    SlotState {
        sex: extract_sex(raw),
        age_band: extract_age_band(raw),
        sort_by: extract_sort_by(raw),
        plan_variant_scope: extract_plan_variant_scope(raw, true),
        premium_mode: None,
        coverage_query_text: extract_coverage_query(raw),
        insurers: extract_insurers(raw),
        ..Default::default()
    }
}

/// Extraction pass for the EX clarification flows: insurers, coverage
/// names, and disease subtypes (all matches; the EX4 completion check
/// reads the full list).
pub fn extract_ex_slots(raw: &str) -> SlotState {
    SlotState {
        insurers: extract_insurers(raw),
        coverage_names: extract_coverage_name(raw)
            .map(|n| vec![n.to_string()])
            .unwrap_or_default(),
        disease_subtypes: extract_disease_subtypes(raw)
            .into_iter()
            .map(str::to_string)
            .collect(),
        ..Default::default()
    }
}
