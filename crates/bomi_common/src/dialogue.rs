//! Conversation state machine.
//!
//! One `ChatState` per conversation, owned by the caller and passed into
//! each turn. Turn handling is split in two so every transition is testable
//! without a network:
//!
//! - [`plan_turn`] is pure: merge the message's slots, classify, check
//!   completeness, and decide what should happen next ([`TurnPlan`]).
//! - [`run_turn`] drives a plan against the backend client and converts
//!   failures into the `Error` phase. Backend errors never unwind through
//!   parsing or normalization; the user sees a generic Korean message.
//!
//! Phases: idle → collecting_slots → (selecting_candidate) → executing →
//! completed | error. Completed and error conversations accept new queries
//! with slots intact.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{CompareClient, CompareResponse, CoverageCandidate};
use crate::catalog;
use crate::clarify::{self, ClarificationPrompt, ClarifyTarget};
use crate::classify::{classify, classify_ex, ExKind, QueryKind};
use crate::config::BomiConfig;
use crate::error::BomiError;
use crate::extract;
use crate::slots::{PlanVariantScope, PremiumMode, Sex, SlotState, SortBy};
use crate::table::normalize_table_section;
use crate::view::{
    build_q1_vm, build_report_vm, build_support_matrix_vm, AssistantMessageVm, ChatMessage,
};

/// Example queries offered when a message cannot be routed.
pub const EXAMPLE_QUERIES: &[&str] = &[
    "보험료 저렴한 순서로 top 4",
    "보장한도가 다른 상품 찾아줘",
    "삼성 메리츠 암진단비 비교",
    "제자리암 지원 여부",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPhase {
    Idle,
    CollectingSlots,
    SelectingCandidate,
    Executing,
    Completed,
    Error,
}

/// Owned, serializable conversation state. No implicit closures; replaying
/// the same messages over a fresh state reproduces the same transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatState {
    pub conversation_id: Uuid,
    pub phase: ChatPhase,
    pub kind: Option<QueryKind>,
    pub ex_kind: Option<ExKind>,
    pub slots: SlotState,
    #[serde(default)]
    pub pending_candidates: Vec<CoverageCandidate>,
    pub selected_coverage: Option<CoverageCandidate>,
    /// Insurers named in the most recent message only. EX4 reads this
    /// instead of the locked context.
    #[serde(default)]
    pub last_turn_insurers: Vec<String>,
    #[serde(default)]
    pub transcript: Vec<ChatMessage>,
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            conversation_id: Uuid::new_v4(),
            phase: ChatPhase::Idle,
            kind: None,
            ex_kind: None,
            slots: SlotState::new(),
            pending_candidates: Vec::new(),
            selected_coverage: None,
            last_turn_insurers: Vec::new(),
            transcript: Vec::new(),
        }
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

/// A backend request the planner decided to issue.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    PremiumRanking {
        age: u8,
        sex: Sex,
        plan_variant: PlanVariantScope,
        sort_by: SortBy,
    },
    Compare {
        coverage_code: Option<String>,
        age: u8,
        sex: Sex,
        insurers: Vec<String>,
        coverage_codes: Vec<String>,
        sort_by: Option<SortBy>,
        scope: Option<PlanVariantScope>,
    },
    CoverageDetail {
        insurers: Vec<String>,
        coverage_codes: Vec<String>,
    },
    SupportMatrix {
        insurers: Vec<String>,
    },
}

/// What the planner decided for this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPlan {
    /// Ask for the listed missing slots and wait.
    Clarify(ClarificationPrompt),
    /// Resolve a free-text coverage query into a coverage code first.
    SearchCandidates { query: String },
    /// Issue a backend request.
    Execute(BackendCall),
    /// Plain reply (unroutable message, candidate re-prompt).
    Reply(String),
}

/// Result of the 0/1/N candidate flow.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateAction {
    ShowError(String),
    AutoSelect(CoverageCandidate),
    PresentChoices(Vec<CoverageCandidate>),
}

/// Everything one turn produced for the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct TurnOutput {
    pub messages: Vec<ChatMessage>,
    pub view_model: Option<AssistantMessageVm>,
    pub clarification: Option<ClarificationPrompt>,
}

static CHOICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Parse a numeric candidate-selection reply. Only `^\d+$` within
/// `1..=count` is accepted; anything else means re-prompt.
pub fn parse_choice_reply(text: &str, count: usize) -> Option<usize> {
    let trimmed = text.trim();
    if !CHOICE_RE.is_match(trimmed) {
        return None;
    }
    let n: usize = trimmed.parse().ok()?;
    if (1..=count).contains(&n) {
        Some(n)
    } else {
        None
    }
}

/// Decide the action for a candidate list: error on none, auto-select a
/// single hit, otherwise present a numbered choice list.
pub fn resolve_candidates(mut candidates: Vec<CoverageCandidate>) -> CandidateAction {
    if candidates.len() > 1 {
        return CandidateAction::PresentChoices(candidates);
    }
    match candidates.pop() {
        Some(only) => CandidateAction::AutoSelect(only),
        None => CandidateAction::ShowError("해당 담보를 찾을 수 없습니다.".to_string()),
    }
}

/// Format the numbered candidate menu.
pub fn format_choices(candidates: &[CoverageCandidate]) -> String {
    let mut lines = vec!["어떤 담보를 말씀하시는 건가요?".to_string()];
    for (i, c) in candidates.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, c.canonical_name));
    }
    lines.push(format!("번호로 답해주세요 (1-{})", candidates.len()));
    lines.join("\n")
}

fn example_query_block() -> String {
    let mut lines = vec!["이런 질문을 해보세요:".to_string()];
    for example in EXAMPLE_QUERIES {
        lines.push(format!("  • {}", example));
    }
    lines.join("\n")
}

fn unroutable_reply() -> String {
    format!("질문을 이해하지 못했습니다. {}", example_query_block())
}

fn all_insurer_codes() -> Vec<String> {
    catalog::INSURER_CODES
        .iter()
        .map(|(code, _, _)| (*code).to_string())
        .collect()
}

/// Merge this turn's extraction into the state and decide what to do.
/// Pure: no I/O, deterministic for a given (state, text) pair.
pub fn plan_turn(state: &mut ChatState, text: &str) -> TurnPlan {
    state.transcript.push(ChatMessage::user(text));

    // A pending candidate menu consumes the message first.
    if state.phase == ChatPhase::SelectingCandidate {
        let count = state.pending_candidates.len();
        return match parse_choice_reply(text, count) {
            Some(n) => {
                let selected = state.pending_candidates[n - 1].clone();
                state.pending_candidates.clear();
                state.selected_coverage = Some(selected);
                state.phase = ChatPhase::Executing;
                next_execution(state)
            }
            // Invalid reply: re-prompt, state untouched.
            None => TurnPlan::Reply(format!(
                "1에서 {} 사이의 번호로 답해주세요.",
                count
            )),
        };
    }

    // Insurer-switch pivot: keep every other slot, swap the insurer set.
    if let Some(code) = extract::detect_insurer_switch(text) {
        if !state.slots.insurers.iter().any(|c| c == code) {
            state.slots.pivot_insurer(code);
            if state.kind.is_some() {
                state.phase = ChatPhase::Executing;
                return next_execution(state);
            }
        }
    }

    // Classify. A comparison-intent message hard-locks the EX3 path and
    // suppresses coverage reselection.
    let turn_insurers = extract::extract_insurers(text);
    state.last_turn_insurers = turn_insurers.clone();
    if extract::is_comparison_intent(text) {
        state.ex_kind = Some(ExKind::Ex3);
        state.kind = Some(QueryKind::Q3);
    } else {
        let kind = classify(text);
        if kind != QueryKind::Unknown {
            state.kind = Some(kind);
            // The EX classifier only refines the EX-routed kinds; Q1/Q2
            // run their own slot tables.
            state.ex_kind = match kind {
                QueryKind::Q3 => classify_ex(text).or(Some(ExKind::Ex3)),
                QueryKind::Q4 => Some(ExKind::Ex4),
                _ => None,
            };
        } else if state.kind.is_none() {
            // Not routable at the top level; the EX classifier may still
            // recognize an explanation/eligibility request.
            match classify_ex(text) {
                Some(ex) => {
                    state.ex_kind = Some(ex);
                    state.kind = Some(match ex {
                        ExKind::Ex1Detail | ExKind::Ex3 => QueryKind::Q3,
                        ExKind::Ex2 => QueryKind::Q2,
                        ExKind::Ex4 => QueryKind::Q4,
                    });
                }
                None => return TurnPlan::Reply(unroutable_reply()),
            }
        }
    }

    // Extract and merge this turn's slots for the active flow.
    let kind = match state.kind {
        Some(kind) => kind,
        None => return TurnPlan::Reply(unroutable_reply()),
    };
    let delta = match kind {
        QueryKind::Q1 => extract::extract_q1_slots(text, state.slots.premium_mode),
        QueryKind::Q2 => extract::extract_q2_slots(text),
        _ => extract::extract_ex_slots(text),
    };
    // A new free-text coverage query reopens candidate resolution; a
    // resolved selection is otherwise terminal.
    if let Some(new_query) = &delta.coverage_query_text {
        if state.slots.coverage_query_text.as_deref() != Some(new_query.as_str()) {
            state.selected_coverage = None;
        }
    }
    state.slots.merge(delta);

    // Completeness per flow.
    let target = match (kind, state.ex_kind) {
        (QueryKind::Q1, _) => ClarifyTarget::Q1,
        (QueryKind::Q2, Some(ExKind::Ex2)) => ClarifyTarget::Ex(ExKind::Ex2),
        (QueryKind::Q2, _) => ClarifyTarget::Q2,
        (QueryKind::Q4, _) => ClarifyTarget::Ex(ExKind::Ex4),
        (_, Some(ex)) => ClarifyTarget::Ex(ex),
        (QueryKind::Q3, None) => ClarifyTarget::Ex(ExKind::Ex3),
        (QueryKind::Unknown, None) => return TurnPlan::Reply(unroutable_reply()),
    };

    let missing = clarify::missing_slots(target, &state.slots, &turn_insurers);
    if let Some(prompt) = clarify::build_prompt(missing) {
        state.phase = ChatPhase::CollectingSlots;
        return TurnPlan::Clarify(prompt);
    }

    state.phase = ChatPhase::Executing;
    next_execution(state)
}

/// Slots are complete: either resolve the coverage query or build the
/// backend call for the active flow.
fn next_execution(state: &mut ChatState) -> TurnPlan {
    let kind = state.kind.unwrap_or(QueryKind::Unknown);

    // Flows that work from a free-text coverage query resolve it to a
    // coverage code before executing.
    let needs_candidate = match kind {
        QueryKind::Q1 => state.slots.premium_mode == Some(PremiumMode::ByCoverage),
        QueryKind::Q2 => state.ex_kind != Some(ExKind::Ex2),
        _ => false,
    };
    if needs_candidate && state.selected_coverage.is_none() {
        if let Some(query) = state.slots.coverage_query_text.clone() {
            return TurnPlan::SearchCandidates { query };
        }
    }

    let age = state.slots.age_band.map(|b| b.decade()).unwrap_or(40);
    let sex = state.slots.sex.unwrap_or(Sex::M);
    let scope = state.slots.plan_variant_scope;
    let coverage_code = state
        .selected_coverage
        .as_ref()
        .map(|c| c.coverage_code.clone());
    // Population-level flows span the full roster when the user named
    // fewer insurers than the comparison endpoint accepts.
    let insurers = if state.slots.insurers.len() >= 2 {
        state.slots.insurers.clone()
    } else {
        all_insurer_codes()
    };

    let call = match kind {
        QueryKind::Q1 => match state.slots.premium_mode {
            Some(PremiumMode::ByCoverage) => BackendCall::Compare {
                coverage_code,
                age,
                sex,
                insurers,
                coverage_codes: Vec::new(),
                sort_by: Some(state.slots.sort_by.unwrap_or(SortBy::Total)),
                scope,
            },
            _ => BackendCall::PremiumRanking {
                age,
                sex,
                plan_variant: scope.unwrap_or(PlanVariantScope::All),
                sort_by: state.slots.sort_by.unwrap_or(SortBy::Total),
            },
        },
        QueryKind::Q2 => BackendCall::Compare {
            coverage_code,
            age,
            sex,
            insurers,
            coverage_codes: Vec::new(),
            sort_by: None,
            scope,
        },
        // EX4 reads the insurers named in this message, never locked context.
        QueryKind::Q4 => BackendCall::SupportMatrix {
            insurers: if state.last_turn_insurers.is_empty() {
                state.slots.insurers.clone()
            } else {
                state.last_turn_insurers.clone()
            },
        },
        _ => match state.ex_kind {
            Some(ExKind::Ex1Detail) => BackendCall::CoverageDetail {
                insurers: state.slots.insurers.clone(),
                coverage_codes: state.slots.coverage_names.clone(),
            },
            // A pivot can leave a single insurer on the comparison path;
            // that renders as a single-insurer detail, not a comparison.
            _ if state.slots.insurers.len() < 2 => BackendCall::CoverageDetail {
                insurers: state.slots.insurers.clone(),
                coverage_codes: state.slots.coverage_names.clone(),
            },
            _ => BackendCall::Compare {
                coverage_code,
                age,
                sex,
                insurers: state.slots.insurers.clone(),
                coverage_codes: state.slots.coverage_names.clone(),
                sort_by: None,
                scope,
            },
        },
    };
    TurnPlan::Execute(call)
}

/// Drive one turn end to end: plan, then execute against the backend.
/// All failures land in the `Error` phase with a user-facable message; this
/// function never returns `Err` for backend trouble.
pub async fn run_turn(
    state: &mut ChatState,
    text: &str,
    client: &CompareClient,
    config: &BomiConfig,
) -> TurnOutput {
    let mut plan = plan_turn(state, text);
    let mut output = TurnOutput::default();

    // Candidate search may chain into an execution, so loop.
    loop {
        match plan {
            TurnPlan::Clarify(prompt) => {
                let message = ChatMessage::assistant(prompt.question.clone());
                state.transcript.push(message.clone());
                output.messages.push(message);
                output.clarification = Some(prompt);
                return output;
            }
            TurnPlan::Reply(reply) => {
                let message = ChatMessage::assistant(reply);
                state.transcript.push(message.clone());
                output.messages.push(message);
                return output;
            }
            TurnPlan::SearchCandidates { query } => {
                match client
                    .search_candidates(&query, config.chat.max_candidates)
                    .await
                {
                    Ok(response) => match resolve_candidates(response.candidates) {
                        CandidateAction::ShowError(reason) => {
                            state.phase = ChatPhase::Idle;
                            plan = TurnPlan::Reply(format!("{}\n{}", reason, example_query_block()));
                        }
                        CandidateAction::AutoSelect(candidate) => {
                            tracing::debug!(code = %candidate.coverage_code, "auto-selected candidate");
                            state.selected_coverage = Some(candidate);
                            state.phase = ChatPhase::Executing;
                            plan = next_execution(state);
                        }
                        CandidateAction::PresentChoices(candidates) => {
                            let menu = format_choices(&candidates);
                            state.pending_candidates = candidates;
                            state.phase = ChatPhase::SelectingCandidate;
                            plan = TurnPlan::Reply(menu);
                        }
                    },
                    Err(e) => {
                        plan = fail(state, e);
                    }
                }
            }
            TurnPlan::Execute(call) => {
                plan = match execute_call(state, call, client, config).await {
                    Ok(vm) => {
                        state.phase = ChatPhase::Completed;
                        output.view_model = Some(vm);
                        TurnPlan::Reply("결과를 정리했어요.".to_string())
                    }
                    Err(e) => fail(state, e),
                };
            }
        }
    }
}

fn fail(state: &mut ChatState, error: BomiError) -> TurnPlan {
    tracing::warn!(code = error.code(), "turn failed: {}", error);
    state.phase = ChatPhase::Error;
    TurnPlan::Reply(error.user_message())
}

async fn execute_call(
    state: &ChatState,
    call: BackendCall,
    client: &CompareClient,
    config: &BomiConfig,
) -> Result<AssistantMessageVm, BomiError> {
    let as_of_date = config.chat.as_of_date.as_deref();
    match call {
        BackendCall::PremiumRanking {
            age,
            sex,
            plan_variant,
            sort_by,
        } => {
            let response = client
                .premium_ranking(age, sex, plan_variant, sort_by, config.chat.top_n, as_of_date)
                .await?;
            let title = format!(
                "{}대 {} 보험료 순위",
                age,
                if sex == Sex::M { "남성" } else { "여성" }
            );
            Ok(build_q1_vm(&response, title))
        }
        BackendCall::Compare {
            coverage_code,
            age,
            sex,
            insurers,
            coverage_codes,
            sort_by,
            scope,
        } => {
            let response = client
                .compare(
                    coverage_code.as_deref(),
                    age,
                    sex,
                    &insurers,
                    &coverage_codes,
                    sort_by,
                    scope,
                    as_of_date,
                )
                .await?;
            let kind = state.kind.unwrap_or(QueryKind::Q3);
            let title = state
                .selected_coverage
                .as_ref()
                .map(|c| c.canonical_name.clone())
                .or_else(|| state.slots.coverage_names.first().cloned())
                .unwrap_or_else(|| "비교 결과".to_string());
            Ok(build_compare_vm(kind, title, &response))
        }
        BackendCall::CoverageDetail {
            insurers,
            coverage_codes,
        } => {
            let response = client.coverage_detail(&insurers, &coverage_codes).await?;
            let title = coverage_codes
                .first()
                .cloned()
                .unwrap_or_else(|| "담보 설명".to_string());
            Ok(build_compare_vm(QueryKind::Q3, title, &response))
        }
        BackendCall::SupportMatrix { insurers } => {
            let response = client.support_matrix(&insurers).await?;
            Ok(build_support_matrix_vm(&response))
        }
    }
}

/// Normalize a comparison response into report sections.
fn build_compare_vm(kind: QueryKind, title: String, response: &CompareResponse) -> AssistantMessageVm {
    let mut sections = Vec::new();
    for section in &response.sections {
        sections.push(normalize_table_section(section));
    }
    if sections.is_empty() && !response.insurer_rows.is_null() {
        sections.push(normalize_table_section(&serde_json::json!({
            "title": title.clone(),
            "rows": response.insurer_rows,
        })));
    }
    build_report_vm(kind, title, sections, response.q12_report.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(code: &str, name: &str) -> CoverageCandidate {
        CoverageCandidate {
            coverage_code: code.to_string(),
            canonical_name: name.to_string(),
            score: None,
            confidence: None,
            match_reason: None,
        }
    }

    #[test]
    fn test_resolve_zero_candidates_is_error() {
        assert!(matches!(
            resolve_candidates(vec![]),
            CandidateAction::ShowError(_)
        ));
    }

    #[test]
    fn test_resolve_single_candidate_auto_selects() {
        let action = resolve_candidates(vec![candidate("C001", "암직접입원비")]);
        let CandidateAction::AutoSelect(c) = action else {
            panic!("expected auto-select");
        };
        assert_eq!(c.coverage_code, "C001");
    }

    #[test]
    fn test_resolve_many_presents_choices() {
        let action = resolve_candidates(vec![
            candidate("C001", "암직접입원비"),
            candidate("C002", "암진단비"),
            candidate("C003", "암수술비"),
        ]);
        assert!(matches!(action, CandidateAction::PresentChoices(c) if c.len() == 3));
    }

    #[test]
    fn test_parse_choice_reply() {
        assert_eq!(parse_choice_reply("2", 3), Some(2));
        assert_eq!(parse_choice_reply(" 3 ", 3), Some(3));
        assert_eq!(parse_choice_reply("0", 3), None);
        assert_eq!(parse_choice_reply("4", 3), None);
        assert_eq!(parse_choice_reply("둘", 3), None);
        assert_eq!(parse_choice_reply("1번", 3), None);
    }

    #[test]
    fn test_q1_flow_to_ranking_call() {
        let mut state = ChatState::new();
        let plan = plan_turn(&mut state, "보험료 저렴한 순서로 top 4");
        // No sex/age yet: clarification.
        let TurnPlan::Clarify(prompt) = plan else {
            panic!("expected clarification");
        };
        assert_eq!(state.phase, ChatPhase::CollectingSlots);
        assert!(prompt.question.contains("성별"));

        // Follow-up supplies the rest; premium mode defaults are not
        // assumed - 전체 resolves TOTAL.
        let plan = plan_turn(&mut state, "40대 남성 전체 기준");
        assert_eq!(
            plan,
            TurnPlan::Execute(BackendCall::PremiumRanking {
                age: 40,
                sex: Sex::M,
                plan_variant: PlanVariantScope::All,
                sort_by: SortBy::Total,
            })
        );
        assert_eq!(state.phase, ChatPhase::Executing);
    }

    #[test]
    fn test_q1_never_reasks_resolved_slot() {
        let mut state = ChatState::new();
        plan_turn(&mut state, "보험료 저렴한 순 40대");
        let plan = plan_turn(&mut state, "아직 모르겠어요");
        let TurnPlan::Clarify(prompt) = plan else {
            panic!("expected clarification");
        };
        // Age was resolved on turn 1 and must not be asked again.
        assert!(!prompt.question.contains("연령대"));
        assert!(prompt.question.contains("성별"));
    }

    #[test]
    fn test_q2_flow_reaches_candidate_search() {
        let mut state = ChatState::new();
        plan_turn(&mut state, "보장한도가 다른 상품 찾아줘");
        let plan = plan_turn(&mut state, "암직접입원비 40대 남자");
        assert_eq!(
            plan,
            TurnPlan::SearchCandidates {
                query: "암직접입원비".to_string()
            }
        );
    }

    #[test]
    fn test_candidate_selection_turn() {
        let mut state = ChatState::new();
        plan_turn(&mut state, "보장한도가 다른 상품 찾아줘");
        plan_turn(&mut state, "암직접입원비 40대 남자");
        state.pending_candidates = vec![
            candidate("C001", "암직접입원비"),
            candidate("C002", "암직접치료입원비"),
            candidate("C003", "암통원비"),
        ];
        state.phase = ChatPhase::SelectingCandidate;

        // Out-of-range reply re-prompts without touching state.
        let plan = plan_turn(&mut state, "5");
        assert!(matches!(plan, TurnPlan::Reply(_)));
        assert_eq!(state.phase, ChatPhase::SelectingCandidate);
        assert_eq!(state.pending_candidates.len(), 3);

        // Valid reply selects and proceeds to execution.
        let plan = plan_turn(&mut state, "2");
        assert_eq!(state.phase, ChatPhase::Executing);
        assert_eq!(
            state.selected_coverage.as_ref().unwrap().coverage_code,
            "C002"
        );
        assert!(matches!(plan, TurnPlan::Execute(BackendCall::Compare { .. })));
    }

    #[test]
    fn test_comparison_intent_locks_ex3() {
        let mut state = ChatState::new();
        let plan = plan_turn(&mut state, "삼성화재와 메리츠화재 암진단비 비교");
        assert_eq!(state.ex_kind, Some(ExKind::Ex3));
        assert_eq!(state.slots.insurers, vec!["samsung", "meritz"]);
        // Two insurers and a coverage name: complete, straight to compare.
        let TurnPlan::Execute(BackendCall::Compare { insurers, .. }) = plan else {
            panic!("expected compare execution");
        };
        assert_eq!(insurers, vec!["samsung", "meritz"]);
    }

    #[test]
    fn test_ex1_explanation_single_insurer() {
        let mut state = ChatState::new();
        let plan = plan_turn(&mut state, "삼성 암진단비 설명해줘");
        assert_eq!(state.ex_kind, Some(ExKind::Ex1Detail));
        assert_eq!(
            plan,
            TurnPlan::Execute(BackendCall::CoverageDetail {
                insurers: vec!["samsung".to_string()],
                coverage_codes: vec!["암진단비".to_string()],
            })
        );
    }

    #[test]
    fn test_ex4_requires_current_turn_insurer() {
        let mut state = ChatState::new();
        // Lock an insurer in a prior conversation context.
        state.slots.insurers = vec!["samsung".to_string()];

        let plan = plan_turn(&mut state, "제자리암 지원 여부");
        // EX4 refuses the locked context; it wants an insurer in this message.
        let TurnPlan::Clarify(prompt) = plan else {
            panic!("expected clarification");
        };
        assert!(prompt.question.contains("보험사"));

        let plan = plan_turn(&mut state, "메리츠 제자리암 지원 여부");
        assert!(matches!(
            plan,
            TurnPlan::Execute(BackendCall::SupportMatrix { .. })
        ));
    }

    #[test]
    fn test_insurer_switch_pivots_and_reexecutes() {
        let mut state = ChatState::new();
        plan_turn(&mut state, "삼성화재와 메리츠화재 암진단비 비교");
        state.phase = ChatPhase::Completed;

        let plan = plan_turn(&mut state, "그럼 한화는?");
        assert_eq!(state.slots.insurers, vec!["hanwha"]);
        // Other slots kept; the flow re-executes with the new insurer.
        assert!(!state.slots.coverage_names.is_empty());
        assert!(matches!(plan, TurnPlan::Execute(_)));
    }

    #[test]
    fn test_unroutable_message_suggests_examples() {
        let mut state = ChatState::new();
        let plan = plan_turn(&mut state, "오늘 날씨 어때");
        let TurnPlan::Reply(reply) = plan else {
            panic!("expected reply");
        };
        assert!(reply.contains("보험료 저렴한 순서로 top 4"));
        // Conversation remains usable.
        assert_eq!(state.phase, ChatPhase::Idle);
    }

    #[test]
    fn test_new_coverage_query_reopens_selection() {
        let mut state = ChatState::new();
        plan_turn(&mut state, "보장한도가 다른 상품 찾아줘");
        plan_turn(&mut state, "암직접입원비 40대 남자");
        state.selected_coverage = Some(candidate("C001", "암직접입원비"));
        state.phase = ChatPhase::Completed;

        let plan = plan_turn(&mut state, "암수술비 한도 차이는?");
        assert_eq!(state.selected_coverage, None);
        assert!(matches!(plan, TurnPlan::SearchCandidates { .. }));
    }

    #[tokio::test]
    async fn test_backend_failure_lands_in_error_phase() {
        // Nothing listens here; the request fails immediately and the
        // failure must surface as an error-phase Korean message, not a
        // panic or an Err.
        let mut config = BomiConfig::default();
        config.backend.base_url = "http://127.0.0.1:9".to_string();
        config.backend.timeout_secs = 1;
        let client = CompareClient::new(&config).unwrap();

        let mut state = ChatState::new();
        let output = run_turn(&mut state, "보험료 저렴한 순 40대 남성 전체 기준", &client, &config).await;

        assert_eq!(state.phase, ChatPhase::Error);
        assert!(output.view_model.is_none());
        assert!(output.messages[0].content.contains("오류"));

        // The conversation stays usable: slots survived the failure.
        assert_eq!(state.slots.age_band.map(|b| b.decade()), Some(40));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let script = [
            "보험료 저렴한 순서로 top 4",
            "40대 남성",
            "전체 기준",
        ];
        let mut a = ChatState::new();
        let mut b = ChatState::new();
        for msg in script {
            let plan_a = plan_turn(&mut a, msg);
            let plan_b = plan_turn(&mut b, msg);
            assert_eq!(plan_a, plan_b);
        }
        assert_eq!(a.phase, b.phase);
        assert_eq!(a.slots, b.slots);
    }
}
