//! Slot-completeness rules and clarification prompts.
//!
//! After each turn's merge the dialogue asks: for the detected query kind,
//! which required slots are still unresolved? Only those may be asked for -
//! a slot with a resolved value (from payload, locked context, or parsed
//! text) is never requested again in the same conversation. EX4 is the one
//! deliberate exception: its insurers must come from the current message,
//! locked context does not count.

use serde::{Deserialize, Serialize};

use crate::classify::ExKind;
use crate::slots::{PremiumMode, SlotState};

/// What a clarification turn is allowed to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSlot {
    Sex,
    AgeBand,
    PremiumMode,
    CoverageQuery,
    /// Need at least this many insurers.
    Insurers(usize),
    CoverageName,
    DiseaseSubtype,
}

/// The flows that run slot-completeness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarifyTarget {
    Q1,
    Q2,
    Ex(ExKind),
}

/// A clarification prompt plus the slots it asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationPrompt {
    pub question: String,
    pub missing: Vec<MissingSlot>,
}

/// Compute the unresolved required slots for a target.
///
/// `turn_insurers` is the insurer set extracted from the current message
/// alone; only EX4 reads it (no context fallback there, by rule).
pub fn missing_slots(
    target: ClarifyTarget,
    state: &SlotState,
    turn_insurers: &[String],
) -> Vec<MissingSlot> {
    let mut missing = Vec::new();
    match target {
        ClarifyTarget::Q1 => {
            if state.sex.is_none() {
                missing.push(MissingSlot::Sex);
            }
            if state.age_band.is_none() {
                missing.push(MissingSlot::AgeBand);
            }
            if state.premium_mode.is_none() {
                missing.push(MissingSlot::PremiumMode);
            }
            if state.premium_mode == Some(PremiumMode::ByCoverage)
                && state.coverage_query_text.is_none()
            {
                missing.push(MissingSlot::CoverageQuery);
            }
        }
        ClarifyTarget::Q2 => {
            if state.coverage_query_text.is_none() {
                missing.push(MissingSlot::CoverageQuery);
            }
            if state.sex.is_none() {
                missing.push(MissingSlot::Sex);
            }
            if state.age_band.is_none() {
                missing.push(MissingSlot::AgeBand);
            }
        }
        ClarifyTarget::Ex(ExKind::Ex1Detail) => {
            if state.insurers.is_empty() {
                missing.push(MissingSlot::Insurers(1));
            }
            if state.coverage_names.is_empty() {
                missing.push(MissingSlot::CoverageName);
            }
        }
        ClarifyTarget::Ex(ExKind::Ex3) => {
            if state.insurers.len() < 2 {
                missing.push(MissingSlot::Insurers(2));
            }
            if state.coverage_names.is_empty() {
                missing.push(MissingSlot::CoverageName);
            }
        }
        // EX2 is self-contained; it never asks for anything.
        ClarifyTarget::Ex(ExKind::Ex2) => {}
        ClarifyTarget::Ex(ExKind::Ex4) => {
            // Insurers must be named in this message; a coverage name is
            // never required and must not gate completion.
            if turn_insurers.is_empty() {
                missing.push(MissingSlot::Insurers(1));
            }
            if state.disease_subtypes.is_empty() {
                missing.push(MissingSlot::DiseaseSubtype);
            }
        }
    }
    missing
}

pub fn is_complete(target: ClarifyTarget, state: &SlotState, turn_insurers: &[String]) -> bool {
    missing_slots(target, state, turn_insurers).is_empty()
}

fn slot_question(slot: &MissingSlot) -> &'static str {
    match slot {
        MissingSlot::Sex => "성별을 알려주세요 (남/여)",
        MissingSlot::AgeBand => "연령대를 알려주세요 (30대/40대/50대)",
        MissingSlot::PremiumMode => "전체 보험료 기준인가요, 담보별 기준인가요?",
        MissingSlot::CoverageQuery => "어떤 담보가 궁금하신가요? (예: 암직접입원비)",
        MissingSlot::Insurers(1) => "어느 보험사에 대한 질문인지 알려주세요",
        MissingSlot::Insurers(_) => "비교할 보험사 두 곳 이상을 알려주세요",
        MissingSlot::CoverageName => "어떤 담보에 대한 질문인지 알려주세요 (예: 암진단비)",
        MissingSlot::DiseaseSubtype => "어떤 질병 유형인지 알려주세요 (예: 제자리암, 경계성종양)",
    }
}

/// Build the clarification prompt for a missing-slot list. Returns `None`
/// when nothing is missing.
pub fn build_prompt(missing: Vec<MissingSlot>) -> Option<ClarificationPrompt> {
    if missing.is_empty() {
        return None;
    }
    let question = missing
        .iter()
        .map(slot_question)
        .collect::<Vec<_>>()
        .join("\n");
    Some(ClarificationPrompt { question, missing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{AgeBand, Sex};

    fn state() -> SlotState {
        SlotState::default()
    }

    #[test]
    fn test_q1_total_requirements() {
        let mut s = state();
        s.sex = Some(Sex::M);
        s.age_band = Some(AgeBand::Band40);
        s.premium_mode = Some(PremiumMode::Total);
        assert!(is_complete(ClarifyTarget::Q1, &s, &[]));
    }

    #[test]
    fn test_q1_by_coverage_needs_query() {
        let mut s = state();
        s.sex = Some(Sex::M);
        s.age_band = Some(AgeBand::Band40);
        s.premium_mode = Some(PremiumMode::ByCoverage);
        assert_eq!(
            missing_slots(ClarifyTarget::Q1, &s, &[]),
            vec![MissingSlot::CoverageQuery]
        );

        s.coverage_query_text = Some("암직접입원비".to_string());
        assert!(is_complete(ClarifyTarget::Q1, &s, &[]));
    }

    #[test]
    fn test_q2_requirements() {
        let mut s = state();
        s.coverage_query_text = Some("암직접입원비".to_string());
        s.sex = Some(Sex::M);
        s.age_band = Some(AgeBand::Band40);
        assert!(is_complete(ClarifyTarget::Q2, &s, &[]));

        let missing = missing_slots(ClarifyTarget::Q2, &state(), &[]);
        assert_eq!(
            missing,
            vec![MissingSlot::CoverageQuery, MissingSlot::Sex, MissingSlot::AgeBand]
        );
    }

    #[test]
    fn test_resolved_slots_never_reasked() {
        // Sex resolved on an earlier turn: the prompt must not mention it.
        let mut s = state();
        s.sex = Some(Sex::F);
        let missing = missing_slots(ClarifyTarget::Q2, &s, &[]);
        assert!(!missing.contains(&MissingSlot::Sex));
        let prompt = build_prompt(missing).unwrap();
        assert!(!prompt.question.contains("성별"));
    }

    #[test]
    fn test_ex1_and_ex3_insurer_counts() {
        let mut s = state();
        s.insurers = vec!["samsung".to_string()];
        s.coverage_names = vec!["암진단비".to_string()];
        assert!(is_complete(ClarifyTarget::Ex(ExKind::Ex1Detail), &s, &[]));
        assert_eq!(
            missing_slots(ClarifyTarget::Ex(ExKind::Ex3), &s, &[]),
            vec![MissingSlot::Insurers(2)]
        );

        s.insurers.push("meritz".to_string());
        assert!(is_complete(ClarifyTarget::Ex(ExKind::Ex3), &s, &[]));
    }

    #[test]
    fn test_ex2_is_always_complete() {
        assert!(is_complete(ClarifyTarget::Ex(ExKind::Ex2), &state(), &[]));
    }

    #[test]
    fn test_ex4_ignores_locked_insurers() {
        // Locked context has an insurer, but EX4 only accepts insurers
        // named in the current message.
        let mut s = state();
        s.insurers = vec!["samsung".to_string()];
        s.disease_subtypes = vec!["제자리암".to_string()];
        assert_eq!(
            missing_slots(ClarifyTarget::Ex(ExKind::Ex4), &s, &[]),
            vec![MissingSlot::Insurers(1)]
        );
        assert!(is_complete(
            ClarifyTarget::Ex(ExKind::Ex4),
            &s,
            &["samsung".to_string()]
        ));
    }

    #[test]
    fn test_ex4_coverage_name_never_gates() {
        let mut s = state();
        s.disease_subtypes = vec!["경계성종양".to_string()];
        // No coverage name anywhere; still complete with a current-turn insurer.
        assert!(s.coverage_names.is_empty());
        assert!(is_complete(
            ClarifyTarget::Ex(ExKind::Ex4),
            &s,
            &["meritz".to_string()]
        ));
    }

    #[test]
    fn test_prompt_lists_all_missing() {
        let missing = missing_slots(ClarifyTarget::Q2, &state(), &[]);
        let prompt = build_prompt(missing).unwrap();
        assert!(prompt.question.contains("담보"));
        assert!(prompt.question.contains("성별"));
        assert!(prompt.question.contains("연령대"));
    }

    #[test]
    fn test_no_prompt_when_complete() {
        assert_eq!(build_prompt(Vec::new()), None);
    }
}
