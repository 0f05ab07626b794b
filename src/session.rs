/**
 * One exam-building session: the questions handed over by the selection step, their
 * current working order, and the replacement requests issued against them.
 *
 * Version: October 2026
 */
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::common::{ExamError, Result};
use super::persistence::{KeyValueStore, UsedQuestionLog};
use super::question::{normalize, Question, QuestionRecord};
use super::replacement::{self, QuestionPool};
use super::sequencer::{assign_question_numbers, build_shuffled, sort_by_number};

/// Aggregate counts from the selection step. The session never looks inside them; they
/// are handed on to the next step as they came.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamContext {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub total_questions: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub question_counts: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub topic_stats: Value,
}

/// What the selection step hands over.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    #[serde(default)]
    pub selected_questions: Vec<QuestionRecord>,
    #[serde(flatten)]
    pub context: ExamContext,
}

/// What this step hands to the next one: the numbered questions in exam order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamHandoff {
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub context: ExamContext,
}

/// Alternatives returned for one replacement request. Only the candidates of the most
/// recent request can be applied.
#[derive(Debug, Clone)]
pub struct ReplaceCandidates {
    pub token: u64,
    pub target_id: String,
    pub candidates: Vec<Question>,
}

pub struct ExamSession<S> {
    selected: Vec<Question>,
    shuffled: Vec<Question>,
    context: ExamContext,
    used_log: UsedQuestionLog<S>,
    rng: StdRng,
    latest_token: u64,
    /// The question the latest token was issued for.
    latest_target: Option<String>,
    /// `(replaced id, replacement id)` pairs, oldest first.
    history: Vec<(String, String)>,
}

impl<S: KeyValueStore> ExamSession<S> {
    pub fn start(
        input: StepInput,
        used_log: UsedQuestionLog<S>,
        exclude_used: bool,
    ) -> Result<Self> {
        Self::start_with_rng(input, used_log, exclude_used, StdRng::from_entropy())
    }

    /// Start a session and shuffle the selected questions. With `exclude_used`, recently
    /// used questions are kept apart from the others; otherwise the log is not read.
    pub fn start_with_rng(
        input: StepInput,
        used_log: UsedQuestionLog<S>,
        exclude_used: bool,
        rng: StdRng,
    ) -> Result<Self> {
        if input.selected_questions.is_empty() {
            return Err(ExamError::NoQuestionsSelected);
        }

        let selected = normalize(input.selected_questions);
        let mut session = Self {
            selected,
            shuffled: Vec::new(),
            context: input.context,
            used_log,
            rng,
            latest_token: 0,
            latest_target: None,
            history: Vec::new(),
        };
        for q in session.unusable() {
            warn!(question_id = %q.id, "selected question has no text or no options");
        }
        session.shuffle(exclude_used);
        info!(count = session.selected.len(), "started exam session");
        Ok(session)
    }

    /// Continue working on an exam that was already built, in its stored order.
    pub fn resume(exam: ExamHandoff, used_log: UsedQuestionLog<S>) -> Result<Self> {
        if exam.questions.is_empty() {
            return Err(ExamError::NoQuestionsSelected);
        }

        let questions = sort_by_number(exam.questions);
        Ok(Self {
            selected: questions.clone(),
            shuffled: questions,
            context: exam.context,
            used_log,
            rng: StdRng::from_entropy(),
            latest_token: 0,
            latest_target: None,
            history: Vec::new(),
        })
    }

    /// Recompute the working order from the selected questions.
    pub fn shuffle(&mut self, exclude_used: bool) {
        let used = if exclude_used {
            self.used_log.load_set()
        } else {
            HashSet::new()
        };
        self.shuffled = build_shuffled(&self.selected, &used, &mut self.rng);
    }

    pub fn selected(&self) -> &[Question] {
        &self.selected
    }

    pub fn working_set(&self) -> &[Question] {
        &self.shuffled
    }

    /// Selected questions that lack a text or answer options.
    pub fn unusable(&self) -> impl Iterator<Item = &Question> {
        self.selected.iter().filter(|q| !q.is_usable())
    }

    /// The working set with numbers assigned, in exam order.
    pub fn numbered(&self) -> Vec<Question> {
        sort_by_number(assign_question_numbers(&self.shuffled))
    }

    pub fn replacement_history(&self) -> &[(String, String)] {
        &self.history
    }

    /// Look up alternatives for the question with id `target_id`. Issuing a request
    /// makes the candidates of every earlier request stale.
    pub fn open_replace<P: QuestionPool + ?Sized>(
        &mut self,
        target_id: &str,
        pool: &P,
    ) -> Result<ReplaceCandidates> {
        let target = self.question(target_id)?.clone();
        self.latest_token += 1;
        self.latest_target = Some(String::from(target_id));
        let token = self.latest_token;

        let candidates = replacement::open_replace(&target, pool);
        debug!(token, question_id = target_id, count = candidates.len(), "found alternatives");
        Ok(ReplaceCandidates {
            token,
            target_id: String::from(target_id),
            candidates,
        })
    }

    /// Swap `replacement` in for `target_id`. `token` must come from the most recent
    /// `open_replace` call, issued for the same `target_id`.
    pub fn apply_replacement(
        &mut self,
        token: u64,
        target_id: &str,
        replacement: Question,
    ) -> Result<()> {
        if token != self.latest_token || self.latest_target.as_deref() != Some(target_id) {
            warn!(token, current = self.latest_token, "discarding stale replacement");
            return Err(ExamError::StaleReplacement {
                token,
                current: self.latest_token,
            });
        }
        self.question(target_id)?;
        if replacement.id != target_id && self.shuffled.iter().any(|q| q.id == replacement.id) {
            return Err(ExamError::DuplicateQuestion(replacement.id));
        }

        let replacement_id = replacement.id.clone();
        self.shuffled =
            replacement::apply_replacement(&self.shuffled, target_id, replacement.clone())?;
        // Reshuffles start from the selection.
        if let Ok(selected) =
            replacement::apply_replacement(&self.selected, target_id, replacement)
        {
            self.selected = selected;
        }

        info!(replaced = target_id, replacement = %replacement_id, "replaced question");
        self.history.push((String::from(target_id), replacement_id));
        Ok(())
    }

    pub fn handoff(&self) -> ExamHandoff {
        ExamHandoff {
            questions: self.numbered(),
            context: self.context.clone(),
        }
    }

    /// Finish the session: record its questions as used and return the exam for the
    /// next step.
    pub fn finalize(mut self) -> ExamHandoff {
        let handoff = self.handoff();
        let ids: Vec<String> = handoff.questions.iter().map(|q| q.id.clone()).collect();
        self.used_log.record(&ids);
        info!(count = ids.len(), "finalized exam");
        handoff
    }

    pub fn question(&self, id: &str) -> Result<&Question> {
        self.shuffled
            .iter()
            .find(|q| q.id == id)
            .ok_or_else(|| ExamError::QuestionNotFound(String::from(id)))
    }
}
