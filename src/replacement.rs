/**
 * Swapping a single exam question for an alternative from the question pools.
 *
 * Alternatives come from the pool the original question came from: the flat manual
 * pool, or the topic hierarchy ("konular"). Either way they are scoped to the
 * original's topic, exclude the original itself, and are listed oldest first.
 *
 * Version: October 2026
 */
use tracing::{debug, error};

use super::common::{ExamError, Result};
use super::question::{Question, QuestionRecord, Source};

/// What to ask a question pool for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateQuery {
    /// Manual questions with the given topic id, or with the given topic name when
    /// there is no id.
    Manual {
        topic_id: Option<String>,
        topic_name: Option<String>,
    },
    /// Every question nested under the topic with the given id.
    Konular { topic_id: Option<String> },
}

/// A store of questions that alternatives can be drawn from.
pub trait QuestionPool {
    fn fetch(&self, query: &CandidateQuery) -> Result<Vec<QuestionRecord>>;
}

impl CandidateQuery {
    pub fn for_target(target: &Question) -> Self {
        match target.source {
            Source::Manual => CandidateQuery::Manual {
                topic_id: target.topic_id.clone(),
                topic_name: if target.topic_name.is_empty() {
                    None
                } else {
                    Some(target.topic_name.clone())
                },
            },
            Source::Konular => CandidateQuery::Konular {
                topic_id: target.topic_id.clone(),
            },
        }
    }

    pub fn source(&self) -> Source {
        match self {
            CandidateQuery::Manual { .. } => Source::Manual,
            CandidateQuery::Konular { .. } => Source::Konular,
        }
    }
}

/// Query `pool` for alternatives to `target`. A failed query is logged and yields no
/// alternatives.
pub fn open_replace<P: QuestionPool + ?Sized>(target: &Question, pool: &P) -> Vec<Question> {
    let query = CandidateQuery::for_target(target);
    debug!(question_id = %target.id, ?query, "querying for alternatives");
    match pool.fetch(&query) {
        Ok(records) => select_candidates(target, query.source(), records),
        Err(e) => {
            error!(question_id = %target.id, error = %e, "could not load alternatives");
            Vec::new()
        }
    }
}

/// Turn the raw records returned for `target` into a list of alternatives: drop the
/// target itself and anything without a question text, then sort oldest first. Records
/// without a creation time sort before all others; ties keep the pool's order.
pub fn select_candidates(
    target: &Question,
    source: Source,
    records: Vec<QuestionRecord>,
) -> Vec<Question> {
    let mut candidates: Vec<Question> = records
        .into_iter()
        .filter(|r| r.id != target.id)
        .map(|r| adopt(target, source, r))
        .filter(Question::has_text)
        .collect();
    candidates.sort_by_key(|q| q.created_at);
    candidates
}

/// Replace the question with id `target_id` by `replacement`, keeping its position.
pub fn apply_replacement(
    working: &[Question],
    target_id: &str,
    replacement: Question,
) -> Result<Vec<Question>> {
    let position = working
        .iter()
        .position(|q| q.id == target_id)
        .ok_or_else(|| ExamError::QuestionNotFound(String::from(target_id)))?;

    let mut updated = working.to_vec();
    updated[position] = replacement;
    Ok(updated)
}

fn adopt(target: &Question, source: Source, mut record: QuestionRecord) -> Question {
    if record.topic_name.is_none() {
        record.topic_name = Some(target.topic_name.clone());
    }
    if record.topic_id.is_none() {
        record.topic_id = target.topic_id.clone();
    }
    let mut q = Question::from(record);
    q.source = source;
    q.soru_numarasi = None;
    q
}
