/**
 * Building numbered banking exams from a set of selected questions.
 *
 * The selection step hands over a list of questions. This crate shuffles them, keeping
 * recently used questions apart, numbers them by exam section, lets individual
 * questions be swapped for alternatives from a question bank, and hands the finished
 * exam on to the next step.
 *
 * Version: October 2026
 */
#[macro_use]
pub mod ui;
pub mod common;
pub mod config;
pub mod logging;
pub mod persistence;
pub mod question;
pub mod replacement;
pub mod sequencer;
pub mod session;

pub use common::{ExamError, Result};
pub use persistence::{KeyValueStore, QuestionBank, UsedQuestionLog};
pub use question::{Question, QuestionRecord};
pub use session::{ExamHandoff, ExamSession, StepInput};
