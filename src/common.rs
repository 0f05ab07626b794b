/**
 * Definitions shared by several modules: the crate's error type and the structs that
 * hold command-line arguments.
 *
 * Version: October 2026
 */
use std::io;
use std::path::PathBuf;

use structopt::StructOpt;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, ExamError>;

#[derive(Debug, Error)]
pub enum ExamError {
    /// The upstream selection step handed over no questions.
    #[error("no questions were selected for the exam")]
    NoQuestionsSelected,
    /// A question id that is not part of the working set.
    #[error("question '{0}' is not part of the exam")]
    QuestionNotFound(String),
    /// Candidates from a replacement query that has since been superseded.
    #[error("replacement request {token} is stale (latest is {current})")]
    StaleReplacement { token: u64, current: u64 },
    /// The replacement would put the same question in the exam twice.
    #[error("question '{0}' is already part of the exam")]
    DuplicateQuestion(String),
    #[error("could not parse JSON ({0})")]
    Json(#[from] serde_json::Error),
    #[error("IO error ({0})")]
    Io(#[from] io::Error),
    #[error("SQL error ({0})")]
    Sql(#[from] rusqlite::Error),
    #[error("cannot write to file '{}'", .0.to_string_lossy())]
    CannotWriteToFile(PathBuf),
    #[error("unable to create application directory at {}", .0.to_string_lossy())]
    CannotMakeAppDir(PathBuf),
    /// `--pick` named an alternative outside the listed range.
    #[error("there is no alternative number {pick} ({count} found)")]
    NoSuchAlternative { pick: usize, count: usize },
    #[error("unknown store '{0}' (expected 'json' or 'sqlite')")]
    InvalidStore(String),
}

pub fn is_broken_pipe(e: &ExamError) -> bool {
    if let ExamError::Io(e) = e {
        if let io::ErrorKind::BrokenPipe = e.kind() {
            return true;
        }
    }
    false
}

/// Holds the command-line configuration for the application.
#[derive(StructOpt, Debug)]
#[structopt(name = "bilbakalim", about = "Build numbered exams from selected questions.")]
pub struct Options {
    /// Keep the used-question log and other state in this directory.
    #[structopt(short = "d", long = "directory")]
    pub directory: Option<PathBuf>,
    /// Storage backend for the used-question log: 'json' or 'sqlite'.
    #[structopt(long = "store")]
    pub store: Option<String>,
    /// Do not emit colorized output.
    #[structopt(long = "no-color")]
    pub no_color: bool,
    /// Log debugging information to standard error.
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Shuffle, number and print an exam from a step-input file.
    #[structopt(name = "build")]
    Build(BuildOptions),
    /// List or apply alternatives for one question of a built exam.
    #[structopt(name = "replace")]
    Replace(ReplaceOptions),
    /// Inspect or clear the recently-used question log.
    #[structopt(name = "used")]
    Used(UsedOptions),
}

#[derive(StructOpt, Debug)]
pub struct BuildOptions {
    /// Path to the step-input file holding the selected questions.
    pub input: PathBuf,
    /// Write the numbered exam to this file.
    #[structopt(short = "o", long = "output")]
    pub output: Option<PathBuf>,
    /// Ignore the recently-used question log when shuffling.
    #[structopt(long = "no-exclude")]
    pub no_exclude: bool,
    /// Seed the shuffle for a reproducible order.
    #[structopt(long = "seed")]
    pub seed: Option<u64>,
    /// Record the exam's questions as used.
    #[structopt(long = "finalize")]
    pub finalize: bool,
}

#[derive(StructOpt, Debug)]
pub struct ReplaceOptions {
    /// Path to a built exam.
    pub exam: PathBuf,
    /// Id of the question to replace.
    pub question_id: String,
    /// Question bank to draw alternatives from.
    #[structopt(short = "b", long = "bank")]
    pub bank: PathBuf,
    /// Swap in the `n`th alternative (counting from 1).
    #[structopt(long = "pick")]
    pub pick: Option<usize>,
    /// Write the updated exam here instead of overwriting the input.
    #[structopt(short = "o", long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
pub struct UsedOptions {
    /// Forget every recorded question.
    #[structopt(long = "clear")]
    pub clear: bool,
}
