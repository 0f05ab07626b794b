/**
 * Build numbered exams from the command line.
 *
 * Version: October 2026
 */
use std::io::Write;

use colored::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;

use bilbakalim::common::{
    is_broken_pipe, BuildOptions, Command, ExamError, Options, ReplaceOptions, Result,
    UsedOptions,
};
use bilbakalim::config::Config;
use bilbakalim::persistence::{self, QuestionBank, UsedQuestionLog};
use bilbakalim::session::ExamSession;
use bilbakalim::{logging, my_println, ui};

fn main() {
    let options = Options::from_args();

    if options.no_color {
        colored::control::set_override(false);
    }
    logging::init(options.verbose);

    if let Err(e) = run(options) {
        if !is_broken_pipe(&e) {
            eprintln!("{}: {}", "Error".red(), e);
            ::std::process::exit(2);
        }
    }
}

fn run(options: Options) -> Result<()> {
    let config = Config::from_env()?
        .with_overrides(options.directory.as_deref(), options.store.as_deref())?;

    match options.cmd {
        Command::Build(options) => main_build(&config, options),
        Command::Replace(options) => main_replace(&config, options),
        Command::Used(options) => main_used(&config, options),
    }
}

/// The main function for the `build` subcommand.
fn main_build(config: &Config, options: BuildOptions) -> Result<()> {
    let input = persistence::load_step_input(&options.input)?;
    let used_log = UsedQuestionLog::new(config.open_store()?);
    let rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let session = ExamSession::start_with_rng(input, used_log, !options.no_exclude, rng)?;
    ui::print_exam(&session.numbered())?;

    let handoff = if options.finalize {
        let handoff = session.finalize();
        my_println!("\nRecorded {} question(s) as used.", handoff.questions.len())?;
        handoff
    } else {
        session.handoff()
    };

    if let Some(path) = options.output {
        persistence::save_exam(&path, &handoff)?;
        my_println!("Wrote the exam to {}.", path.to_string_lossy())?;
    }
    Ok(())
}

/// The main function for the `replace` subcommand.
fn main_replace(config: &Config, options: ReplaceOptions) -> Result<()> {
    let exam = persistence::load_exam(&options.exam)?;
    let bank = QuestionBank::load_or_empty(&options.bank);
    let used_log = UsedQuestionLog::new(config.open_store()?);

    let mut session = ExamSession::resume(exam, used_log)?;
    let found = session.open_replace(&options.question_id, &bank)?;

    let pick = match options.pick {
        Some(pick) => pick,
        None => {
            let target = session.question(&found.target_id)?;
            return ui::print_candidates(target, &found.candidates);
        }
    };

    let replacement = pick
        .checked_sub(1)
        .and_then(|i| found.candidates.get(i))
        .cloned()
        .ok_or(ExamError::NoSuchAlternative {
            pick,
            count: found.candidates.len(),
        })?;
    let replacement_id = replacement.id.clone();
    session.apply_replacement(found.token, &found.target_id, replacement)?;

    let handoff = session.handoff();
    let path = options.output.unwrap_or(options.exam);
    persistence::save_exam(&path, &handoff)?;

    my_println!("Replaced '{}' with '{}'.\n", found.target_id, replacement_id)?;
    ui::print_exam(&handoff.questions)
}

/// The main function for the `used` subcommand.
fn main_used(config: &Config, options: UsedOptions) -> Result<()> {
    let mut used_log = UsedQuestionLog::new(config.open_store()?);
    if options.clear {
        used_log.clear();
        my_println!("Cleared the used-question log.")
    } else {
        ui::print_used(&used_log.load())
    }
}
