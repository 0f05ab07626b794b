/**
 * Printing exams and replacement candidates to the terminal.
 *
 * Version: October 2026
 */
use std::io::Write;

use colored::*;

use super::common::Result;
use super::question::{option_letter, Category, Question};

#[macro_export]
macro_rules! my_println {
    ($($arg:tt)*) => (
        writeln!(std::io::stdout(), $($arg)*).map_err($crate::common::ExamError::Io)
    );
}

#[macro_export]
macro_rules! my_print {
    ($($arg:tt)*) => (
        write!(std::io::stdout(), $($arg)*).map_err($crate::common::ExamError::Io)
    );
}

const OPTION_INDENT: &str = "      ";

/// Print a numbered exam, one section heading per run of questions from the same
/// section.
pub fn print_exam(questions: &[Question]) -> Result<()> {
    let mut section: Option<Category> = None;
    for q in questions.iter() {
        let category = q.category();
        if section != Some(category) {
            if section.is_some() {
                my_print!("\n")?;
            }
            my_println!("{}", category.label().bold())?;
            section = Some(category);
        }
        print_question(q)?;
    }
    Ok(())
}

fn print_question(q: &Question) -> Result<()> {
    let prefix = match q.soru_numarasi {
        Some(n) => format!("  ({}) ", n),
        None => String::from("  (?) "),
    };
    prettyprint_colored(&q.display_text(), &prefix, None, Some(Color::Cyan))?;

    let correct = q.correct_option();
    for (i, option) in q.cevaplar.iter().enumerate() {
        let letter = match option_letter(i) {
            Some(letter) => letter,
            None => break,
        };
        let text = html_escape::decode_html_entities(option);
        if Some(letter) == correct {
            let prefix = format!("    * {}) ", letter);
            prettyprint_colored(&text, &prefix, Some(Color::Green), Some(Color::Green))?;
        } else {
            let prefix = format!("{}{}) ", OPTION_INDENT, letter);
            prettyprint_colored(&text, &prefix, None, None)?;
        }
    }
    Ok(())
}

/// List the alternatives for `target`, numbered from 1 in the order they can be picked.
pub fn print_candidates(target: &Question, candidates: &[Question]) -> Result<()> {
    if candidates.is_empty() {
        my_println!("No alternatives found for '{}'.", target.id)?;
        return Ok(());
    }

    my_println!(
        "Alternatives for '{}' ({}, {}):",
        target.id,
        target.topic_name,
        target.source.as_str()
    )?;
    for (i, candidate) in candidates.iter().enumerate() {
        let prefix = format!("  [{}] ", i + 1);
        let id = format!("({})", candidate.id);
        let line = format!("{} {}", candidate.display_text(), id.as_str().dimmed());
        prettyprint_colored(&line, &prefix, None, Some(Color::Cyan))?;
    }
    Ok(())
}

pub fn print_used(ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        my_println!("No questions have been recorded as used.")?;
        return Ok(());
    }

    my_println!("{} recently used question(s), oldest first:", ids.len())?;
    for id in ids.iter() {
        my_println!("  {}", id)?;
    }
    Ok(())
}

/// Print `message` to standard output, breaking lines at the width of the terminal.
/// `prefix` goes before the first line and every later line is indented by its width.
pub fn prettyprint_colored(
    message: &str,
    prefix: &str,
    message_color: Option<Color>,
    prefix_color: Option<Color>,
) -> Result<()> {
    let prefix_width = prefix.chars().count();
    let width = textwrap::termwidth().saturating_sub(prefix_width).max(20);
    let mut lines = textwrap::wrap_iter(message, width);

    if let Some(first_line) = lines.next() {
        let colored_prefix = color_optional(prefix, prefix_color);
        let colored_line = color_optional(&first_line, message_color);
        my_println!("{}{}", colored_prefix, colored_line)?;
    } else {
        my_println!("{}", color_optional(prefix, prefix_color))?;
    }

    let indent = " ".repeat(prefix_width);
    for line in lines {
        let colored_line = color_optional(&line, message_color);
        my_println!("{}{}", indent, colored_line)?;
    }
    Ok(())
}

fn color_optional(text: &str, color: Option<Color>) -> ColoredString {
    if let Some(color) = color {
        text.color(color)
    } else {
        text.normal()
    }
}
