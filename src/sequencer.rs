/**
 * Ordering and numbering of exam questions.
 *
 * Numbers follow the fixed section layout of a banking exam:
 *
 *   Genel Kültür       1-25
 *   Genel Yetenek     26-50, ordered Türkçe, Tarih, Coğrafya, Matematik
 *   Genel Bankacılık  51-  , ordered Bankacılık, Hukuk, Krediler, Ekonomi, Muhasebe
 *   everything else   after the last banking question
 *
 * A section with fewer questions than its slots leaves a gap; a section with more
 * pushes the following one back.
 *
 * Version: October 2026
 */
use std::cmp;
use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::question::{Category, Question};

pub const GENEL_YETENEK_ORDER: [&str; 4] = ["TÜRKÇE", "TARİH", "COĞRAFYA", "MATEMATİK"];
pub const GENEL_BANKACILIK_ORDER: [&str; 5] =
    ["BANKACILIK", "HUKUK", "KREDİLER", "EKONOMİ", "MUHASEBE"];
/// Lowest number a Genel Yetenek question can receive.
pub const GENEL_YETENEK_FIRST: u32 = 26;
/// Lowest number a Genel Bankacılık question can receive.
pub const GENEL_BANKACILIK_FIRST: u32 = 51;

/// Return `base` in a uniformly random order.
///
/// Questions whose ids are in `used` are moved behind the others before shuffling.
/// Nothing is dropped: the output always has the same questions as `base`.
pub fn build_shuffled<R: Rng + ?Sized>(
    base: &[Question],
    used: &HashSet<String>,
    rng: &mut R,
) -> Vec<Question> {
    let (mut ordered, repeated): (Vec<Question>, Vec<Question>) =
        base.iter().cloned().partition(|q| !used.contains(&q.id));
    debug!(
        fresh = ordered.len(),
        repeated = repeated.len(),
        "partitioned questions by recent use"
    );

    ordered.extend(repeated);
    ordered.truncate(base.len());
    ordered.shuffle(rng);
    ordered
}

/// Return a copy of `questions` with `soru_numarasi` set on every element.
///
/// The result is a pure function of the ids, topics and order of the input. When an
/// id appears more than once, its first occurrence decides the number and every copy
/// receives it.
pub fn assign_question_numbers(questions: &[Question]) -> Vec<Question> {
    let mut seen = HashSet::new();
    let mut gk = Vec::new();
    let mut gy = Vec::new();
    let mut gb = Vec::new();
    let mut other = Vec::new();
    for q in questions.iter() {
        if !seen.insert(q.id.as_str()) {
            continue;
        }
        match q.category() {
            Category::GenelKultur => gk.push(q),
            Category::GenelYetenek => gy.push(q),
            Category::GenelBankacilik => gb.push(q),
            Category::Diger => other.push(q),
        }
    }

    let gy_ordered = order_by_topic(&gy, &GENEL_YETENEK_ORDER);
    let gb_ordered = order_by_topic(&gb, &GENEL_BANKACILIK_ORDER);

    let mut numbers: HashMap<&str, u32> = HashMap::new();
    let mut next = 1;
    next = number_all(&gk, next, &mut numbers);
    next = cmp::max(next, GENEL_YETENEK_FIRST);
    next = number_all(&gy_ordered, next, &mut numbers);
    next = cmp::max(next, GENEL_BANKACILIK_FIRST);
    next = number_all(&gb_ordered, next, &mut numbers);
    number_all(&other, next, &mut numbers);

    questions
        .iter()
        .map(|q| {
            let mut numbered = q.clone();
            numbered.soru_numarasi = numbers.get(q.id.as_str()).copied();
            numbered
        })
        .collect()
}

/// Sort questions by their assigned number. Unnumbered questions go last, and ties
/// keep their relative order.
pub fn sort_by_number(mut questions: Vec<Question>) -> Vec<Question> {
    questions.sort_by_key(|q| (q.soru_numarasi.is_none(), q.soru_numarasi));
    questions
}

/// Regroup `bucket` topic by topic in the order given by `order`. Questions whose
/// topic is missing from `order` are left out.
fn order_by_topic<'a>(bucket: &[&'a Question], order: &[&str]) -> Vec<&'a Question> {
    order
        .iter()
        .flat_map(|topic| bucket.iter().filter(move |q| q.topic_name == *topic).copied())
        .collect()
}

fn number_all<'a>(
    questions: &[&'a Question],
    mut next: u32,
    numbers: &mut HashMap<&'a str, u32>,
) -> u32 {
    for &q in questions.iter() {
        numbers.insert(q.id.as_str(), next);
        next += 1;
    }
    next
}
