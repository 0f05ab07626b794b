use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn can_build_numbered_exam() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run(dir.path(), &["build", &fixture("step_input.json")]);
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_lines(
        &stdout,
        &[
            "Genel Kültür",
            "(1) Türkiye'nin başkenti neresidir?",
            "A) İstanbul",
            "* B) Ankara",
            "C) İzmir",
            "Genel Yetenek",
            "(26) Hangisi bir bağlaçtır?",
            "* A) ve",
            "B) ev",
            "C) göz",
            "(27) 2 + 2 kaçtır?",
            "A) 3",
            "* B) 4",
            "C) 5",
            "Genel Bankacılık",
            "(51) Anayasa Mahkemesi & Danıştay hangi kuvvete bağlıdır?",
            "* A) Yargı",
            "B) Yasama",
            "C) Yürütme",
            "(52) Enflasyon neyi ifade eder?",
            "* A) Fiyatlar genel düzeyinin artışı",
            "B) Faiz oranının düşüşü",
            "Diğer",
            "(53) Işık hızı saniyede yaklaşık kaç kilometredir?",
            "* A) 300000",
            "B) 150000",
        ],
    );
}

#[test]
fn build_does_not_record_used_questions_unless_finalized() {
    let dir = TempDir::new().unwrap();
    run_ok(dir.path(), &["build", &fixture("step_input.json"), "--seed", "3"]);
    let (stdout, _, _) = run(dir.path(), &["used"]);
    assert_lines(&stdout, &["No questions have been recorded as used."]);
}

#[test]
fn finalized_exam_is_written_and_recorded() {
    let dir = TempDir::new().unwrap();
    let exam = exam_path(&dir, "exam.json");
    let stdout = run_ok(
        dir.path(),
        &["build", &fixture("step_input.json"), "--finalize", "-o", &exam],
    );
    assert_in_order(
        &stdout,
        &["(53) Işık hızı", "Recorded 6 question(s) as used.", "Wrote the exam to"],
    );

    let written = read_json(&exam);
    assert_eq!(written["totalQuestions"], 6);
    assert_eq!(written["topicStats"]["hukuk"]["available"], 3);
    let numbers: Vec<(String, u64)> = written["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| (q["id"].as_str().unwrap().to_string(), q["soruNumarasi"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        numbers,
        vec![
            (s("gk1"), 1),
            (s("gy1"), 26),
            (s("gy2"), 27),
            (s("gb1"), 51),
            (s("gb2"), 52),
            (s("ot1"), 53),
        ]
    );
    assert_eq!(written["questions"][3]["difficulty"], "medium");
    assert_eq!(written["questions"][0]["difficulty"], "easy");

    let (stdout, _, _) = run(dir.path(), &["used"]);
    assert_lines(
        &stdout,
        &[
            "6 recently used question(s), oldest first:",
            "gk1",
            "gy1",
            "gy2",
            "gb1",
            "gb2",
            "ot1",
        ],
    );
    assert!(dir.path().join("usedQuestionIds.json").exists());
}

#[test]
fn used_log_can_be_cleared() {
    let dir = TempDir::new().unwrap();
    run_ok(dir.path(), &["build", &fixture("step_input.json"), "--finalize"]);

    let stdout = run_ok(dir.path(), &["used", "--clear"]);
    assert_lines(&stdout, &["Cleared the used-question log."]);
    let stdout = run_ok(dir.path(), &["used"]);
    assert_lines(&stdout, &["No questions have been recorded as used."]);
}

#[test]
fn used_log_can_live_in_sqlite() {
    let dir = TempDir::new().unwrap();
    run_ok(
        dir.path(),
        &["--store", "sqlite", "build", &fixture("step_input.json"), "--finalize"],
    );
    assert!(dir.path().join("bilbakalim.sqlite3").exists());

    let stdout = run_ok(dir.path(), &["--store", "sqlite", "used"]);
    assert_in_order(&stdout, &["6 recently used question(s)", "gk1", "ot1"]);

    // The JSON store knows nothing about it.
    let stdout = run_ok(dir.path(), &["used"]);
    assert_lines(&stdout, &["No questions have been recorded as used."]);
}

#[test]
fn can_list_manual_alternatives() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    let stdout = run_ok(dir.path(), &["replace", &exam, "gb1", "--bank", &fixture("bank.json")]);
    assert_lines(
        &stdout,
        &[
            "Alternatives for 'gb1' (HUKUK, manual):",
            "[1] Kanun teklifini kimler verebilir? (m3)",
            "[2] Hangi kurum kanunların Anayasaya uygunluğunu denetler? (m2)",
        ],
    );
}

#[test]
fn can_list_topic_alternatives() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    let stdout = run_ok(dir.path(), &["replace", &exam, "gb2", "--bank", &fixture("bank.json")]);
    assert_lines(
        &stdout,
        &[
            "Alternatives for 'gb2' (EKONOMİ, konular):",
            "[1] GSYH neyi ölçer? (k1)",
        ],
    );
}

#[test]
fn no_alternatives_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    let stdout = run_ok(dir.path(), &["replace", &exam, "gy1", "--bank", &fixture("bank.json")]);
    assert_lines(&stdout, &["No alternatives found for 'gy1'."]);
}

#[test]
fn can_pick_an_alternative() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    let updated = exam_path(&dir, "updated.json");
    let stdout = run_ok(
        dir.path(),
        &["replace", &exam, "gb1", "--bank", &fixture("bank.json"), "--pick", "1", "-o", &updated],
    );
    assert_in_order(
        &stdout,
        &[
            "Replaced 'gb1' with 'm3'.",
            "(51) Kanun teklifini kimler verebilir?",
            "* A) Milletvekilleri",
            "(52) Enflasyon neyi ifade eder?",
        ],
    );

    let written = read_json(&updated);
    assert_eq!(written["questions"][3]["id"], "m3");
    assert_eq!(written["questions"][3]["soruNumarasi"], 51);
    assert_eq!(written["questions"][3]["source"], "manual");
    assert_eq!(written["totalQuestions"], 6);

    // The original file is left alone when -o is given.
    let original = read_json(&exam);
    assert_eq!(original["questions"][3]["id"], "gb1");
}

#[test]
fn picking_without_output_overwrites_the_exam() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    run_ok(
        dir.path(),
        &["replace", &exam, "gb2", "--bank", &fixture("bank.json"), "--pick", "1"],
    );
    let written = read_json(&exam);
    assert_eq!(written["questions"][4]["id"], "k1");
    assert_eq!(written["questions"][4]["topicName"], "EKONOMİ");
}

#[test]
fn missing_bank_lists_no_alternatives() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    let missing = exam_path(&dir, "no-such-bank.json");
    let (stdout, stderr, code) = run(dir.path(), &["replace", &exam, "gb1", "--bank", &missing]);
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    assert_lines(&stdout, &["No alternatives found for 'gb1'."]);
    assert!(stderr.contains("could not load question bank"), "stderr: {}", stderr);
}

#[test]
fn timestamps_in_any_format_are_accepted() {
    let dir = TempDir::new().unwrap();
    let input = exam_path(&dir, "input.json");
    fs::write(
        &input,
        r#"{"selectedQuestions": [
            {"id": "a", "topicName": "HUKUK", "soruMetni": "Soru A?", "cevaplar": ["Evet"],
             "createdAt": {"seconds": 1700000000, "nanoseconds": 0}},
            {"id": "b", "topicName": "TARİH", "soruMetni": "Soru B?", "cevaplar": ["Hayır"],
             "createdAt": "dün"}
        ]}"#,
    )
    .unwrap();

    let stdout = run_ok(dir.path(), &["build", &input]);
    assert_lines(
        &stdout,
        &[
            "Genel Yetenek",
            "(26) Soru B?",
            "A) Hayır",
            "Genel Bankacılık",
            "(51) Soru A?",
            "A) Evet",
        ],
    );
}

#[test]
fn picking_out_of_range_fails() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    let (_, stderr, code) = run(
        dir.path(),
        &["replace", &exam, "gb1", "--bank", &fixture("bank.json"), "--pick", "5"],
    );
    assert_eq!(code, Some(2));
    assert_lines(&stderr, &["Error: there is no alternative number 5 (2 found)"]);
}

#[test]
fn replacing_unknown_question_fails() {
    let dir = TempDir::new().unwrap();
    let exam = built_exam(&dir);
    let (_, stderr, code) =
        run(dir.path(), &["replace", &exam, "zzz", "--bank", &fixture("bank.json")]);
    assert_eq!(code, Some(2));
    assert_lines(&stderr, &["Error: question 'zzz' is not part of the exam"]);
}

#[test]
fn empty_selection_fails() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run(dir.path(), &["build", &fixture("empty_input.json")]);
    assert_eq!(code, Some(2));
    assert!(stdout.trim().is_empty());
    assert_lines(&stderr, &["Error: no questions were selected for the exam"]);
}

#[test]
fn unknown_store_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run(dir.path(), &["--store", "redis", "used"]);
    assert_eq!(code, Some(2));
    assert_lines(&stderr, &[r"RE: ^Error: unknown store 'redis'"]);
}

#[test]
fn missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let missing = exam_path(&dir, "missing.json");
    let (_, stderr, code) = run(dir.path(), &["build", &missing]);
    assert_eq!(code, Some(2));
    assert_lines(&stderr, &[r"RE: ^Error: IO error \(.+\)$"]);
}

fn built_exam(dir: &TempDir) -> String {
    let exam = exam_path(dir, "exam.json");
    run_ok(dir.path(), &["build", &fixture("step_input.json"), "-o", &exam]);
    exam
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run(dir, args);
    assert_eq!(code, Some(0), "stderr: {}", stderr);
    stdout
}

fn run(dir: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    let result = Command::new(env!("CARGO_BIN_EXE_bilbakalim"))
        .arg("--no-color")
        .arg("-d")
        .arg(dir)
        .args(args)
        .env_remove("BILBAKALIM_DIR")
        .env_remove("BILBAKALIM_STORE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run bilbakalim");
    let stdout = String::from_utf8_lossy(&result.stdout).to_string();
    let stderr = String::from_utf8_lossy(&result.stderr).to_string();
    (stdout, stderr, result.status.code())
}

/// Match the non-blank lines of `output` against `expected`, one by one. A line of
/// `expected` starting with `RE:` is a regular expression.
fn assert_lines(output: &str, expected: &[&str]) {
    let mut lines_iter = output.lines().filter(|line| line.trim().len() > 0);
    for expected in expected {
        let got = lines_iter.next().expect("Premature end of output");
        if expected.starts_with("RE:") {
            let re = Regex::new(&expected[3..].trim()).unwrap();
            assert!(
                re.is_match(got.trim()),
                "Failed to match {:?} against pattern {:?}",
                got.trim(),
                &expected[3..],
            );
        } else {
            assert!(
                expected.trim() == got.trim(),
                "Expected {:?}, got {:?}",
                expected.trim(),
                got.trim(),
            );
        }
    }

    if let Some(line) = lines_iter.next() {
        panic!("Extra output: {:?}", line.trim());
    }
}

fn assert_in_order(output: &str, data: &[&str]) {
    let mut last_pos = 0;
    for datum in data {
        if let Some(pos) = output[last_pos..].find(datum) {
            last_pos = (pos + last_pos) + datum.len();
        } else {
            panic!("Missing: {:?}; Contents of stdout: {:?}", datum, output);
        }
    }
}

fn fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path.to_string_lossy().to_string()
}

fn exam_path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().to_string()
}

fn read_json(path: &str) -> Value {
    let data = fs::read_to_string(path).unwrap();
    serde_json::from_str(&data).unwrap()
}

fn s(mystr: &str) -> String {
    String::from(mystr)
}
