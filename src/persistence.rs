/**
 * Reading and writing state in the filesystem: the key-value stores that hold the
 * recently-used question log, question banks, and the exam files passed between the
 * steps of the exam builder.
 *
 * Version: October 2026
 */
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::common::{ExamError, Result};
use super::question::QuestionRecord;
use super::replacement::{CandidateQuery, QuestionPool};
use super::session::{ExamHandoff, StepInput};

/// The key the recently-used question ids are stored under.
pub const USED_QUESTIONS_KEY: &str = "usedQuestionIds";
/// How many recently-used ids are remembered.
pub const USED_QUESTIONS_CAP: usize = 2000;

/// A durable store of JSON values by key.
pub trait KeyValueStore {
    /// `Ok(None)` when nothing has been stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: &Value) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Stores each key as a pretty-printed JSON file named `<key>.json`.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.dir.clone();
        path.push(format!("{}.json", key));
        path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ExamError::Io(e)),
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .or(Err(ExamError::CannotMakeAppDir(self.dir.clone())))?;
        }
        let path = self.path_for(key);
        let serialized = serde_json::to_string_pretty(value)?;
        fs::write(&path, serialized).or(Err(ExamError::CannotWriteToFile(path)))?;
        Ok(())
    }
}

/// Stores every key in a single SQLite table.
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection.execute(
            "
            CREATE TABLE IF NOT EXISTS kv(
              key TEXT NOT NULL PRIMARY KEY CHECK(key != ''),
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
            params![],
        )?;
        Ok(Self { connection })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let stored: Option<String> = self
            .connection
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        match stored {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.connection.execute(
            "INSERT OR REPLACE INTO kv(key, value) VALUES (?1, ?2)",
            params![key, serialized],
        )?;
        Ok(())
    }
}

/// Keeps values in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        self.values.insert(String::from(key), value.clone());
        Ok(())
    }
}

/// The ids of questions that went into recent exams, oldest first.
///
/// Storage problems are never fatal here: an unreadable log reads as empty, and a
/// failed write is logged and dropped.
pub struct UsedQuestionLog<S> {
    store: S,
}

impl<S: KeyValueStore> UsedQuestionLog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Vec<String> {
        match self.store.get(USED_QUESTIONS_KEY) {
            Ok(Some(value)) => match serde_json::from_value::<Vec<String>>(value) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(error = %e, "used-question log is not a list of ids, ignoring it");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "could not read used-question log");
                Vec::new()
            }
        }
    }

    pub fn load_set(&self) -> HashSet<String> {
        self.load().into_iter().collect()
    }

    /// Append `ids` to the log. An id already in the log keeps its old place, and only
    /// the newest `USED_QUESTIONS_CAP` entries are kept.
    pub fn record(&mut self, ids: &[String]) {
        let mut seen = HashSet::new();
        let mut merged: Vec<String> = self
            .load()
            .into_iter()
            .chain(ids.iter().cloned())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if merged.len() > USED_QUESTIONS_CAP {
            let excess = merged.len() - USED_QUESTIONS_CAP;
            merged.drain(..excess);
        }

        let count = merged.len();
        match self.store.set(USED_QUESTIONS_KEY, &Value::from(merged)) {
            Ok(()) => debug!(count, "recorded used questions"),
            Err(e) => warn!(error = %e, "could not save used-question log"),
        }
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.set(USED_QUESTIONS_KEY, &Value::Array(Vec::new())) {
            warn!(error = %e, "could not clear used-question log");
        }
    }
}

/// A question bank read from a JSON file: a flat list of manually entered questions
/// and a topic → subtopic → question hierarchy.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBank {
    #[serde(default)]
    pub manual_questions: Vec<QuestionRecord>,
    #[serde(default)]
    pub konular: Vec<Topic>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Topic {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Subtopic {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    /// Like `load`, but a bank that cannot be read is logged and treated as empty.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(bank) => bank,
            Err(e) => {
                error!(bank = %path.display(), error = %e, "could not load question bank");
                Self::default()
            }
        }
    }
}

impl QuestionPool for QuestionBank {
    fn fetch(&self, query: &CandidateQuery) -> Result<Vec<QuestionRecord>> {
        match query {
            CandidateQuery::Manual { topic_id: Some(topic_id), .. } => Ok(self
                .manual_questions
                .iter()
                .filter(|r| r.topic_id.as_ref() == Some(topic_id))
                .cloned()
                .collect()),
            CandidateQuery::Manual { topic_id: None, topic_name: Some(topic_name) } => Ok(self
                .manual_questions
                .iter()
                .filter(|r| r.topic_name.as_ref() == Some(topic_name))
                .cloned()
                .collect()),
            CandidateQuery::Manual { .. } => Ok(Vec::new()),
            CandidateQuery::Konular { topic_id: Some(topic_id) } => {
                let mut found = Vec::new();
                for topic in self.konular.iter().filter(|t| &t.id == topic_id) {
                    for subtopic in topic.subtopics.iter() {
                        for record in subtopic.questions.iter() {
                            let mut record = record.clone();
                            record.topic_id = Some(topic.id.clone());
                            record.topic_name = Some(topic.name.clone());
                            found.push(record);
                        }
                    }
                }
                Ok(found)
            }
            CandidateQuery::Konular { topic_id: None } => Ok(Vec::new()),
        }
    }
}

pub fn load_step_input(path: &Path) -> Result<StepInput> {
    load_json(path)
}

pub fn load_exam(path: &Path) -> Result<ExamHandoff> {
    load_json(path)
}

pub fn save_exam(path: &Path, exam: &ExamHandoff) -> Result<()> {
    let serialized = serde_json::to_string_pretty(exam)?;
    fs::write(path, serialized).or(Err(ExamError::CannotWriteToFile(path.to_path_buf())))?;
    Ok(())
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
