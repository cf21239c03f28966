//! Interview data model: configuration, questions, answers and the durable
//! session record.

use crate::context::OwnerId;
use crate::error::InterviewError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const MIN_QUESTIONS: u8 = 1;
pub const MAX_QUESTIONS: u8 = 20;

/// Seniority of the role being interviewed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    Junior,
    Mid,
    Senior,
    Other(String),
}

impl From<String> for Level {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "junior" => Level::Junior,
            "mid" | "mid-level" | "intermediate" => Level::Mid,
            "senior" => Level::Senior,
            _ => Level::Other(value.trim().to_string()),
        }
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.to_string()
    }
}

impl FromStr for Level {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Level::from(s.to_string()))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Junior => f.write_str("Junior"),
            Level::Mid => f.write_str("Mid"),
            Level::Senior => f.write_str("Senior"),
            Level::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum InterviewType {
    Technical,
    Behavioral,
    Mixed,
}

impl FromStr for InterviewType {
    type Err = InterviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "technical" => Ok(InterviewType::Technical),
            "behavioral" | "behavioural" => Ok(InterviewType::Behavioral),
            "mixed" => Ok(InterviewType::Mixed),
            other => Err(InterviewError::InvalidConfig(format!(
                "unknown interview type '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for InterviewType {
    type Error = InterviewError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterviewType::Technical => "Technical",
            InterviewType::Behavioral => "Behavioral",
            InterviewType::Mixed => "Mixed",
        };
        f.write_str(s)
    }
}

/// Parameters chosen before a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub role: String,
    pub level: Level,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    #[serde(rename = "techstack", default)]
    pub tech_stack: Vec<String>,
    pub question_count: u8,
}

impl SessionConfig {
    /// Checks the config and normalizes whitespace in the role and stack.
    pub fn validated(mut self) -> Result<Self, InterviewError> {
        self.role = self.role.trim().to_string();
        if self.role.is_empty() {
            return Err(InterviewError::InvalidConfig("role must not be empty".into()));
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.question_count) {
            return Err(InterviewError::InvalidConfig(format!(
                "question count must be between {MIN_QUESTIONS} and {MAX_QUESTIONS}, got {}",
                self.question_count
            )));
        }
        self.tech_stack = self
            .tech_stack
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(self)
    }
}

/// Ordered questions for one session, fixed once fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionList(Vec<String>);

impl QuestionList {
    pub fn new(questions: Vec<String>) -> Self {
        Self(questions)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Captured answers keyed by question index. Sparse until filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSet(BTreeMap<usize, String>);

impl AnswerSet {
    pub fn record(&mut self, index: usize, answer: String) {
        self.0.insert(index, answer);
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    /// Number of captured answers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Answers as a sequence aligned with `question_count` questions.
    pub fn aligned(&self, question_count: usize) -> Vec<Option<String>> {
        (0..question_count).map(|i| self.0.get(&i).cloned()).collect()
    }
}

/// The durable outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub owner: OwnerId,
    pub role: String,
    pub level: Level,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    #[serde(rename = "techstack", default)]
    pub tech_stack: Vec<String>,
    pub questions: Vec<String>,
    /// Aligned with `questions`; `None` means no answer was captured.
    pub answers: Vec<Option<String>>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn check_alignment(&self) -> Result<(), InterviewError> {
        if self.answers.len() > self.questions.len() {
            return Err(InterviewError::InvalidConfig(format!(
                "{} answers for {} questions",
                self.answers.len(),
                self.questions.len()
            )));
        }
        Ok(())
    }

    /// Pairs each question with its answer, if one was captured.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, &str, Option<&str>)> {
        self.questions.iter().enumerate().map(|(i, q)| {
            let answer = self
                .answers
                .get(i)
                .and_then(|a| a.as_deref())
                .filter(|a| !a.trim().is_empty());
            (i, q.as_str(), answer)
        })
    }
}

/// A record as submitted for saving, before the server stamps owner and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInterview {
    pub role: String,
    pub level: Level,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    #[serde(rename = "techstack", default)]
    pub tech_stack: Vec<String>,
    pub questions: Vec<String>,
    #[serde(default)]
    pub answers: Vec<Option<String>>,
}

impl NewInterview {
    pub fn into_record(self, owner: OwnerId, created_at: DateTime<Utc>) -> Result<SessionRecord, InterviewError> {
        let record = SessionRecord {
            owner,
            role: self.role,
            level: self.level,
            interview_type: self.interview_type,
            tech_stack: self.tech_stack,
            questions: self.questions,
            answers: self.answers,
            created_at,
        };
        record.check_alignment()?;
        Ok(record)
    }
}

/// Server-assigned identifier of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Scores for one answer, each in `[0, 10]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaScores {
    pub clarity: f32,
    pub structure: f32,
    pub technical_depth: f32,
    pub examples: f32,
}

impl CriteriaScores {
    pub fn clamped(self) -> Self {
        Self {
            clarity: clamp_score(self.clarity),
            structure: clamp_score(self.structure),
            technical_depth: clamp_score(self.technical_depth),
            examples: clamp_score(self.examples),
        }
    }
}

pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 10.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEvaluation {
    pub question_index: usize,
    pub overall_score: f32,
    pub criteria: CriteriaScores,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

/// Scores and coaching attached to a record by an explicit evaluation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub overall_score: f32,
    pub evaluations: Vec<QuestionEvaluation>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Coaching summary.
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub coaching_tips: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// A stored session record with its identifier and optional evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub session: SessionRecord,
    #[serde(default)]
    pub evaluation: Option<EvaluationResult>,
}
