use crate::interview::{
    CriteriaScores, EvaluationResult, QuestionEvaluation, SessionRecord, clamp_score,
};
use crate::llm::{ReplyFormat, TextGenerator};
use crate::prompts::{ANSWER_EVALUATION, COACHING, PromptSet};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use intervu_gemini::strip_code_fences;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;

/// Strengths and weaknesses kept on an interview-level evaluation.
pub const MAX_SUMMARY_ITEMS: usize = 5;

const NO_ANSWER_FEEDBACK: &str = "No answer captured.";

/// Model verdict on a single answer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnswerAssessment {
    #[serde(default)]
    pub scores: CriteriaScores,
    #[serde(default)]
    pub overall_score: f32,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Coaching {
    #[serde(default)]
    pub summary_feedback: String,
    #[serde(default)]
    pub improvement_tips: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

/// Aggregate figures handed to the coaching step.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSummary {
    pub overall_score: f32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Scores answers and writes coaching feedback.
///
/// `evaluate_record` is written against this trait so tests can drive it with
/// `MockEvaluator` instead of a live model.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate_answer(
        &self,
        role: &str,
        level: &str,
        question: &str,
        answer: &str,
    ) -> Result<AnswerAssessment>;

    async fn coach(
        &self,
        summary: &InterviewSummary,
        historical_weaknesses: &[String],
    ) -> Result<Coaching>;
}

/// Evaluator backed by a language model.
pub struct LlmEvaluator<G> {
    llm: G,
    prompts: PromptSet,
}

impl<G: TextGenerator> LlmEvaluator<G> {
    pub fn new(llm: G, prompts: PromptSet) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait]
impl<G: TextGenerator> Evaluator for LlmEvaluator<G> {
    async fn evaluate_answer(
        &self,
        role: &str,
        level: &str,
        question: &str,
        answer: &str,
    ) -> Result<AnswerAssessment> {
        let prompt = self.prompts.render(
            ANSWER_EVALUATION,
            &[
                ("role", role),
                ("level", level),
                ("question", question),
                ("answer", answer),
            ],
        )?;
        let reply = self
            .llm
            .generate(&prompt, 0.2, ReplyFormat::Json)
            .await
            .context("Answer evaluation call failed")?;

        let mut assessment: AnswerAssessment = serde_json::from_str(strip_code_fences(&reply))
            .with_context(|| format!("Invalid evaluation reply: {reply}"))?;
        assessment.scores = assessment.scores.clamped();
        assessment.overall_score = clamp_score(assessment.overall_score);
        Ok(assessment)
    }

    async fn coach(
        &self,
        summary: &InterviewSummary,
        historical_weaknesses: &[String],
    ) -> Result<Coaching> {
        let overall = format!("{:.1}", summary.overall_score);
        let strengths = summary.strengths.join(", ");
        let weaknesses = summary.weaknesses.join(", ");
        let historical = historical_weaknesses.join(", ");
        let prompt = self.prompts.render(
            COACHING,
            &[
                ("overall_score", &overall),
                ("strengths", &strengths),
                ("weaknesses", &weaknesses),
                ("historical_weaknesses", &historical),
            ],
        )?;
        let reply = self
            .llm
            .generate(&prompt, 0.4, ReplyFormat::Json)
            .await
            .context("Coaching call failed")?;

        serde_json::from_str(strip_code_fences(&reply))
            .with_context(|| format!("Invalid coaching reply: {reply}"))
    }
}

/// Evaluates every question of `record` and attaches coaching.
///
/// Answers are scored one at a time. Unanswered questions are not sent to the
/// model and score zero. Any failed call fails the whole evaluation.
pub async fn evaluate_record<E: Evaluator + ?Sized>(
    evaluator: &E,
    record: &SessionRecord,
    historical_weaknesses: &[String],
) -> Result<EvaluationResult> {
    let level = record.level.to_string();
    let mut evaluations = Vec::with_capacity(record.questions.len());
    let mut all_strengths = Vec::new();
    let mut all_weaknesses = Vec::new();

    for (index, question, answer) in record.pairs() {
        let evaluation = match answer {
            Some(answer) => {
                let assessment = evaluator
                    .evaluate_answer(&record.role, &level, question, answer)
                    .await
                    .with_context(|| format!("Failed to evaluate question {}", index + 1))?;
                all_strengths.extend(assessment.strengths.iter().cloned());
                all_weaknesses.extend(assessment.weaknesses.iter().cloned());
                QuestionEvaluation {
                    question_index: index,
                    overall_score: assessment.overall_score,
                    criteria: assessment.scores,
                    strengths: assessment.strengths,
                    weaknesses: assessment.weaknesses,
                    feedback: assessment.feedback,
                }
            }
            None => QuestionEvaluation {
                question_index: index,
                overall_score: 0.0,
                criteria: CriteriaScores::default(),
                strengths: vec![],
                weaknesses: vec![],
                feedback: NO_ANSWER_FEEDBACK.to_string(),
            },
        };
        evaluations.push(evaluation);
    }

    let overall_score = average_score(&evaluations);
    let summary = InterviewSummary {
        overall_score,
        strengths: dedupe_capped(all_strengths, MAX_SUMMARY_ITEMS),
        weaknesses: dedupe_capped(all_weaknesses, MAX_SUMMARY_ITEMS),
    };

    let coaching = evaluator
        .coach(&summary, historical_weaknesses)
        .await
        .context("Failed to generate coaching")?;

    tracing::info!(
        "Evaluated {} questions, overall score {:.2}",
        evaluations.len(),
        overall_score
    );

    Ok(EvaluationResult {
        overall_score,
        evaluations,
        strengths: summary.strengths,
        weaknesses: summary.weaknesses,
        feedback: coaching.summary_feedback,
        coaching_tips: coaching.improvement_tips,
        focus_areas: coaching.focus_areas,
        evaluated_at: Utc::now(),
    })
}

/// Mean of per-question scores rounded to two decimals; 0 with no questions.
fn average_score(evaluations: &[QuestionEvaluation]) -> f32 {
    if evaluations.is_empty() {
        return 0.0;
    }
    let total: f32 = evaluations.iter().map(|e| e.overall_score).sum();
    let avg = total / evaluations.len() as f32;
    (avg * 100.0).round() / 100.0
}

/// Drops duplicates keeping first occurrence, then keeps at most `cap` items.
pub fn dedupe_capped(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
        if out.len() == cap {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OwnerId;
    use crate::interview::{InterviewType, Level};
    use crate::llm::MockTextGenerator;

    fn record(answers: Vec<Option<&str>>) -> SessionRecord {
        SessionRecord {
            owner: OwnerId::new("u1"),
            role: "Frontend Developer".to_string(),
            level: Level::Junior,
            interview_type: InterviewType::Technical,
            tech_stack: vec!["React".to_string()],
            questions: vec!["What is JSX?".to_string(), "Explain useState.".to_string()],
            answers: answers.into_iter().map(|a| a.map(str::to_string)).collect(),
            created_at: Utc::now(),
        }
    }

    fn assessment(score: f32, strength: &str, weakness: &str) -> AnswerAssessment {
        AnswerAssessment {
            scores: CriteriaScores {
                clarity: score,
                structure: score,
                technical_depth: score,
                examples: score,
            },
            overall_score: score,
            strengths: vec![strength.to_string()],
            weaknesses: vec![weakness.to_string()],
            feedback: "ok".to_string(),
        }
    }

    #[tokio::test]
    async fn evaluates_each_answer_and_averages() {
        let mut evaluator = MockEvaluator::new();
        evaluator
            .expect_evaluate_answer()
            .withf(|_, _, q, _| q == "What is JSX?")
            .returning(|_, _, _, _| Ok(assessment(8.0, "Clear", "Brief")))
            .once();
        evaluator
            .expect_evaluate_answer()
            .withf(|_, _, q, _| q == "Explain useState.")
            .returning(|_, _, _, _| Ok(assessment(6.5, "Clear", "No example")))
            .once();
        evaluator
            .expect_coach()
            .withf(|summary, history| {
                summary.strengths == vec!["Clear".to_string()] && history.len() == 1
            })
            .returning(|_, _| {
                Ok(Coaching {
                    summary_feedback: "Solid basics.".to_string(),
                    improvement_tips: vec!["Add examples".to_string()],
                    focus_areas: vec!["Hooks".to_string()],
                })
            })
            .once();

        let result = evaluate_record(
            &evaluator,
            &record(vec![Some("Syntax sugar"), Some("State hook")]),
            &["Rambling".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(result.evaluations.len(), 2);
        assert_eq!(result.overall_score, 7.25);
        assert!((0.0..=10.0).contains(&result.overall_score));
        assert_eq!(result.weaknesses, vec!["Brief".to_string(), "No example".to_string()]);
        assert_eq!(result.feedback, "Solid basics.");
        assert_eq!(result.coaching_tips, vec!["Add examples".to_string()]);
    }

    #[tokio::test]
    async fn unanswered_questions_score_zero_without_model_call() {
        let mut evaluator = MockEvaluator::new();
        evaluator
            .expect_evaluate_answer()
            .returning(|_, _, _, _| Ok(assessment(9.0, "Precise", "None")))
            .once();
        evaluator
            .expect_coach()
            .returning(|_, _| Ok(Coaching::default()));

        let result = evaluate_record(&evaluator, &record(vec![Some("Syntax sugar")]), &[])
            .await
            .unwrap();

        assert_eq!(result.evaluations[1].overall_score, 0.0);
        assert_eq!(result.evaluations[1].feedback, NO_ANSWER_FEEDBACK);
        assert_eq!(result.overall_score, 4.5);
    }

    #[tokio::test]
    async fn failed_answer_call_fails_evaluation() {
        let mut evaluator = MockEvaluator::new();
        evaluator
            .expect_evaluate_answer()
            .returning(|_, _, _, _| Err(anyhow::anyhow!("provider down")));
        evaluator.expect_coach().never();

        let result = evaluate_record(&evaluator, &record(vec![Some("a"), Some("b")]), &[]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn llm_evaluator_clamps_scores() {
        let mut llm = MockTextGenerator::new();
        llm.expect_generate().returning(|_, _, _| {
            Ok(r#"```json
{"scores": {"clarity": 12, "structure": -1, "technical_depth": 6, "examples": 9},
 "overall_score": 11, "strengths": ["Good example"], "weaknesses": [], "feedback": "Nice"}
```"#
                .to_string())
        });
        let evaluator = LlmEvaluator::new(llm, PromptSet::default());
        let assessment = evaluator
            .evaluate_answer("Backend", "Senior", "Q", "A")
            .await
            .unwrap();
        assert_eq!(assessment.scores.clarity, 10.0);
        assert_eq!(assessment.scores.structure, 0.0);
        assert_eq!(assessment.overall_score, 10.0);
        assert_eq!(assessment.strengths, vec!["Good example".to_string()]);
    }

    #[test]
    fn dedupe_keeps_first_and_caps() {
        let items = ["a", "b", "a", " ", "c", "d"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedupe_capped(items, 3), vec!["a", "b", "c"]);
    }
}
