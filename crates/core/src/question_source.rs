use crate::interview::SessionConfig;
use crate::llm::{ReplyFormat, TextGenerator};
use crate::prompts::{PromptSet, QUESTION_GENERATION};
use anyhow::{Context, Result};
use async_trait::async_trait;
use intervu_gemini::strip_code_fences;
#[cfg(test)]
use mockall::automock;

/// Produces the ordered questions for a session.
///
/// An empty list is a valid reply; the session treats it as "no questions
/// available".
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn generate(&self, config: &SessionConfig) -> Result<Vec<String>>;
}

/// Question source backed by a language model.
pub struct LlmQuestionSource<G> {
    llm: G,
    prompts: PromptSet,
}

impl<G: TextGenerator> LlmQuestionSource<G> {
    pub fn new(llm: G, prompts: PromptSet) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait]
impl<G: TextGenerator> QuestionSource for LlmQuestionSource<G> {
    async fn generate(&self, config: &SessionConfig) -> Result<Vec<String>> {
        let techstack = config.tech_stack.join(", ");
        let level = config.level.to_string();
        let interview_type = config.interview_type.to_string();
        let count = config.question_count.to_string();
        let prompt = self.prompts.render(
            QUESTION_GENERATION,
            &[
                ("role", &config.role),
                ("level", &level),
                ("techstack", &techstack),
                ("type", &interview_type),
                ("count", &count),
            ],
        )?;

        let reply = self
            .llm
            .generate(&prompt, 0.7, ReplyFormat::Json)
            .await
            .context("Question generation call failed")?;

        let mut questions = parse_questions(&reply);
        questions.truncate(config.question_count as usize);
        tracing::info!(
            "Generated {} of {} requested questions for '{}'",
            questions.len(),
            config.question_count,
            config.role
        );
        Ok(questions)
    }
}

/// Parses a model reply into questions.
///
/// Accepts a JSON array of strings, or failing that a numbered or bulleted
/// list with one question per line.
pub fn parse_questions(reply: &str) -> Vec<String> {
    let body = strip_code_fences(reply);
    if let Ok(items) = serde_json::from_str::<Vec<String>>(body) {
        return items
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
    }

    body.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches(['-', '*', '•']).trim_start();
            // Strip a leading "1." or "1)" marker.
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits > 0 {
                let rest = &line[digits..];
                if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
                    return rest.trim().to_string();
                }
            }
            line.to_string()
        })
        .filter(|q| !q.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::{InterviewType, Level};
    use crate::llm::MockTextGenerator;

    fn config(count: u8) -> SessionConfig {
        SessionConfig {
            role: "Frontend Developer".to_string(),
            level: Level::Junior,
            interview_type: InterviewType::Technical,
            tech_stack: vec!["React".to_string()],
            question_count: count,
        }
    }

    #[test]
    fn parses_json_array() {
        let reply = "```json\n[\"What is JSX?\", \" Explain useState. \", \"\"]\n```";
        assert_eq!(
            parse_questions(reply),
            vec!["What is JSX?".to_string(), "Explain useState.".to_string()]
        );
    }

    #[test]
    fn falls_back_to_numbered_list() {
        let reply = "1. What is JSX?\n2) Explain useState.\n\n- What is a hook?";
        assert_eq!(
            parse_questions(reply),
            vec![
                "What is JSX?".to_string(),
                "Explain useState.".to_string(),
                "What is a hook?".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn generate_renders_prompt_and_truncates() {
        let mut llm = MockTextGenerator::new();
        llm.expect_generate()
            .withf(|prompt, _, format| {
                prompt.contains("Frontend Developer")
                    && prompt.contains("React")
                    && *format == ReplyFormat::Json
            })
            .returning(|_, _, _| Ok(r#"["Q1", "Q2", "Q3"]"#.to_string()))
            .once();

        let source = LlmQuestionSource::new(llm, PromptSet::default());
        let questions = source.generate(&config(2)).await.unwrap();
        assert_eq!(questions, vec!["Q1".to_string(), "Q2".to_string()]);
    }

    #[tokio::test]
    async fn generate_propagates_model_errors() {
        let mut llm = MockTextGenerator::new();
        llm.expect_generate()
            .returning(|_, _, _| Err(anyhow::anyhow!("quota exceeded")));

        let source = LlmQuestionSource::new(llm, PromptSet::default());
        assert!(source.generate(&config(2)).await.is_err());
    }
}
