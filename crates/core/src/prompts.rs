use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const QUESTION_GENERATION: &str = "question_generation";
pub const ANSWER_EVALUATION: &str = "answer_evaluation";
pub const COACHING: &str = "coaching";

const DEFAULT_QUESTION_GENERATION: &str = r#"Prepare questions for a job interview.
The job role is {role}.
The job experience level is {level}.
The tech stack used in the job is: {techstack}.
The focus between behavioural and technical questions should lean towards: {type}.
The amount of questions required is: {count}.

Return ONLY the questions, without any additional text, as a JSON array of strings:
["Question 1", "Question 2", "Question 3"]

The questions are going to be read by a voice assistant, so do not use "/" or "*" or any other special characters which might break the voice assistant."#;

const DEFAULT_ANSWER_EVALUATION: &str = r#"You are an expert technical interviewer. Evaluate this interview answer.

Role: {role}
Level: {level}

Question: {question}

Answer: {answer}

Evaluate the answer on these criteria (score 0-10 each):
1. Clarity - How clear and well-articulated is the answer?
2. Structure - Is the answer well-organized (e.g., STAR method for behavioral)?
3. Technical Depth - Does it show appropriate technical knowledge for the level?
4. Examples - Does it include concrete examples or evidence?

Also identify strengths (what they did well) and weaknesses (what could be improved).

Return ONLY valid JSON in this format:
{"scores": {"clarity": 8, "structure": 7, "technical_depth": 6, "examples": 9}, "overall_score": 7.5, "strengths": ["..."], "weaknesses": ["..."], "feedback": "Short 2-3 sentence overall feedback"}

Be constructive but honest in your evaluation."#;

const DEFAULT_COACHING: &str = r#"You are an expert interview coach. Provide actionable coaching based on this evaluation.

Evaluation:
- Overall Score: {overall_score}/10
- Strengths: {strengths}
- Current Weaknesses: {weaknesses}
- Historical Weaknesses: {historical_weaknesses}

Return ONLY valid JSON in this format:
{"summary_feedback": "2-3 sentence summary of performance", "improvement_tips": ["Specific tip 1", "Specific tip 2", "Specific tip 3"], "focus_areas": ["Area 1", "Area 2"]}

Make tips specific and actionable, prioritize recurring historical weaknesses, and stay encouraging but honest."#;

/// Reads every `*.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content);
        }
    }

    Ok(prompts)
}

/// Prompt templates with `{placeholder}` slots.
#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<String, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let templates = [
            (QUESTION_GENERATION, DEFAULT_QUESTION_GENERATION),
            (ANSWER_EVALUATION, DEFAULT_ANSWER_EVALUATION),
            (COACHING, DEFAULT_COACHING),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { templates }
    }
}

impl PromptSet {
    /// Built-in templates overridden by any `*.md` files found in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut set = Self::default();
        let loaded = load_prompts(dir)?;
        tracing::info!("Loaded {} prompt overrides from {}", loaded.len(), dir.display());
        set.templates.extend(loaded);
        Ok(set)
    }

    /// Fills `{key}` slots in the named template. Unknown slots are left as-is.
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .with_context(|| format!("No prompt template named '{name}'"))?;
        let mut out = template.clone();
        for (key, value) in vars {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        Ok(out)
    }
}
