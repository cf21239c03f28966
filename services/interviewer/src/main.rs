mod config;
mod console;
mod live_speech;

use crate::config::{Config, SpeechProvider};
use crate::console::{ConsoleListener, END_COMMAND};
use anyhow::{Context, Result};
use clap::Parser;
use intervu_core::evaluation::evaluate_interview;
use intervu_core::evaluator::LlmEvaluator;
use intervu_core::interview::{InterviewRecord, InterviewType, Level, RecordId, SessionConfig};
use intervu_core::prompts::PromptSet;
use intervu_core::question_source::LlmQuestionSource;
use intervu_core::runner::{EndSignal, InterviewRunner};
use intervu_core::session_state::InterviewSession;
use intervu_core::speech::{SpeechInput, SpeechOutput};
use intervu_core::store::{InterviewStore, JsonDirStore};
use intervu_core::{Command, InterviewError, SessionContext};
use intervu_gemini::GeminiClient;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Run a mock job interview")]
struct Cli {
    /// Role being interviewed for, e.g. "Frontend Developer"
    #[arg(long)]
    role: String,
    /// Seniority: junior, mid, senior or free text
    #[arg(long, default_value = "junior")]
    level: Level,
    /// technical, behavioral or mixed
    #[arg(long = "type", default_value = "technical")]
    interview_type: InterviewType,
    /// Technology to ask about; repeat for several
    #[arg(long = "stack")]
    stack: Vec<String>,
    /// Number of questions
    #[arg(long, default_value_t = 5)]
    count: u8,
    /// Who the saved interview belongs to
    #[arg(long, default_value = "local")]
    owner: String,
    /// Overrides DATA_DIR
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Score the interview once it is saved
    #[arg(long)]
    evaluate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // Logs go to stderr so they do not interleave with the interview on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_level.into()))
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Load Prompts ---
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptSet::from_dir(dir).context("Failed to load LLM prompts")?,
        None => PromptSet::default(),
    };

    // --- 5. Initialize Collaborators ---
    let data_dir = args.data_dir.clone().unwrap_or_else(|| config.data_dir.clone());
    let store = JsonDirStore::open(data_dir.clone())
        .await
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;

    let (output, input) = match config.speech_provider {
        SpeechProvider::Console => (SpeechOutput::Unavailable, SpeechInput::Unavailable),
        SpeechProvider::GeminiLive => {
            match intervu_gemini::live::connect(
                &config.gemini_live_url,
                &config.gemini_api_key,
                &config.gemini_model,
            )
            .await
            {
                Ok(client) => {
                    let (speaker, listener) = live_speech::split(client);
                    (
                        SpeechOutput::Available(Box::new(speaker)),
                        SpeechInput::Available(Box::new(listener)),
                    )
                }
                Err(e) => {
                    tracing::warn!("Gemini Live unavailable, falling back to the console: {:#}", e);
                    (SpeechOutput::Unavailable, SpeechInput::Unavailable)
                }
            }
        }
    };
    let typed_answers = !input.is_available();

    let llm = Arc::new(GeminiClient::new(config.gemini_api_key, config.gemini_model));
    let source = LlmQuestionSource::new(llm.clone(), prompts.clone());
    let evaluator = LlmEvaluator::new(llm, prompts);

    // --- 6. Wire the Runner ---
    let end = Arc::new(EndSignal::new());
    let (command_tx, command_rx) = tokio::sync::mpsc::channel::<Command>(32);
    let runner = InterviewRunner::new(output, input)
        .with_fallback(Box::new(ConsoleListener::new(
            BufReader::new(tokio::io::stdin()),
            end.clone(),
        )))
        .with_commands(command_tx)
        .with_listen_timeout(config.listen_timeout)
        .with_end_signal(end.clone());

    let printer = tokio::spawn(print_commands(command_rx, typed_answers));

    let end_on_ctrl_c = end.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, ending the interview");
            end_on_ctrl_c.request();
        }
    });

    // --- 7. Run the Interview ---
    let ctx = SessionContext::new(args.owner);
    let mut session = InterviewSession::new(
        ctx.clone(),
        SessionConfig {
            role: args.role,
            level: args.level,
            interview_type: args.interview_type,
            tech_stack: args.stack,
            question_count: args.count,
        },
    );

    let outcome = runner.run(&mut session, &source, &store).await;
    // Closing the channel lets the printer drain and stop.
    drop(runner);
    printer.await.context("Command printer task failed")?;

    let id = match outcome {
        Ok(id) => id,
        Err(InterviewError::PersistenceFailed(e)) => retry_save(&mut session, &store, e.into()).await?,
        Err(e) => return Err(e.into()),
    };
    println!("\nInterview saved as {id}");

    // --- 8. Optional Evaluation ---
    if args.evaluate {
        println!("Evaluating your answers...");
        let record = evaluate_interview(&ctx, id, &store, &evaluator).await?;
        print_evaluation(&record);
    }

    Ok(())
}

/// Renders runner commands on stdout.
async fn print_commands(mut commands: tokio::sync::mpsc::Receiver<Command>, typed_answers: bool) {
    while let Some(command) = commands.recv().await {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = render_command(&mut stdout, command, typed_answers) {
            tracing::warn!("Failed to write to the terminal: {}", e);
        }
    }
}

fn render_command(out: &mut impl Write, command: Command, typed_answers: bool) -> std::io::Result<()> {
    match command {
        Command::ShowQuestion { index, total, text } => {
            writeln!(out, "\nQuestion {}/{}: {}", index + 1, total, text)?;
            if typed_answers {
                write!(out, "Your answer ({END_COMMAND} to finish): ")?;
            }
        }
        Command::SpeakText(text) => tracing::debug!("Speaking: {}", text),
        Command::AnswerCaptured { index, answer } => match answer {
            Some(answer) => tracing::debug!("Answer {} captured ({} chars)", index + 1, answer.len()),
            None => writeln!(out, "(no answer recorded for question {})", index + 1)?,
        },
        Command::Notice(message) => writeln!(out, "! {message}")?,
        Command::SessionComplete(message) => writeln!(out, "\n{message}")?,
    }
    // The typed-answer prompt has no trailing newline.
    out.flush()
}

/// Lets the user retry a failed save until it works or they give up.
async fn retry_save<S: InterviewStore + ?Sized>(
    session: &mut InterviewSession,
    store: &S,
    mut last_error: InterviewError,
) -> Result<RecordId> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{last_error}. Press Enter to retry saving, or type q to quit: ");
        std::io::stdout().flush()?;
        match lines.next_line().await? {
            Some(line) if !line.trim().eq_ignore_ascii_case("q") => {}
            _ => anyhow::bail!("Interview was not saved"),
        }
        match session.persist(store).await {
            Ok(id) => return Ok(id),
            Err(e) => last_error = e,
        }
    }
}

fn print_evaluation(record: &InterviewRecord) {
    let Some(evaluation) = &record.evaluation else {
        return;
    };
    println!("\nOverall score: {:.2}/10", evaluation.overall_score);
    for (q, question) in evaluation.evaluations.iter().zip(&record.session.questions) {
        let c = &q.criteria;
        println!(
            "\n{}. {}\n   score {:.1} (clarity {:.1}, structure {:.1}, depth {:.1}, examples {:.1})",
            q.question_index + 1,
            question,
            q.overall_score,
            c.clarity,
            c.structure,
            c.technical_depth,
            c.examples
        );
        if !q.feedback.is_empty() {
            println!("   {}", q.feedback);
        }
    }
    print_list("Strengths", &evaluation.strengths);
    print_list("Weaknesses", &evaluation.weaknesses);
    if !evaluation.feedback.is_empty() {
        println!("\nCoach: {}", evaluation.feedback);
    }
    print_list("Tips", &evaluation.coaching_tips);
    print_list("Focus areas", &evaluation.focus_areas);
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{title}:");
    for item in items {
        println!("  - {item}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    fn question() -> Command {
        Command::ShowQuestion {
            index: 0,
            total: 2,
            text: "What is JSX?".to_string(),
        }
    }

    #[test]
    fn typed_mode_prompts_for_an_answer() {
        let mut out = Vec::new();
        render_command(&mut out, question(), true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Question 1/2: What is JSX?"));
        assert!(text.ends_with("Your answer (/end to finish): "));
    }

    #[test]
    fn spoken_mode_shows_question_only() {
        let mut out = Vec::new();
        render_command(&mut out, question(), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\nQuestion 1/2: What is JSX?\n");
    }

    #[test]
    fn flush_failures_are_reported() {
        let err = render_command(&mut BrokenPipe, question(), true).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
