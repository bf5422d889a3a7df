//! Interactive portal loop

use colored::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use brew_core::{Result, RetrievalResult};
use brew_rag::{AgentPipeline, Retriever};

use crate::curriculum::{question_at, CURRICULUM};
use crate::session::{AnswerRecord, Mode, SessionContext};
use crate::ui;

/// One parsed line of learner input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free text: load it as the current question and submit
    Ask(String),
    /// Submit the loaded question
    Submit,
    ToggleMode,
    Pillars,
    TogglePillar(usize),
    Load { pillar: usize, question: usize },
    Progress,
    SetK(usize),
    Clear,
    Reset,
    Confirm(bool),
    Help,
    Exit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head.to_lowercase(), rest.trim()),
        None => (line.to_lowercase(), ""),
    };

    match (head.as_str(), rest) {
        ("exit" | "quit", "") => Command::Exit,
        ("help", "") => Command::Help,
        ("brew" | "submit", "") => Command::Submit,
        ("mode", "") => Command::ToggleMode,
        ("pillars", "") => Command::Pillars,
        ("progress", "") => Command::Progress,
        ("clear", "") => Command::Clear,
        ("reset", "") => Command::Reset,
        ("yes" | "y", "") => Command::Confirm(true),
        ("no" | "n", "") => Command::Confirm(false),
        ("open", n) => match n.parse::<usize>() {
            Ok(n) if (1..=CURRICULUM.len()).contains(&n) => Command::TogglePillar(n - 1),
            Ok(n) => Command::Invalid(format!("no pillar {}", n)),
            Err(_) => Command::Ask(line.to_string()),
        },
        ("ask", "") => Command::Invalid("usage: ask <question> or ask <n>.<m>".to_string()),
        ("ask", arg) => match parse_question_ref(arg) {
            Some((pillar, question)) => Command::Load { pillar, question },
            None => Command::Ask(arg.to_string()),
        },
        ("k", n) => match n.parse::<usize>() {
            Ok(0) => Command::Invalid("k must be a positive number".to_string()),
            Ok(k) => Command::SetK(k),
            Err(_) => Command::Ask(line.to_string()),
        },
        _ => Command::Ask(line.to_string()),
    }
}

/// `2.3` → `(2, 3)` when it names a curriculum question
fn parse_question_ref(arg: &str) -> Option<(usize, usize)> {
    let (p, q) = arg.split_once('.')?;
    let (p, q) = (p.trim().parse().ok()?, q.trim().parse().ok()?);
    question_at(p, q).map(|_| (p, q))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Portal {
    retriever: Arc<Retriever>,
    pipeline: Arc<AgentPipeline>,
    session: SessionContext,
    history: Vec<String>,
}

impl Portal {
    pub fn new(retriever: Arc<Retriever>, pipeline: Arc<AgentPipeline>) -> Self {
        Self {
            retriever,
            pipeline,
            session: SessionContext::new(),
            history: Vec::new(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn run(&mut self) -> Result<()> {
        ui::display_banner();
        ui::render_progress(&self.session.progress, self.session.questions_asked);
        println!();

        loop {
            let line = ui::handle_input_with_history(&mut self.history).await?;
            if self.handle(parse_command(&line)).await == Flow::Exit {
                println!("{}", "Goodbye! ☕".yellow());
                return Ok(());
            }
        }
    }

    pub async fn handle(&mut self, command: Command) -> Flow {
        if self.session.show_reset_confirm {
            match command {
                Command::Confirm(true) => {
                    self.session.confirm_reset();
                    println!("{}", "✅ Progress reset".green());
                    return Flow::Continue;
                }
                Command::Confirm(false) => {
                    self.session.cancel_reset();
                    println!("{}", "Reset cancelled".dimmed());
                    return Flow::Continue;
                }
                _ => self.session.cancel_reset(),
            }
        }

        match command {
            Command::Exit => return Flow::Exit,
            Command::Empty => {}
            Command::Help => ui::print_help(),
            Command::Ask(question) => {
                self.session.current_question = question;
                self.submit().await;
            }
            Command::Submit => self.submit().await,
            Command::ToggleMode => {
                let mode = self.session.toggle_mode();
                let hint = match mode {
                    Mode::Standard => "~5-15 sec",
                    Mode::MultiAgent => "~20-40 sec",
                };
                println!("{} {} ({})", "Mode:".bold(), mode, hint.dimmed());
            }
            Command::Pillars => ui::render_pillars(&self.session),
            Command::TogglePillar(pillar) => {
                self.session.toggle_expanded(pillar);
                ui::render_pillars(&self.session);
            }
            Command::Load { pillar, question } => {
                if let Some(q) = question_at(pillar, question) {
                    self.session.current_question = q.to_string();
                    println!("{} {}", "Loaded:".bold(), q);
                    println!("{}", "Type 'brew' to get the answer".dimmed());
                }
            }
            Command::Progress => {
                ui::render_progress(&self.session.progress, self.session.questions_asked)
            }
            Command::SetK(k) => {
                self.retriever.set_k(k);
                println!("{} {}", "Retrieval k:".bold(), self.retriever.k());
            }
            Command::Clear => {
                self.session.clear_answer();
                println!("{}", "Answer cleared".dimmed());
            }
            Command::Reset => {
                self.session.request_reset();
                println!("{}", "⚠️  Are you sure? Type 'yes' to reset progress or 'no' to keep it".yellow());
            }
            Command::Confirm(_) => println!("{}", "Nothing to confirm".dimmed()),
            Command::Invalid(reason) => println!("{} {}", "⚠️".yellow(), reason),
        }
        Flow::Continue
    }

    /// Answer the loaded question in the selected mode. A failure leaves the
    /// answer panel and progress untouched.
    pub async fn submit(&mut self) {
        let question = self.session.current_question.trim().to_string();
        if question.is_empty() {
            println!("{}", "Type a question first, or load one with 'ask <n>.<m>'".dimmed());
            return;
        }

        self.session.questions_asked += 1;
        let mode = self.session.mode;
        match mode {
            Mode::Standard => println!("{}", "☕ Brewing your answer...".dimmed()),
            Mode::MultiAgent => println!(
                "{}",
                "🧠 Researcher, synthesizer and critic at work...".dimmed()
            ),
        }

        let started = Instant::now();
        match self.answer(&question, mode).await {
            Ok(result) => {
                let record = AnswerRecord {
                    question,
                    result,
                    elapsed: started.elapsed(),
                    mode,
                    timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
                };
                info!(mode = %mode, elapsed_ms = record.elapsed.as_millis() as u64, "Answered");
                ui::render_answer(&record);

                if let Some(update) = self.session.record_answer(record) {
                    let pillar = &CURRICULUM[update.pillar];
                    println!("{} {}", "✅ Progress saved in".green(), pillar.short_name.bold());
                    if update.pillar_complete {
                        println!("{} {}!", "🎉 You completed".green().bold(), pillar.short_name.bold());
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Answering failed");
                ui::render_error(&e.to_string());
            }
        }
    }

    async fn answer(&self, question: &str, mode: Mode) -> Result<RetrievalResult> {
        match mode {
            Mode::Standard => self.retriever.qa(question).await,
            Mode::MultiAgent => Ok(self.pipeline.run(question).await?.into_retrieval()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_text_is_a_question() {
        assert_eq!(
            parse_command("Why does espresso taste sour?"),
            Command::Ask("Why does espresso taste sour?".to_string())
        );
        assert_eq!(
            parse_command("help me dial in a grinder"),
            Command::Ask("help me dial in a grinder".to_string())
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse_command("  EXIT "), Command::Exit);
        assert_eq!(parse_command("brew"), Command::Submit);
        assert_eq!(parse_command("mode"), Command::ToggleMode);
        assert_eq!(parse_command("yes"), Command::Confirm(true));
        assert_eq!(parse_command(""), Command::Empty);
    }

    #[test]
    fn test_pillar_and_question_refs() {
        assert_eq!(parse_command("open 2"), Command::TogglePillar(1));
        assert!(matches!(parse_command("open 9"), Command::Invalid(_)));
        assert_eq!(
            parse_command("ask 3.2"),
            Command::Load {
                pillar: 3,
                question: 2
            }
        );
        assert_eq!(
            parse_command("ask about crema"),
            Command::Ask("about crema".to_string())
        );
    }

    #[test]
    fn test_k_command() {
        assert_eq!(parse_command("k 5"), Command::SetK(5));
        assert!(matches!(parse_command("k 0"), Command::Invalid(_)));
    }

    #[test]
    fn test_questions_starting_with_command_words_are_answered() {
        let open = "Open or closed portafilter baskets: which extracts more evenly?";
        assert_eq!(parse_command(open), Command::Ask(open.to_string()));

        let k_cups = "K cups vs pour over: which tastes better?";
        assert_eq!(parse_command(k_cups), Command::Ask(k_cups.to_string()));

        assert_eq!(parse_command("open"), Command::Ask("open".to_string()));
    }

    #[test]
    fn test_bare_ask_is_a_usage_hint() {
        assert!(matches!(parse_command("ask"), Command::Invalid(_)));
        assert!(matches!(parse_command("  ASK  "), Command::Invalid(_)));
    }
}
