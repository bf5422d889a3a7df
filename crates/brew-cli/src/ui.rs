//! Terminal rendering and line input

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use brew_core::Result;
use brew_rag::map_citations;

use crate::curriculum::CURRICULUM;
use crate::session::{AnswerRecord, Mode, Progress, SessionContext};

const PROMPT: &str = "brew>";
const EXCERPT_CHARS: usize = 300;

/// Display startup banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = 67.min(terminal_width.saturating_sub(4)).max(20);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));
    let padded = |text: &str| {
        let pad = banner_width.saturating_sub(text.chars().count() + 4);
        format!("│  {}{}│", text, " ".repeat(pad))
    };

    println!();
    println!("{}", top_border.yellow());
    println!("{}", empty_line.yellow());
    println!("{}", padded("Coffee Learning Portal").yellow().bold());
    println!("{}", empty_line.yellow());

    let feature_lines = [
        "Grounded answers from your coffee library",
        "",
        "• Standard mode: one retrieval, one cited answer",
        "• Multi-agent mode: researcher, synthesizer, critic",
        "• Three pillars, fifteen guided questions",
        "",
        "v0.1.0",
    ];

    for line in feature_lines {
        if line.is_empty() {
            println!("{}", empty_line.yellow());
        } else {
            println!("{}", padded(line).yellow());
        }
    }

    println!("{}", empty_line.yellow());
    println!("{}", bottom_border.yellow());
    println!();
    println!(
        "{}",
        "💡 Tip: type 'pillars' to browse the curriculum, or ask anything, e.g. Why does espresso taste sour?"
            .dimmed()
    );
    println!();
}

/// Read one line, with ↑/↓ history navigation when attached to a terminal
pub async fn handle_input_with_history(history: &mut Vec<String>) -> Result<String> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok("exit".to_string());
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(input);
    }

    enable_raw_mode()?;
    let result = read_raw_line(history);
    disable_raw_mode()?;
    println!();
    result
}

fn redraw(input: &str) -> Result<()> {
    print!("\r{} {}\x1b[K", PROMPT.green().bold(), input);
    io::stdout().flush()?;
    Ok(())
}

/// Ctrl-C and Ctrl-D leave the portal
fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c' | 'C' | 'd' | 'D'))
}

fn read_raw_line(history: &mut Vec<String>) -> Result<String> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;
    redraw(&input)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        if is_interrupt(&key_event) {
            return Ok("exit".to_string());
        }
        match key_event.code {
            KeyCode::Enter => {
                let line = input.trim().to_string();
                if !line.is_empty() {
                    history.push(line.clone());
                }
                return Ok(line);
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up if !history.is_empty() => {
                let next = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(next);
                input = history[next].clone();
            }
            KeyCode::Down => match history_index {
                Some(idx) if idx + 1 < history.len() => {
                    history_index = Some(idx + 1);
                    input = history[idx + 1].clone();
                }
                Some(_) => {
                    history_index = None;
                    input.clear();
                }
                None => {}
            },
            KeyCode::Esc => return Ok(String::new()),
            _ => {}
        }
        redraw(&input)?;
    }
}

/// Highlight each `[n]` citation marker for the terminal
pub fn colorize_citations(text: &str) -> String {
    map_citations(text, |n| format!("[{}]", n).yellow().bold().to_string())
}

/// `[#####-----] 50%` style bar
pub fn progress_bar(fraction: f32, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * width as f32).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        (fraction * 100.0).round() as u32
    )
}

pub fn render_progress(progress: &Progress, questions_asked: usize) {
    println!(
        "{} {}  {} {}/{}  {} {}",
        "Progress".bold(),
        progress_bar(progress.fraction(), 20).green(),
        "Pillars done".bold(),
        progress.pillars_done(),
        CURRICULUM.len(),
        "Questions asked".bold(),
        questions_asked
    );
}

/// Curriculum browser; expanded pillars list their numbered questions
pub fn render_pillars(session: &SessionContext) {
    println!("{}", "Choose a Pillar:".bold());
    for (i, pillar) in CURRICULUM.iter().enumerate() {
        let done = session.progress.completed_in(i).len();
        let total = pillar.questions.len();
        let status = if session.progress.is_pillar_complete(i) {
            "complete".green().to_string()
        } else {
            format!("{}/{}", done, total)
        };
        let marker = if session.expanded.contains(&i) { "▾" } else { "▸" };
        println!("  {} {} {} {} ({})", marker, i + 1, pillar.icon, pillar.name.bold(), status);

        if session.expanded.contains(&i) {
            for (j, question) in pillar.questions.iter().enumerate() {
                let check = if session.progress.is_done(question) {
                    "✓".green().to_string()
                } else {
                    " ".to_string()
                };
                println!("      {} {}.{} {}", check, i + 1, j + 1, question);
            }
        }
    }
    println!(
        "{}",
        "  'open <n>' expands a pillar, 'ask <n>.<m>' loads a question, 'brew' submits it".dimmed()
    );
}

pub fn render_answer(record: &AnswerRecord) {
    println!();
    println!("{}", "☕ Your Answer".bold().yellow());
    println!("{} {}", "Question:".bold(), record.question);
    println!(
        "{} {} | {} {}",
        "Time:".bold(),
        record.timestamp,
        "Mode:".bold(),
        record.mode
    );
    println!();
    println!("{}", colorize_citations(&record.result.result));
    println!();

    let (label, value) = record.source_metric();
    println!(
        "{} {:.1}s   {} {}   {} {}",
        "⏱️  Time".dimmed(),
        record.elapsed.as_secs_f32(),
        "🔧 Mode".dimmed(),
        record.mode,
        format!("📄 {}", label).dimmed(),
        value
    );

    match record.mode {
        Mode::Standard if !record.result.source_documents.is_empty() => {
            println!();
            println!("{}", "📚 Sources".bold());
            for (i, doc) in record.result.source_documents.iter().enumerate() {
                let excerpt: String = doc.page_content.chars().take(EXCERPT_CHARS).collect();
                println!("  {} {}", format!("[{}]", i + 1).yellow(), doc.title().bold());
                println!("      {}...", excerpt.replace('\n', " ").dimmed());
            }
        }
        Mode::MultiAgent => {
            println!(
                "{}",
                "ℹ️  Multi-agent mode: sources are analysed internally by the researcher, synthesizer and critic."
                    .dimmed()
            );
        }
        _ => {}
    }
    println!();
}

/// Error panel shown when answering fails; session state stays as it was
pub fn render_error(message: &str) {
    println!("{} {}", "❌ Error:".red().bold(), message);
    println!(
        "{}",
        "💡 Check that OPENAI_API_KEY is set and the model endpoint is reachable".cyan()
    );
}

pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question and get a cited answer", "<question>".green());
    println!("  {} - Submit the loaded question", "brew".green());
    println!("  {} - Switch between standard and multi-agent mode", "mode".green());
    println!("  {} - Browse the curriculum", "pillars".green());
    println!("  {} - Expand or collapse pillar n", "open <n>".green());
    println!("  {} - Load question m of pillar n", "ask <n>.<m>".green());
    println!("  {} - Show learning progress", "progress".green());
    println!("  {} - Retrieve k passages per lookup", "k <n>".green());
    println!("  {} - Clear the current answer", "clear".green());
    println!("  {} - Reset progress (asks for confirmation)", "reset".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
}
