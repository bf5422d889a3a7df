//! Learner session state
//!
//! Progress is an immutable snapshot. Marking a question complete builds a
//! new snapshot that replaces the old one wholesale, so a renderer holding the
//! previous value never sees a half-applied update.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use brew_core::RetrievalResult;
use brew_rag::count_citations;

use crate::curriculum::{find_question, total_questions, CURRICULUM};

/// Completed questions per pillar, in curriculum order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    completed: Vec<Vec<&'static str>>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            completed: vec![Vec::new(); CURRICULUM.len()],
        }
    }
}

impl Progress {
    pub fn completed_in(&self, pillar: usize) -> &[&'static str] {
        self.completed
            .get(pillar)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_done(&self, question: &str) -> bool {
        self.completed.iter().flatten().any(|q| *q == question)
    }

    pub fn is_pillar_complete(&self, pillar: usize) -> bool {
        CURRICULUM
            .get(pillar)
            .is_some_and(|p| self.completed_in(pillar).len() >= p.questions.len())
    }

    pub fn completed_count(&self) -> usize {
        self.completed.iter().map(Vec::len).sum()
    }

    pub fn pillars_done(&self) -> usize {
        (0..CURRICULUM.len()).filter(|i| self.is_pillar_complete(*i)).count()
    }

    /// Fraction of the whole curriculum completed, in `[0, 1]`
    pub fn fraction(&self) -> f32 {
        match total_questions() {
            0 => 0.0,
            total => self.completed_count() as f32 / total as f32,
        }
    }

    /// New snapshot with `question` marked complete, plus the pillar it
    /// belongs to. `None` when the question is not in the curriculum or was
    /// already complete.
    pub fn mark_complete(&self, question: &str) -> Option<(Progress, usize)> {
        let (pillar, canonical) = find_question(question)?;
        if self.completed_in(pillar).contains(&canonical) {
            return None;
        }
        let mut next = self.clone();
        next.completed[pillar].push(canonical);
        Some((next, pillar))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Standard,
    MultiAgent,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Standard => "Standard RAG",
            Mode::MultiAgent => "Multi-Agent AI",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Standard => Mode::MultiAgent,
            Mode::MultiAgent => Mode::Standard,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The last answer shown to the learner
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub question: String,
    pub result: RetrievalResult,
    pub elapsed: Duration,
    pub mode: Mode,
    /// Wall-clock time the answer arrived, `HH:MM:SS`
    pub timestamp: String,
}

impl AnswerRecord {
    /// "Sources" count in standard mode; distinct citations in multi-agent
    /// mode, or "Multiple" when the answer cites nothing explicitly
    pub fn source_metric(&self) -> (&'static str, String) {
        match self.mode {
            Mode::Standard => ("Sources", self.result.source_documents.len().to_string()),
            Mode::MultiAgent => match count_citations(&self.result.result) {
                0 => ("Citations", "Multiple".to_string()),
                n => ("Citations", n.to_string()),
            },
        }
    }
}

/// A question newly marked complete by an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub pillar: usize,
    pub pillar_complete: bool,
}

/// Everything the portal remembers between inputs
#[derive(Debug, Default)]
pub struct SessionContext {
    pub progress: Arc<Progress>,
    pub questions_asked: usize,
    pub expanded: BTreeSet<usize>,
    pub last_answer: Option<AnswerRecord>,
    pub current_question: String,
    pub show_reset_confirm: bool,
    pub mode: Mode,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a successful answer and credit its question to the curriculum
    pub fn record_answer(&mut self, record: AnswerRecord) -> Option<ProgressUpdate> {
        let update = self.progress.mark_complete(&record.question).map(|(next, pillar)| {
            let pillar_complete = next.is_pillar_complete(pillar);
            self.progress = Arc::new(next);
            ProgressUpdate {
                pillar,
                pillar_complete,
            }
        });
        self.last_answer = Some(record);
        update
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = self.mode.toggled();
        self.mode
    }

    /// Expand a collapsed pillar or collapse an expanded one
    pub fn toggle_expanded(&mut self, pillar: usize) -> bool {
        if !self.expanded.remove(&pillar) {
            self.expanded.insert(pillar);
            return true;
        }
        false
    }

    pub fn clear_answer(&mut self) {
        self.last_answer = None;
        self.current_question.clear();
    }

    pub fn request_reset(&mut self) {
        self.show_reset_confirm = true;
    }

    pub fn cancel_reset(&mut self) {
        self.show_reset_confirm = false;
    }

    /// Forget progress and the answer panel; the selected mode is kept
    pub fn confirm_reset(&mut self) {
        self.progress = Arc::new(Progress::default());
        self.questions_asked = 0;
        self.expanded.clear();
        self.last_answer = None;
        self.current_question.clear();
        self.show_reset_confirm = false;
    }
}
