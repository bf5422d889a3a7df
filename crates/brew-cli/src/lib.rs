//! Terminal front end for the coffee learning portal

mod app;
mod curriculum;
mod session;
mod ui;


pub use app::{parse_command, Command, Flow, Portal};
pub use curriculum::{find_question, question_at, Pillar, CURRICULUM};
pub use session::{AnswerRecord, Mode, Progress, ProgressUpdate, SessionContext};
pub use ui::{colorize_citations, display_banner, handle_input_with_history, render_answer, render_error};

// Re-export core types
pub use brew_core::{Error, Result};
