//! Quiz-taking engine: session state machine, clock, and runner.

mod runner;
mod session;
mod timer;

pub use runner::QuizRunner;
pub use session::{QuizResult, QuizSession, QuizState, format_elapsed};
pub use timer::{QuizTimer, TICK};
