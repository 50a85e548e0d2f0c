//! Local implementations of the function tools offered to the model.

pub mod calculator;
pub mod scholar;

pub use calculator::{CalcError, calculate};
pub use scholar::{PaperRecord, PaperSearch, SemanticScholarClient, format_papers};
