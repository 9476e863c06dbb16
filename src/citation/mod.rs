pub mod determinism;
pub mod parser;
pub mod validator;

pub use determinism::{AnswerRecord, DeterminismError, hash_output, validate_deterministic};
pub use parser::{Citation, CitationParser};
pub use validator::{CitationReport, MatchKind, ValidationResult, validate};
