//! tide-interp — shell-style variable interpolation.
//!
//! Resolves `$NAME` and `${NAME}` references in arbitrary text, including
//! the `-`, `:-`, `+`, `:+`, `?` and `:?` operators of the braced form.
//! `$$` yields a literal `$`.
//!
//! # Evaluation
//!
//! The text is tokenized into literals and references. The leftmost
//! reference is resolved, its value spliced in, and the text re-scanned
//! from the start. A braced reference whose argument still contains a
//! `{` is not a token yet, so `${A:-${B:-${C}}}` resolves inside-out.
//! Evaluation ends when a scan yields no reference.

pub mod engine;
pub mod error;
pub mod token;

pub use engine::{interpolate, resolve, Lookup, MAX_SUBSTITUTIONS};
pub use error::{InterpolationError, InterpolationResult};
pub use token::{tokenize, Operator, Reference, Token, Tokenizer};
