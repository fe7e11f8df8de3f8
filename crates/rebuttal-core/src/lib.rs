//! # rebuttal-core
//!
//! Deterministic building blocks for the rebuttal pipeline.
//!
//! This crate holds everything that does not talk to a model:
//! - Debate sides, output formats and the student submission
//! - The response shapes a model reply must be coerced into
//! - JSON Schema descriptors and the format-to-shape binding table
//! - Text rendering of a counter-argument
//!
//! ## Key Guarantees
//!
//! 1. **No network**: Nothing here performs I/O
//! 2. **Validated values**: A response shape that violates its cardinality
//!    or URL rules cannot be constructed or deserialized
//! 3. **Traceable failures**: Every rejected reply names its shape and field
//!
//! ## Example
//!
//! ```rust,ignore
//! use rebuttal_core::{OutputFormat, render_text};
//!
//! let reply = r#"{"points": [{"point": "a"}, {"point": "b"}, {"point": "c"}]}"#;
//! let counter = OutputFormat::Points.binding().coerce(reply)?;
//! println!("{}", render_text(&counter));
//! ```

pub mod render;
pub mod schema;
pub mod types;

// Re-export main types at crate root
pub use render::render_text;
pub use schema::{
    CounterArgument, CounterPoint, PointsResponse, RebuttalParagraphs, Reference,
    ReferencedParagraph, ReferencedParagraphs, ResponseBinding, ResponseSchema,
    SchemaValidationError, UnderstoodArguments,
};
pub use types::{OutputFormat, ParseTagError, Side, StudentSubmission, SubmissionError};
