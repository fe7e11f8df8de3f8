//! Output format to response shape dispatch.

use serde_json::Value;

use super::{
    CounterArgument, DescriptorId, PointsResponse, RebuttalParagraphs, ReferencedParagraphs,
    ResponseSchema, SchemaValidationError,
};
use crate::types::OutputFormat;

/// Coerces a raw reply into the bound shape.
pub type CoerceFn = fn(&str) -> Result<CounterArgument, SchemaValidationError>;

/// Everything Stage 2 needs to know about one output format.
#[derive(Debug)]
pub struct ResponseBinding {
    pub format: OutputFormat,
    pub shape: &'static str,
    pub descriptor: DescriptorId,
    pub coerce: CoerceFn,
}

impl ResponseBinding {
    /// The JSON Schema shown to the model for this format.
    pub fn schema(&self) -> Result<&'static Value, SchemaValidationError> {
        Ok(super::descriptor(self.descriptor)?.document())
    }

    /// Validate-or-reject a raw reply for this format.
    pub fn coerce(&self, reply: &str) -> Result<CounterArgument, SchemaValidationError> {
        (self.coerce)(reply)
    }
}

static BINDINGS: [ResponseBinding; 3] = [
    ResponseBinding {
        format: OutputFormat::Points,
        shape: "PointsResponse",
        descriptor: DescriptorId::Points,
        coerce: coerce_points,
    },
    ResponseBinding {
        format: OutputFormat::RebuttalParagraphs,
        shape: "RebuttalParagraphs",
        descriptor: DescriptorId::RebuttalParagraphs,
        coerce: coerce_rebuttal_paragraphs,
    },
    ResponseBinding {
        format: OutputFormat::ReferencedParagraphs,
        shape: "ReferencedParagraphs",
        descriptor: DescriptorId::ReferencedParagraphs,
        coerce: coerce_referenced_paragraphs,
    },
];

fn coerce_points(reply: &str) -> Result<CounterArgument, SchemaValidationError> {
    PointsResponse::coerce(reply).map(CounterArgument::Points)
}

fn coerce_rebuttal_paragraphs(reply: &str) -> Result<CounterArgument, SchemaValidationError> {
    RebuttalParagraphs::coerce(reply).map(CounterArgument::RebuttalParagraphs)
}

fn coerce_referenced_paragraphs(reply: &str) -> Result<CounterArgument, SchemaValidationError> {
    ReferencedParagraphs::coerce(reply).map(CounterArgument::ReferencedParagraphs)
}

impl OutputFormat {
    /// The response binding for this format.
    pub fn binding(self) -> &'static ResponseBinding {
        match self {
            OutputFormat::Points => &BINDINGS[0],
            OutputFormat::RebuttalParagraphs => &BINDINGS[1],
            OutputFormat::ReferencedParagraphs => &BINDINGS[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_binds_to_itself() {
        for format in OutputFormat::ALL {
            let binding = format.binding();
            assert_eq!(binding.format, format);
            assert_eq!(binding.shape, binding.descriptor.shape());
            assert!(binding.schema().is_ok());
        }
    }

    #[test]
    fn test_binding_produces_matching_variant() {
        let points = r#"{"points": [{"point": "a"}, {"point": "b"}, {"point": "c"}]}"#;
        let paragraphs = r#"{"paragraphs": ["first", "second"]}"#;
        let referenced = r#"{"paragraphs": [
            {"text": "first", "references": [{"url": "https://a.org"}]},
            {"text": "second", "references": [{"url": "https://b.org", "label": "B"}]}
        ]}"#;

        for (format, reply) in [
            (OutputFormat::Points, points),
            (OutputFormat::RebuttalParagraphs, paragraphs),
            (OutputFormat::ReferencedParagraphs, referenced),
        ] {
            let value = format.binding().coerce(reply).unwrap();
            assert_eq!(value.format(), format);
        }
    }

    #[test]
    fn test_binding_rejects_other_shapes() {
        let paragraphs = r#"{"paragraphs": ["first", "second"]}"#;
        let err = OutputFormat::Points.binding().coerce(paragraphs).unwrap_err();
        assert_eq!(err.shape(), "PointsResponse");
        assert_eq!(err.field(), Some("points"));
    }
}
