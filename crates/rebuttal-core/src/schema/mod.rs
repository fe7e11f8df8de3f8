//! Response schemas and structured-output validation.
//!
//! Every model reply is treated as untrusted text. It is accepted only after
//! passing through [`ResponseSchema::coerce`]:
//!
//! 1. Extract the JSON object (a surrounding Markdown fence is tolerated)
//! 2. Check it against the embedded JSON Schema descriptor
//! 3. Deserialize and enforce the Rust-side invariants
//!
//! A failure at any step is a [`SchemaValidationError`] naming the shape,
//! the field and the constraint. Nothing is "best-effort parsed".

mod binding;
mod descriptors;
mod responses;

pub use binding::ResponseBinding;
pub use descriptors::{descriptor, Descriptor, DescriptorId};
pub use responses::{
    CounterArgument, CounterPoint, PointsResponse, RebuttalParagraphs, Reference,
    ReferencedParagraph, ReferencedParagraphs, UnderstoodArguments,
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

lazy_static! {
    static ref FENCED_JSON: Regex =
        Regex::new(r"(?s)```(?:json|JSON)?\s*(?P<body>\{.*?\})\s*```").expect("Invalid regex");
}

/// Errors from validating a reply against a response shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaValidationError {
    #[error("{shape}: reply is not a JSON object: {message}")]
    MalformedJson {
        shape: &'static str,
        message: String,
    },

    #[error("{shape}: field `{field}` violates {constraint}")]
    ConstraintViolated {
        shape: &'static str,
        field: String,
        constraint: String,
    },

    #[error("Failed to load schema for {shape}: {message}")]
    SchemaLoad {
        shape: &'static str,
        message: String,
    },
}

impl SchemaValidationError {
    pub(crate) fn violated(
        shape: &'static str,
        field: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        SchemaValidationError::ConstraintViolated {
            shape,
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// The shape that failed.
    pub fn shape(&self) -> &'static str {
        match self {
            SchemaValidationError::MalformedJson { shape, .. }
            | SchemaValidationError::ConstraintViolated { shape, .. }
            | SchemaValidationError::SchemaLoad { shape, .. } => shape,
        }
    }

    /// The offending field, when the reply parsed far enough to have one.
    ///
    /// `$` denotes the reply as a whole.
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaValidationError::MalformedJson { .. } => Some("$"),
            SchemaValidationError::ConstraintViolated { field, .. } => Some(field),
            SchemaValidationError::SchemaLoad { .. } => None,
        }
    }
}

/// A shape a model reply can be coerced into.
pub trait ResponseSchema: Sized {
    /// Descriptor the reply is checked against.
    const DESCRIPTOR: DescriptorId;

    /// Build the value from a schema-checked JSON document.
    fn from_value(value: Value) -> Result<Self, SchemaValidationError>;

    /// Shape name used in errors and prompts.
    fn name() -> &'static str {
        Self::DESCRIPTOR.shape()
    }

    /// The JSON Schema document shown to the model.
    fn schema() -> Result<&'static Value, SchemaValidationError> {
        Ok(descriptor(Self::DESCRIPTOR)?.document())
    }

    /// Validate-or-reject a raw model reply.
    fn coerce(reply: &str) -> Result<Self, SchemaValidationError> {
        let descriptor = descriptor(Self::DESCRIPTOR)?;
        let value = parse_reply(Self::name(), reply)?;
        descriptor.check(&value)?;
        Self::from_value(value)
    }
}

/// Extract and parse the JSON object carried by a model reply.
pub fn parse_reply(shape: &'static str, reply: &str) -> Result<Value, SchemaValidationError> {
    let body = extract_json_object(reply).ok_or_else(|| SchemaValidationError::MalformedJson {
        shape,
        message: "no JSON object found in reply".to_string(),
    })?;

    let value: Value =
        serde_json::from_str(body).map_err(|e| SchemaValidationError::MalformedJson {
            shape,
            message: e.to_string(),
        })?;

    if !value.is_object() {
        return Err(SchemaValidationError::MalformedJson {
            shape,
            message: "top-level value is not an object".to_string(),
        });
    }

    Ok(value)
}

/// Locate the JSON object in a reply: a fenced block first, then the
/// outermost braces.
fn extract_json_object(reply: &str) -> Option<&str> {
    if let Some(caps) = FENCED_JSON.captures(reply) {
        return caps.name("body").map(|m| m.as_str());
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

/// Deserialize a schema-checked document into its wire form.
pub(crate) fn from_wire<T: DeserializeOwned>(
    shape: &'static str,
    value: Value,
) -> Result<T, SchemaValidationError> {
    serde_json::from_value(value)
        .map_err(|e| SchemaValidationError::violated(shape, "$", e.to_string()))
}
