//! Purpose: Provide the internal JSON record-stream decode entrypoints.
//! Exports: `records`, `ParseFailureCategory`, `categorize_error`, `malformed`.
//! Role: Parser boundary that centralizes serde_json stream usage and error mapping.
//! Invariants: Records are concatenated top-level values; no outer array is required.
//! Invariants: Every parse failure maps to `ErrorKind::Malformed` with line and column.

use crate::core::error::{Error, ErrorKind};
use serde::de::DeserializeOwned;
use serde_json::de::StrRead;
use serde_json::{Deserializer, StreamDeserializer};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ParseFailureCategory {
    Syntax,
    Eof,
    Data,
    Io,
}

impl ParseFailureCategory {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ParseFailureCategory::Syntax => "syntax",
            ParseFailureCategory::Eof => "unterminated-record",
            ParseFailureCategory::Data => "schema",
            ParseFailureCategory::Io => "io",
        }
    }
}

pub(crate) fn records<T: DeserializeOwned>(input: &str) -> StreamDeserializer<'_, StrRead<'_>, T> {
    Deserializer::from_str(input).into_iter::<T>()
}

pub(crate) fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    match err.classify() {
        serde_json::error::Category::Syntax => ParseFailureCategory::Syntax,
        serde_json::error::Category::Eof => ParseFailureCategory::Eof,
        serde_json::error::Category::Data => ParseFailureCategory::Data,
        serde_json::error::Category::Io => ParseFailureCategory::Io,
    }
}

pub(crate) fn malformed(err: serde_json::Error, context: &str) -> Error {
    let category = categorize_error(&err);
    let kind = if category == ParseFailureCategory::Io {
        ErrorKind::Io
    } else {
        ErrorKind::Malformed
    };
    let mut message = format!("invalid json {context}");
    if let Some(detail) = detail_without_position(&err) {
        message.push_str(": ");
        message.push_str(&detail);
    }
    Error::new(kind)
        .with_message(message)
        .with_hint(format!("parse category: {}", category.as_str()))
        .with_line(err.line() as u64)
        .with_column(err.column() as u64)
        .with_source(err)
}

// serde_json appends " at line X column Y"; the position is carried separately.
fn detail_without_position(err: &serde_json::Error) -> Option<String> {
    let text = err.to_string();
    let detail = match text.rfind(" at line ") {
        Some(pos) => &text[..pos],
        None => text.as_str(),
    };
    if detail.is_empty() {
        None
    } else {
        Some(detail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseFailureCategory, categorize_error, malformed, records};
    use crate::core::error::ErrorKind;
    use serde_json::Value;

    #[test]
    fn records_walks_concatenated_values() {
        let values: Vec<Value> = records::<Value>("{\"a\":1}\n{\"a\":2} {\"a\":3}")
            .collect::<Result<_, _>>()
            .expect("records");
        assert_eq!(values.len(), 3);
        assert_eq!(values[2]["a"], 3);
    }

    #[test]
    fn empty_input_has_no_records() {
        assert_eq!(records::<Value>("  \n\t").count(), 0);
    }

    #[test]
    fn category_mapping_distinguishes_eof_and_syntax() {
        let eof = records::<Value>("{\"a\":").next().unwrap().unwrap_err();
        assert_eq!(categorize_error(&eof), ParseFailureCategory::Eof);

        let syntax = records::<Value>("{\"a\" 1}").next().unwrap().unwrap_err();
        assert_eq!(categorize_error(&syntax), ParseFailureCategory::Syntax);
    }

    #[test]
    fn malformed_carries_position_and_category() {
        let err = records::<Value>("\n\n  {]").next().unwrap().unwrap_err();
        let err = malformed(err, "record");
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(err.line(), Some(3));
        assert!(err.column().is_some());
        assert!(err.hint().unwrap().contains("syntax"));
        assert!(!err.message().unwrap().contains(" at line "));
    }
}
