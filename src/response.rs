//! Field extraction from modem response lines.
//!
//! Modems answer some commands with a comma-separated line such as
//! `1,4,0,"01410001","52.59.84.1",10104`. Commas inside double quotes are
//! part of the field, and the quotes around a field are dropped.

use thiserror::Error;

use crate::decode::ErrorCategory;

/// Position of the data field in a response line.
pub const DATA_FIELD: usize = 3;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Response has {fields} fields, so field {index} was not found")]
    NotFound { index: usize, fields: usize },
    #[error("Response has an unterminated quote")]
    UnterminatedQuote,
}

impl ResponseError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::ConstraintViolation,
            Self::UnterminatedQuote => ErrorCategory::InvalidEncoding,
        }
    }
}

/// Splits a line on the commas that are not inside double quotes.
///
/// A trailing empty field (after a final comma) is not counted.
pub fn split_fields(line: &str) -> Result<Vec<&str>, ResponseError> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(ResponseError::UnterminatedQuote);
    }
    if start < line.len() {
        fields.push(&line[start..]);
    }
    Ok(fields)
}

/// Returns field `index` of `line`, without its surrounding quotes.
pub fn response_field(line: &str, index: usize) -> Result<&str, ResponseError> {
    let fields = split_fields(line)?;
    fields
        .get(index)
        .map(|field| field.trim_matches('"'))
        .ok_or(ResponseError::NotFound {
            index,
            fields: fields.len(),
        })
}

/// Returns the data field (the fourth) of a response line.
pub fn parse_response_data(line: &str) -> Result<&str, ResponseError> {
    response_field(line, DATA_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourth_field() {
        assert_eq!(
            parse_response_data(r#"1,4,0,"01410001","52.59.84.1",10104"#),
            Ok("01410001")
        );
    }

    #[test]
    fn commas_inside_quotes() {
        let line = r#"a,"b,c",d,"e,f,g",h"#;

        assert_eq!(split_fields(line).unwrap(), [r#"a"#, r#""b,c""#, "d", r#""e,f,g""#, "h"]);
        assert_eq!(parse_response_data(line), Ok("e,f,g"));
    }

    #[test]
    fn too_few_fields() {
        assert_eq!(
            parse_response_data("1,2,3"),
            Err(ResponseError::NotFound {
                index: 3,
                fields: 3
            })
        );
        assert_eq!(
            parse_response_data(""),
            Err(ResponseError::NotFound {
                index: 3,
                fields: 0
            })
        );
    }

    #[test]
    fn empty_fields_count() {
        assert_eq!(parse_response_data(",,,x"), Ok("x"));
        assert_eq!(response_field("a,,b", 1), Ok(""));
    }

    #[test]
    fn unterminated_quote() {
        let err = parse_response_data(r#"1,2,3,"abc"#).unwrap_err();

        assert_eq!(err, ResponseError::UnterminatedQuote);
        assert_eq!(err.category(), ErrorCategory::InvalidEncoding);
    }
}
