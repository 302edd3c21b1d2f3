//! Query request types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Message returned when `/ask` is called without a question
pub const NO_QUESTION: &str = "No question provided.";

/// Body of `POST /ask`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    #[serde(default)]
    pub question: Option<String>,

    /// Number of chunks to retrieve (default from configuration)
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AskRequest {
    /// Create a request for a question
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            top_k: None,
        }
    }

    /// Read a request body leniently.
    ///
    /// A body that is not a JSON object, or whose `question` is not a string,
    /// yields no question. A `top_k` that is present but not a non-negative
    /// integer is rejected once a question is known to be present.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        let mut request = Self {
            question: value
                .get("question")
                .and_then(Value::as_str)
                .map(str::to_string),
            top_k: None,
        };
        request.question()?;

        request.top_k = match value.get("top_k") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                raw.as_u64()
                    .and_then(|k| usize::try_from(k).ok())
                    .ok_or_else(|| Error::BadRequest(format!(
                        "Invalid top_k {}: expected a non-negative integer.",
                        raw
                    )))?,
            ),
        };

        Ok(request)
    }

    /// The trimmed question, or a bad request error when missing or blank
    pub fn question(&self) -> Result<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::BadRequest(NO_QUESTION.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_question_rejected() {
        let req: AskRequest = serde_json::from_str(r#"{"question": "   "}"#).unwrap();
        assert_eq!(req.question().unwrap_err().to_string(), NO_QUESTION);

        let req: AskRequest = serde_json::from_str("{}").unwrap();
        assert!(req.question().is_err());
    }

    #[test]
    fn test_body_keeps_question_when_other_fields_are_odd() {
        let req = AskRequest::from_body(br#"{"question": "What is V1?", "extra": [1, 2]}"#).unwrap();
        assert_eq!(req.question().unwrap(), "What is V1?");
        assert_eq!(req.top_k, None);

        let req = AskRequest::from_body(br#"{"question": "What is V1?", "top_k": 3}"#).unwrap();
        assert_eq!(req.top_k, Some(3));

        let req = AskRequest::from_body(br#"{"question": "What is V1?", "top_k": null}"#).unwrap();
        assert_eq!(req.top_k, None);
    }

    #[test]
    fn test_body_with_invalid_top_k_is_rejected() {
        for body in [
            r#"{"question": "What is V1?", "top_k": "3"}"#,
            r#"{"question": "What is V1?", "top_k": -1}"#,
            r#"{"question": "What is V1?", "top_k": 2.5}"#,
        ] {
            let err = AskRequest::from_body(body.as_bytes()).unwrap_err();
            assert!(matches!(err, Error::BadRequest(ref m) if m.contains("top_k")), "{body}");
        }
    }

    #[test]
    fn test_body_without_question_reports_missing_question() {
        for body in ["", "not json", "[1]", r#"{"question": 42}"#, r#"{"top_k": "x"}"#] {
            let err = AskRequest::from_body(body.as_bytes()).unwrap_err();
            assert_eq!(err.to_string(), NO_QUESTION, "{body}");
        }
    }

    #[test]
    fn test_question_is_trimmed() {
        let req = AskRequest::new("  What is the APU bleed limit? ");
        assert_eq!(req.question().unwrap(), "What is the APU bleed limit?");
    }
}
