//! Request and response values exchanged over the execution endpoint.

use serde::{Deserialize, Serialize};

fn default_language() -> String {
    "python".to_string()
}

/// A code-execution request. The language tag is informational; only
/// Python is actually executable.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Heuristic asymptotic classification of a piece of code, derived from
/// static loop-nesting analysis. The notation is a fixed function of
/// `max_depth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub notation: String,
    pub max_depth: u32,
    pub loop_count: u32,
    pub explanation: String,
}

/// The merged result of one execution request: captured output, captured
/// error text (empty when none), and the advisory complexity report.
/// `complexity` is absent only when the analysis task itself could not
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeResponse {
    pub output: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_language_defaults_to_python() {
        let request: CodeRequest = serde_json::from_str(r#"{"code": "print(1)"}"#).unwrap();
        assert_eq!(request.language, "python");
        assert_eq!(request.code, "print(1)");
    }

    #[test]
    fn request_language_is_preserved_when_given() {
        let request: CodeRequest =
            serde_json::from_str(r#"{"code": "1", "language": "ruby"}"#).unwrap();
        assert_eq!(request.language, "ruby");
    }

    #[test]
    fn absent_complexity_is_omitted_from_response_json() {
        let response = CodeResponse {
            output: "ok\n".to_string(),
            error: String::new(),
            complexity: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("complexity").is_none());
        assert_eq!(json["output"], "ok\n");
        assert_eq!(json["error"], "");
    }
}
