use thiserror::Error;

/// A lexing or parsing failure, carrying enough context to point the user
/// at the offending part of the expression.
///
/// The rendered message follows a fixed shape:
///
/// ```text
/// Variable "foo" is not valid around position 1 for expression `foo.bar`. Did you mean "baz"?
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.render())]
pub struct SyntaxError {
    message: String,
    cursor: Option<usize>,
    expression: String,
    suggestion: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, cursor: Option<usize>, expression: impl Into<String>) -> Self {
        SyntaxError {
            message: message.into(),
            cursor,
            expression: expression.into(),
            suggestion: None,
        }
    }

    /// Attaches a "did you mean" hint: the proposal closest to `subject`,
    /// kept only when fewer than three edits away.
    pub fn with_proposals<S: AsRef<str>>(mut self, subject: &str, proposals: &[S]) -> Self {
        let mut best: Option<(usize, &str)> = None;
        for proposal in proposals {
            let proposal = proposal.as_ref();
            let distance = strsim::levenshtein(subject, proposal);
            if best.is_none_or(|(min, _)| distance < min) {
                best = Some((distance, proposal));
            }
        }
        self.suggestion = best
            .filter(|(distance, _)| *distance < 3)
            .map(|(_, guess)| guess.to_string());
        self
    }

    /// The bare message, without position or expression.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    fn render(&self) -> String {
        let mut out = self.message.strip_suffix('.').unwrap_or(&self.message).to_string();
        if let Some(cursor) = self.cursor {
            out.push_str(&format!(" around position {}", cursor));
        }
        if !self.expression.is_empty() {
            out.push_str(&format!(" for expression `{}`", self.expression));
        }
        out.push('.');
        if let Some(guess) = &self.suggestion {
            out.push_str(&format!(" Did you mean \"{}\"?", guess));
        }
        out
    }
}

/// Runtime failures that cannot be detected while parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Modulo by zero.")]
    ModuloByZero,

    /// Property, method or item access on a value that does not support it
    #[error("{0}")]
    Access(String),

    #[error("Unable to call method \"{method}\" of object \"{found}\".")]
    NotCallable { method: String, found: String },

    #[error("Regexp \"{pattern}\" passed to \"matches\" is not valid: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("The function \"{0}\" does not exist.")]
    UnknownFunction(String),

    #[error("Type error: {0}")]
    TypeError(String),

    /// Raised from inside a registered function
    #[error("{0}")]
    Function(String),
}

/// Everything the [`ExpressionLanguage`](crate::ExpressionLanguage) facade can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("Registering functions after calling evaluate(), compile() or parse() is not supported.")]
    RegistrationSealed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message() {
        assert_eq!(SyntaxError::new("Test error", None, "").to_string(), "Test error.");
    }

    #[test]
    fn test_position_and_expression() {
        let err = SyntaxError::new("Unexpected character \"#\".", Some(3), "1 +# 2");
        assert_eq!(
            err.to_string(),
            "Unexpected character \"#\" around position 3 for expression `1 +# 2`."
        );
    }

    #[test]
    fn test_closest_proposal() {
        let err = SyntaxError::new("Unknown function", Some(5), "fooo()")
            .with_proposals("fooo", &["foo", "foobar", "completely_different"]);
        assert_eq!(err.suggestion(), Some("foo"));
        assert!(err.to_string().ends_with("Did you mean \"foo\"?"));
    }

    #[test]
    fn test_distant_proposal_ignored() {
        let err = SyntaxError::new("Unknown function", Some(5), "verydifferentstring()")
            .with_proposals("verydifferentstring", &["foo", "bar", "baz"]);
        assert!(!err.to_string().contains("Did you mean"));

        let empty: [&str; 0] = [];
        let err = SyntaxError::new("Test error", Some(5), "x").with_proposals("subject", &empty);
        assert_eq!(err.suggestion(), None);
    }
}
