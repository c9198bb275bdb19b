//! Local checks applied to a query before anything is sent.

use thiserror::Error;

/// Default upper bound on a query, in characters.
pub const DEFAULT_MAX_QUERY_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the question is empty")]
    Empty,

    #[error("the question is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_chars: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_QUERY_CHARS,
        }
    }
}

impl QueryLimits {
    /// Trim `raw` and check it against the limits, returning the trimmed query.
    pub fn validate<'a>(&self, raw: &'a str) -> Result<&'a str, ValidationError> {
        let query = raw.trim();
        if query.is_empty() {
            return Err(ValidationError::Empty);
        }
        let len = query.chars().count();
        if len > self.max_chars {
            return Err(ValidationError::TooLong {
                len,
                max: self.max_chars,
            });
        }
        Ok(query)
    }
}
