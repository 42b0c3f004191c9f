//! Result type for pattern-matched command responses.

use regex::Regex;

/// Outcome of a pattern-matched command exchange.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The full device output the pattern was found in.
    pub output: String,

    /// The text the pattern matched.
    pub matched: String,

    /// Captured groups, in pattern order. Groups that did not
    /// participate in the match are empty.
    pub captures: Vec<String>,
}

impl MatchResult {
    /// Run the pattern over the output, returning the result on a match.
    pub fn find(pattern: &Regex, output: &str) -> Option<Self> {
        let caps = pattern.captures(output)?;
        let matched = caps
            .get(0)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let captures = caps
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        Some(Self {
            output: output.to_string(),
            matched,
            captures,
        })
    }

    /// Get a captured group by index. Index 0 is the first group, not
    /// the whole match.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_extracts_match_and_captures() {
        let pattern = Regex::new(r"Current = ([0-9]+)").unwrap();
        let result = MatchResult::find(&pattern, "noise\r\nCurrent = 128\r\n> ").unwrap();
        assert_eq!(result.matched, "Current = 128");
        assert_eq!(result.capture(0), Some("128"));
        assert_eq!(result.capture(1), None);
        assert!(result.output.contains("noise"));
    }

    #[test]
    fn test_find_returns_none_without_match() {
        let pattern = Regex::new(r"Current = ([0-9]+)").unwrap();
        assert!(MatchResult::find(&pattern, "no reading here").is_none());
    }

    #[test]
    fn test_unmatched_group_is_empty() {
        let pattern = Regex::new(r"a([0-9]+)|b([0-9]+)").unwrap();
        let result = MatchResult::find(&pattern, "b42").unwrap();
        assert_eq!(result.capture(0), Some(""));
        assert_eq!(result.capture(1), Some("42"));
    }
}
