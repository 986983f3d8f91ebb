//! Highlight point extraction from analysis text.

use crate::error::{WorkerError, WorkerResult};

/// One labeled highlight point parsed from the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightPoint {
    /// The letter marker, `A` through `J`
    pub label: char,
    /// The full point line, used as the query text for matching
    pub text: String,
}

/// Parse the analysis into its ordered, labeled highlight points.
///
/// A point is a line starting with a letter `A`-`J` followed by a `.`
/// delimiter; every other line is discarded. Zero parsed points is fatal:
/// it means the analysis output format was not honored, and retrying the
/// same text would parse the same way.
pub fn parse_highlight_points(analysis: &str) -> WorkerResult<Vec<HighlightPoint>> {
    let points: Vec<HighlightPoint> = analysis
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(label @ 'A'..='J'), Some('.')) => Some(HighlightPoint {
                    label,
                    text: line.to_string(),
                }),
                _ => None,
            }
        })
        .collect();

    if points.is_empty() {
        return Err(WorkerError::NoPointsExtracted);
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANALYSIS: &str = "\
**Video summary:**
A skier descends a steep couloir.

**Highlight points:**
A. [priority 1] - The jump over the rock band
B. [priority 2] - Recovery after the near fall
  C. [priority 1] - Final sprint through the finish
Some trailing commentary.
K. not a valid marker
1. numbered lists are ignored";

    #[test]
    fn test_parses_labeled_lines_only() {
        let points = parse_highlight_points(ANALYSIS).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].label, 'A');
        assert!(points[0].text.contains("jump over the rock band"));
        // Leading whitespace is tolerated.
        assert_eq!(points[2].label, 'C');
    }

    #[test]
    fn test_markers_past_j_are_discarded() {
        let points = parse_highlight_points("A. first\nJ. last\nK. beyond").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].label, 'J');
    }

    #[test]
    fn test_delimiter_is_required() {
        let err = parse_highlight_points("A first\nB) second").unwrap_err();
        assert!(matches!(err, WorkerError::NoPointsExtracted));
    }

    #[test]
    fn test_empty_analysis_is_fatal() {
        assert!(matches!(
            parse_highlight_points(""),
            Err(WorkerError::NoPointsExtracted)
        ));
    }
}
