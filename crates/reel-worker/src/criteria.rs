//! Prompt templates and the built-in default highlight criteria.

/// Criteria used when criterion generation fails. Stage 1 is the only
/// stage with a non-fatal fallback.
pub const DEFAULT_CRITERIA: &str = "\
## Highlight criteria:
- Moments of impressive action or technical skill
- Emotionally rich or dramatic beats
- Key turning points or pivotal events
- Visually striking or well-composed shots
- Moments with clear storytelling value";

/// Prompt asking the language model to rewrite the criteria for a theme.
pub fn criteria_prompt(theme: &str) -> String {
    format!(
        "Rewrite the video highlight criteria below for the user's theme.

User theme: {theme}

Original criteria template:
{DEFAULT_CRITERIA}

Keep the same format (a `-` bullet list under a markdown heading), but \
rewrite the individual criteria so they fit the highlight scenes the user \
wants to extract. Output only the rewritten criteria, in markdown."
    )
}

/// Prompt asking the vision model to analyze a video against the criteria.
///
/// The output contract matters: every highlight point must be a line
/// starting with a letter marker (`A.` through `J.`) so the matching stage
/// can parse it.
pub fn analysis_prompt(criteria: &str) -> String {
    format!(
        "Analyze this video and distill its highlight points.

{criteria}

## Output requirements:
List the highlight points in the following format, each with a priority \
(1 = most important, 2 = important, 3 = normal):

**Video summary:**
[brief description of the overall content and theme]

**Highlight points:**
A. [priority 1] - [specific description of the highlight]
B. [priority 2] - [specific description of the highlight]
C. [priority 1] - [specific description of the highlight]
...

Make sure to:
1. Order the points by their time of appearance in the video
2. Give every point an explicit priority marker
3. Keep descriptions concrete so they can be matched against footage
4. Focus on genuinely remarkable moments, not a plain summary"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_criteria_is_bulleted() {
        assert!(DEFAULT_CRITERIA.starts_with("## "));
        assert!(DEFAULT_CRITERIA.lines().filter(|l| l.starts_with("- ")).count() >= 5);
    }

    #[test]
    fn test_prompts_embed_inputs() {
        assert!(criteria_prompt("esports plays").contains("esports plays"));
        assert!(analysis_prompt("## My criteria").contains("## My criteria"));
    }
}
