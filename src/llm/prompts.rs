//! Prompt templates for classification and aggregation.
//!
//! Both prompts demand strict JSON so responses can be decoded directly;
//! the parser still tolerates Markdown code fences around the payload.

/// Per-post classification prompt. Placeholders: {keyword}, {post}.
pub const CLASSIFY_PROMPT: &str = r#"You are a sentiment analyst. Analyze the sentiment of the following Reddit post with respect to the topic "{keyword}".

Respond with ONLY a JSON object, no other text, in this exact shape:
{"sentiment": "positive|negative|mixed|neutral", "positives": ["..."], "negatives": ["..."]}

- "sentiment": the post's overall stance toward "{keyword}"
- "positives": short phrases for each positive point made about "{keyword}" (empty list if none)
- "negatives": short phrases for each negative point made about "{keyword}" (empty list if none)

Post:
{post}"#;

/// Run-level aggregation prompt. Placeholders: {keyword}, {positives}, {negatives}.
pub const AGGREGATE_PROMPT: &str = r#"You are a sentiment analyst. Below are positive and negative points collected from many Reddit posts about "{keyword}".

Respond with ONLY a JSON object, no other text, in this exact shape:
{"overall_sentiment": "positive|negative|mixed|neutral", "summary": "...", "positives": ["..."], "negatives": ["..."]}

- "overall_sentiment": the overall public sentiment toward "{keyword}"
- "summary": 2-4 sentences summarizing the discussion
- "positives": the 3-5 most recurring positive themes
- "negatives": the 3-5 most recurring negative themes

Positive points:
{positives}

Negative points:
{negatives}"#;

/// Fill a prompt template's named placeholders.
pub fn fill(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in pairs {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_replaces_all_occurrences() {
        let out = fill(CLASSIFY_PROMPT, &[("keyword", "tesla"), ("post", "body")]);
        assert!(!out.contains("{keyword}"));
        assert!(!out.contains("{post}"));
        assert!(out.contains("tesla"));
        assert!(out.ends_with("body"));
    }
}
