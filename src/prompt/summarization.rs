use crate::prompt::common::{DONT_TELL_ME, JSON_ONLY, TRADER_FOCUS};

/// Prompt asking for a structured summary of one article.
///
/// `excerpt` is expected to be bounded by the caller.
pub fn article_summary_prompt(
    source: &str,
    title: &str,
    excerpt: &str,
    summary_max_chars: usize,
    summary_language: &str,
    tag_vocabulary: &[&str],
) -> String {
    format!(
        r#"You are a news analyst writing for professional traders.

## ARTICLE:
----------
Source: {source}
Title: {title}
Body: {excerpt}
----------

Summarize the article above in {language}, in at most {max_chars} characters.
If the article is not written in {language}, translate it while summarizing.
Keep it terse enough for a trader to act on immediately and state numbers, currencies and percentages exactly.
{focus}
Return a JSON object with exactly these fields:
{{
  "summary": "<summary in {language}, at most {max_chars} characters>",
  "sentiment": "<one of: positive, negative, neutral>",
  "companies": ["<company names mentioned in the article>"],
  "tags": ["<zero or more of: {tags}>"]
}}

"sentiment" is the likely market impact of the news.
"companies" is empty when no company is named.
"tags" must only use the listed values.
{json_only}
{dont_tell_me}"#,
        source = source,
        title = title,
        excerpt = excerpt,
        language = summary_language,
        max_chars = summary_max_chars,
        focus = TRADER_FOCUS,
        tags = tag_vocabulary.join(", "),
        json_only = JSON_ONLY,
        dont_tell_me = DONT_TELL_ME
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_article_and_format() {
        let prompt = article_summary_prompt(
            "BBC Business",
            "Fed raises interest rates",
            "The central bank moved again.",
            150,
            "Japanese",
            &["rates", "macro"],
        );
        assert!(prompt.contains("Source: BBC Business"));
        assert!(prompt.contains("Title: Fed raises interest rates"));
        assert!(prompt.contains("Body: The central bank moved again."));
        assert!(prompt.contains("in Japanese, in at most 150 characters"));
        assert!(prompt.contains("zero or more of: rates, macro"));
        assert!(prompt.contains("\"sentiment\""));
    }
}
