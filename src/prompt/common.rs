// Common text blocks for all prompts
pub const DONT_TELL_ME: &str = r#"
Important instructions for your responses:

1. Do not narrate or describe your actions.
2. Do not summarize or restate the instructions I've given you.
3. Do not preface your responses with phrases like "Here's a summary..." or "I will now..."
4. Do not acknowledge or confirm that you understand these instructions.
5. Avoid phrases like "As an AI language model..." or similar self-referential statements.
"#;

pub const JSON_ONLY: &str = r#"
Output format:
- Respond with a single JSON object and nothing else.
- Do not wrap the JSON in Markdown code fences.
- Do not add any text before or after the JSON object.
- Use double quotes for all keys and string values.
"#;

pub const TRADER_FOCUS: &str = r#"
Points to cover when they apply:
- Impact on stock prices, currencies, interest rates or commodity prices
- Central bank and monetary policy moves
- Geopolitical risks and political events
- Earnings, M&A and management changes at major companies
- Macroeconomic indicators (GDP, CPI, employment)
"#;
