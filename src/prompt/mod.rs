mod common;
mod summarization;

pub use common::*;
pub use summarization::article_summary_prompt;
