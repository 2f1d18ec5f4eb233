//! HTML digest rendering.
//!
//! The document is self-contained: inline CSS, no script, no external
//! resources. Partition switching uses radio inputs and `:checked` rules.
//! Output depends only on the article list and the date label.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::article::Article;

pub const DIGEST_SUFFIX: &str = "_news.html";
/// Fixed-width prefix of every digest file name.
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";
pub const TOP_COUNT: usize = 3;

const DIGEST_TITLE: &str = "World Business & Economy News";
const DEFAULT_BADGE_COLOR: &str = "#607d8b";

fn badge_color(source: &str) -> &'static str {
    match source {
        "NHK ビジネス" => "#3949ab",
        "東洋経済" => "#f57c00",
        "Bloomberg" => "#e53935",
        "The Guardian" => "#43a047",
        "BBC Business" => "#e91e8c",
        _ => DEFAULT_BADGE_COLOR,
    }
}

pub fn digest_filename(now: NaiveDateTime) -> String {
    format!("{}{}", now.format(FILENAME_TIMESTAMP_FORMAT), DIGEST_SUFFIX)
}

/// Writes the rendered digest into `dir`, creating it if needed.
pub fn write_digest(dir: &Path, now: NaiveDateTime, html: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(digest_filename(now));
    fs::write(&path, html).with_context(|| format!("Failed to write digest {}", path.display()))?;
    info!("Digest saved to {}", path.display());
    Ok(path)
}

/// Stable partition by source name: sources in first-seen order, articles in list order.
pub fn group_by_source(articles: &[Article]) -> Vec<(&str, Vec<&Article>)> {
    let mut groups: Vec<(&str, Vec<&Article>)> = Vec::new();
    for article in articles {
        match groups.iter_mut().find(|(source, _)| *source == article.source) {
            Some((_, members)) => members.push(article),
            None => groups.push((article.source.as_str(), vec![article])),
        }
    }
    groups
}

fn safe_href(url: &str) -> &str {
    if url.starts_with("https://") || url.starts_with("http://") {
        url
    } else {
        "#"
    }
}

fn source_badge(source: &str) -> String {
    format!(
        r#"<span class="badge" style="background:{}">{}</span>"#,
        badge_color(source),
        encode_text(source)
    )
}

fn chips(article: &Article) -> String {
    let mut out = format!(
        r#"<span class="chip sentiment-{0}">{0}</span>"#,
        article.sentiment.as_str()
    );
    for company in &article.companies {
        let _ = write!(out, r#"<span class="chip company">{}</span>"#, encode_text(company));
    }
    for tag in &article.tags {
        let _ = write!(out, r##"<span class="chip tag">#{}</span>"##, encode_text(tag));
    }
    out
}

fn top_card(article: &Article) -> String {
    format!(
        r#"
      <a class="top-card" href="{href}" data-url="{url}" style="border-top: 4px solid {color};">
        {badge}
        <p class="card-summary">{summary}</p>
        <p class="card-title">{title}</p>
        <div class="chips">{chips}</div>
      </a>"#,
        href = encode_double_quoted_attribute(safe_href(&article.url)),
        url = encode_double_quoted_attribute(&article.url),
        color = badge_color(&article.source),
        badge = source_badge(&article.source),
        summary = encode_text(article.display_summary()),
        title = encode_text(&article.title),
        chips = chips(article)
    )
}

fn article_row(article: &Article) -> String {
    let published = article
        .published
        .map(|p| format!(r#"<span class="published">{}</span>"#, p.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default();

    format!(
        r#"
        <a class="article-row" href="{href}" data-url="{url}">
          <div class="article-body">
            {badge} <span class="category">{category}</span> {published}
            <p class="article-summary">{summary}</p>
            <p class="article-title">{title}</p>
            <div class="chips">{chips}</div>
          </div>
          <span class="article-link">Read &rarr;</span>
        </a>"#,
        href = encode_double_quoted_attribute(safe_href(&article.url)),
        url = encode_double_quoted_attribute(&article.url),
        badge = source_badge(&article.source),
        category = encode_text(&article.category),
        published = published,
        summary = encode_text(article.display_summary()),
        title = encode_text(&article.title),
        chips = chips(article)
    )
}

fn partition(id: &str, source: &str, articles: &[&Article]) -> String {
    let rows = if articles.is_empty() {
        r#"<p class="empty">No new articles.</p>"#.to_string()
    } else {
        articles.iter().map(|a| article_row(a)).collect::<String>()
    };
    format!(
        r#"
      <section class="partition" id="tab-{id}" data-source="{source}">{rows}
      </section>"#,
        id = id,
        source = encode_double_quoted_attribute(source),
        rows = rows
    )
}

const BASE_STYLE: &str = r#"
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; background: #f0f2f5; color: #1a1a2e; }
  header { background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%); color: white; padding: 24px 32px; }
  header h1 { font-size: 1.6rem; font-weight: 700; }
  header p { font-size: 0.9rem; opacity: 0.7; margin-top: 4px; }
  .container { max-width: 1100px; margin: 0 auto; padding: 24px 16px; }
  .section-title { font-size: 1rem; font-weight: 700; color: #555; text-transform: uppercase; margin-bottom: 16px; }
  .top3 { display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 16px; margin-bottom: 32px; }
  .top-card { background: white; border-radius: 12px; padding: 20px; text-decoration: none; color: inherit; display: flex; flex-direction: column; gap: 10px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }
  .card-summary { font-size: 0.95rem; line-height: 1.6; color: #222; flex: 1; }
  .card-title { font-size: 0.78rem; color: #888; border-top: 1px solid #eee; padding-top: 10px; }
  .badge { display: inline-block; padding: 3px 10px; border-radius: 20px; font-size: 0.72rem; font-weight: 600; color: white; }
  .category, .published { font-size: 0.72rem; color: #999; margin-left: 6px; }
  .chips { display: flex; flex-wrap: wrap; gap: 6px; }
  .chip { font-size: 0.7rem; padding: 2px 8px; border-radius: 10px; background: #eef0f5; color: #555; }
  .sentiment-positive { background: #e8f5e9; color: #2e7d32; }
  .sentiment-negative { background: #ffebee; color: #c62828; }
  .sentiment-neutral { background: #eceff1; color: #546e7a; }
  .tabs { background: white; border-radius: 12px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); overflow: hidden; }
  .tab-radio { position: absolute; opacity: 0; pointer-events: none; }
  .tab-bar { display: flex; border-bottom: 2px solid #f0f2f5; overflow-x: auto; padding: 0 16px; }
  .tab-btn { padding: 14px 18px; font-size: 0.88rem; font-weight: 600; color: #888; cursor: pointer; border-bottom: 3px solid transparent; margin-bottom: -2px; white-space: nowrap; }
  .count { display: inline-block; background: #f0f2f5; border-radius: 10px; padding: 1px 7px; font-size: 0.75rem; margin-left: 4px; }
  .partition { display: none; padding: 8px 0; }
  .article-row { display: flex; align-items: flex-start; gap: 16px; padding: 16px 20px; border-bottom: 1px solid #f5f5f5; text-decoration: none; color: inherit; }
  .article-body { flex: 1; }
  .article-summary { font-size: 0.92rem; line-height: 1.65; color: #222; margin-top: 6px; }
  .article-title { font-size: 0.78rem; color: #aaa; margin: 4px 0 6px; }
  .article-link { font-size: 0.8rem; color: #3949ab; font-weight: 600; white-space: nowrap; padding-top: 4px; }
  .empty { padding: 16px 20px; color: #888; }
  .stats { display: flex; gap: 20px; flex-wrap: wrap; margin-bottom: 20px; }
  .stat-item { background: white; border-radius: 10px; padding: 12px 20px; font-size: 0.85rem; box-shadow: 0 1px 4px rgba(0,0,0,0.06); }
  .stat-item strong { font-size: 1.3rem; display: block; color: #1a1a2e; }
"#;

/// One `:checked` rule per partition, showing the panel and highlighting its label.
fn selector_style(ids: &[String]) -> String {
    let mut out = String::new();
    for id in ids {
        let _ = writeln!(
            out,
            "  #sel-{id}:checked ~ .panels #tab-{id} {{ display: block; }}\n  #sel-{id}:checked ~ .tab-bar label[for=\"sel-{id}\"] {{ color: #1a1a2e; border-bottom-color: #3949ab; }}",
            id = id
        );
    }
    out
}

/// Renders the digest for one run.
///
/// The top section holds the first `TOP_COUNT` articles in list order. Below it,
/// one "all" partition plus one partition per source; exactly one is visible.
pub fn render_digest(articles: &[Article], date_label: &str) -> String {
    let groups = group_by_source(articles);

    let mut ids = vec!["all".to_string()];
    ids.extend((0..groups.len()).map(|i| i.to_string()));

    let radios = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            format!(
                r#"
      <input type="radio" name="partition" id="sel-{}" class="tab-radio"{}>"#,
                id,
                if i == 0 { " checked" } else { "" }
            )
        })
        .collect::<String>();

    let mut labels = format!(
        r#"<label for="sel-all" class="tab-btn">All <span class="count">{}</span></label>"#,
        articles.len()
    );
    let mut stats = format!(
        r#"<div class="stat-item"><strong>{}</strong>articles</div>"#,
        articles.len()
    );
    let mut panels = partition("all", "all", &articles.iter().collect::<Vec<_>>());

    for (i, (source, members)) in groups.iter().enumerate() {
        let _ = write!(
            labels,
            r#"<label for="sel-{}" class="tab-btn">{} <span class="count">{}</span></label>"#,
            i,
            encode_text(source),
            members.len()
        );
        let _ = write!(
            stats,
            r#"<div class="stat-item"><strong>{}</strong>{}</div>"#,
            members.len(),
            encode_text(source)
        );
        panels.push_str(&partition(&i.to_string(), source, members));
    }

    let top_cards = articles.iter().take(TOP_COUNT).map(top_card).collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} - {date}</title>
<style>{base_style}{selector_style}</style>
</head>
<body>
<header>
  <h1>{title}</h1>
  <p>{date}</p>
</header>
<div class="container">
  <div class="stats">{stats}</div>

  <p class="section-title">Top stories</p>
  <section class="top3">{top_cards}
  </section>

  <p class="section-title">All news</p>
  <div class="tabs">{radios}
    <div class="tab-bar">{labels}</div>
    <div class="panels">{panels}
    </div>
  </div>
</div>
</body>
</html>
"#,
        title = encode_text(DIGEST_TITLE),
        date = encode_text(date_label),
        base_style = BASE_STYLE,
        selector_style = selector_style(&ids),
        stats = stats,
        top_cards = top_cards,
        radios = radios,
        labels = labels,
        panels = panels
    )
}
