//! Thread page extraction
//!
//! A PTT thread page carries its metadata as `span.article-meta-value`
//! pairs, the article inside `#main-content`, and one `div.push` per reply.

use crate::error::{Result, StockError};
use pulse_utils::{collapse_whitespace, truncate_chars};
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Marker counted as agreement
pub const PUSH_MARKER: &str = "推";
/// Marker counted as disagreement
pub const BOO_MARKER: &str = "噓";
/// Stand-in for a missing IP/time field
pub const MISSING_IP_TIME: &str = "N/A";

const MIN_META_VALUES: usize = 4;
const SEPARATOR_WIDTH: usize = 30;
const STRIPPED_CLASSES: [&str; 4] = ["article-meta-tag", "article-meta-value", "push", "richcontent"];

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("valid selector"));
    };
}

selector!(META_VALUE, "span.article-meta-value");
selector!(MAIN_CONTENT, "#main-content");
selector!(PUSH, "div.push");
selector!(PUSH_TAG, "span.push-tag");
selector!(PUSH_USER, "span.push-userid");
selector!(PUSH_CONTENT, "span.push-content");
selector!(PUSH_IP_TIME, "span.push-ipdatetime");

/// One reply line under a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Raw stance tag (`推`, `噓`, `→`)
    pub stance: String,
    pub user_id: String,
    pub text: String,
    pub ip_and_time: String,
}

impl Comment {
    /// `[ip_and_time] stance user_id : text`
    pub fn render(&self) -> String {
        format!(
            "[{}] {} {} : {}",
            self.ip_and_time, self.stance, self.user_id, self.text
        )
    }
}

/// A parsed forum thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub url: String,
    pub title: String,
    pub author: String,
    /// Site-native timestamp, kept as text
    pub posted_at: String,
    pub push_count: u32,
    pub boo_count: u32,
    pub body: String,
    pub comments: Vec<Comment>,
}

impl ThreadRecord {
    /// Human-readable block used in the export and the prompt
    pub fn format_block(&self) -> String {
        let mut block = format!(
            "\n{sep}\n📄 標題: {title}\n📅 時間: {date}\n👤 作者: {author}\n📊 互動: 推 {push} | 噓 {boo}\n\n{body}\n",
            sep = "=".repeat(SEPARATOR_WIDTH),
            title = self.title,
            date = self.posted_at,
            author = self.author,
            push = self.push_count,
            boo = self.boo_count,
            body = self.body,
        );

        if !self.comments.is_empty() {
            block.push_str(&format!("\n💬 留言 ({}):\n", self.comments.len()));
            for (i, comment) in self.comments.iter().enumerate() {
                block.push_str(&format!("{}. {}\n", i + 1, comment.render()));
            }
        }

        block
    }

    /// Log line for a successful fetch
    pub fn summary_line(&self) -> String {
        format!("[{}] {}", self.posted_at, self.title)
    }
}

/// Parse a thread page into a record
///
/// All-or-nothing: any missing required piece yields [`StockError::Parse`].
pub fn parse_thread(url: &str, html: &str, body_char_limit: Option<usize>) -> Result<ThreadRecord> {
    let document = Html::parse_document(html);

    let meta: Vec<String> = document
        .select(&META_VALUE)
        .map(|el| element_text(el).trim().to_string())
        .collect();
    if meta.len() < MIN_META_VALUES {
        return Err(StockError::parse(
            url,
            format!("expected {MIN_META_VALUES} metadata values, found {}", meta.len()),
        ));
    }

    // meta[1] is the board name
    let author = meta[0].clone();
    let title = meta[2].clone();
    let posted_at = meta[3].clone();

    let main = document
        .select(&MAIN_CONTENT)
        .next()
        .ok_or_else(|| StockError::parse(url, "missing #main-content"))?;

    let mut push_count = 0;
    let mut boo_count = 0;
    let mut comments = Vec::new();
    for block in main.select(&PUSH) {
        let text = element_text(block);
        if text.contains(PUSH_MARKER) {
            push_count += 1;
        }
        if text.contains(BOO_MARKER) {
            boo_count += 1;
        }
        if let Some(comment) = parse_comment(block) {
            comments.push(comment);
        }
    }

    let mut body = String::new();
    collect_visible_text(main, &mut body);
    let body = body.trim();
    let body = match body_char_limit {
        Some(limit) => truncate_chars(body, limit),
        None => body,
    };

    Ok(ThreadRecord {
        url: url.to_string(),
        title,
        author,
        posted_at,
        push_count,
        boo_count,
        body: body.to_string(),
        comments,
    })
}

fn parse_comment(block: ElementRef<'_>) -> Option<Comment> {
    let stance = first_text(block, &PUSH_TAG)?;
    let user_id = first_text(block, &PUSH_USER)?;
    let content = first_text(block, &PUSH_CONTENT)?;
    let ip_and_time = first_text(block, &PUSH_IP_TIME)
        .map(|raw| collapse_whitespace(&raw))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING_IP_TIME.to_string());

    let text = content.strip_prefix(": ").unwrap_or(&content).trim().to_string();

    Some(Comment {
        stance: stance.trim().to_string(),
        user_id: user_id.trim().to_string(),
        text,
        ip_and_time,
    })
}

fn first_text(block: ElementRef<'_>, selector: &Selector) -> Option<String> {
    block.select(selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn is_stripped(element: &Element) -> bool {
    matches!(element.name(), "div" | "span")
        && element.classes().any(|class| STRIPPED_CLASSES.contains(&class))
}

/// Visible text of `element`, skipping metadata, replies and embeds
fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if !is_stripped(child.value()) {
                collect_visible_text(child, out);
            }
        }
    }
}
