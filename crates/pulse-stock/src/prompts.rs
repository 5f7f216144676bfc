//! Sentiment prompt
//!
//! The prompt asks the model to read retail chatter as a contrarian signal.
//! It is rendered with MiniJinja so the wording stays a plain template.

use crate::error::Result;
use minijinja::{Environment, context};
use pulse_utils::truncate_chars;

pub const SENTIMENT_PROMPT_NAME: &str = "ptt.sentiment";

const SENTIMENT_TEMPLATE: &str = "\
角色設定：你是一位精通台股散戶心理學與行為金融學的資深交易員。
任務：分析以下 PTT 股板討論內容{% if keywords %}（關鍵字：{{ keywords }}）{% endif %}。

請輸出簡潔報告：
1. 【情緒溫度計】 (0-100分)：0=極度恐慌(買點)，100=極度狂熱(賣點)。
2. 【散戶共識】：大家現在主要在看多還是看空？理由是什麼？
3. 【反指標操作建議】：基於「人多的地方不要去」原則，現在適合進場、出場還是觀望？
4. 【關鍵證據】：引用 1-2 則最具代表性的推文或內文。

資料內容：
{{ data }}
";

/// Render the sentiment prompt over the scraped text
///
/// `data` is cut to `char_limit` characters before it is embedded.
pub fn sentiment_prompt(keywords: &str, data: &str, char_limit: usize) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(SENTIMENT_PROMPT_NAME, SENTIMENT_TEMPLATE)?;

    let template = env.get_template(SENTIMENT_PROMPT_NAME)?;
    let rendered = template.render(context! {
        keywords => keywords.trim(),
        data => truncate_chars(data, char_limit),
    })?;
    Ok(rendered)
}
