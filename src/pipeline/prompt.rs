//! Prompt templates for the triage model.
//!
//! The reply format is the contract with `parser`: four labeled fields in
//! fixed order. Changing a marker or the order is a protocol change and
//! must bump `PROTOCOL_VERSION`.

/// Version of the marker-based reply format.
pub const PROTOCOL_VERSION: u32 = 1;

pub const URGENCY_MARKER: &str = "URGENCY:";
pub const RESPONSE_MARKER: &str = "RESPONSE:";
pub const ANIMAL_TYPE_MARKER: &str = "ANIMAL_TYPE:";
pub const SEARCH_KEYWORDS_MARKER: &str = "SEARCH_KEYWORDS:";

/// All reply markers, in the order the model must emit them.
pub const REPLY_MARKERS: [&str; 4] = [
    URGENCY_MARKER,
    RESPONSE_MARKER,
    ANIMAL_TYPE_MARKER,
    SEARCH_KEYWORDS_MARKER,
];

/// Fixed triage instructions; `{symptoms}` is replaced by the sanitized
/// description.
const TRIAGE_TEMPLATE: &str = "\
你是一位專業的寵物急診分診助理。請根據飼主描述的症狀判斷緊急程度與動物種類，並一律使用繁體中文回答。

判斷標準：
- HIGH：危及生命或需立即就醫（呼吸困難、大量出血、抽搐、誤食毒物、無法排尿、意識不清等）
- MEDIUM：應於 24 小時內就醫（持續嘔吐或腹瀉、食慾廢絕、跛行、眼睛紅腫等）
- LOW：可先居家觀察（輕微症狀、一般照護問題）

請嚴格依照以下格式與順序回覆，不要加入其他段落：
URGENCY: <HIGH 或 MEDIUM 或 LOW>
RESPONSE: <給飼主的建議，100 字以內>
ANIMAL_TYPE: <動物種類，例如 狗、貓、兔、鳥、爬蟲>
SEARCH_KEYWORDS: <用空白分隔的搜尋關鍵字，例如 貓 急診>

飼主描述：
<SYMPTOMS>
{symptoms}
</SYMPTOMS>";

/// Single-shot prompt for the daily tip.
pub const TIP_PROMPT: &str =
    "請用繁體中文提供一則 50 字以內、實用且溫暖的寵物照護小知識，只回覆內容本身。";

/// Shown when the tip model is unavailable.
pub const TIP_FALLBACK: &str =
    "定期健康檢查是守護毛孩最好的方式，發現異狀時請儘早諮詢獸醫師。";

/// Build the triage prompt for an already-sanitized symptom description.
pub fn build_triage_prompt(symptoms: &str) -> String {
    TRIAGE_TEMPLATE.replace("{symptoms}", symptoms)
}
