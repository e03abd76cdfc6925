use base64::Engine;
use moodpost_common::TrackSubmission;
use serde::Serialize;
use serde_json::{json, Value};

/// 投稿作成リクエスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRequest {
    pub user_id: String,
    /// 画像参照（気分だけで投稿する場合はなし）
    #[serde(rename = "image")]
    pub image_ref: Option<String>,
    /// 選択した楽曲（選択順）
    #[serde(rename = "songs")]
    pub tracks: Vec<TrackSubmission>,
}

/// 日記の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Text(String),
    /// 手書きキャンバスのPNG
    Drawing(Vec<u8>),
}

impl JournalEntry {
    pub fn is_empty(&self) -> bool {
        match self {
            JournalEntry::Text(text) => text.trim().is_empty(),
            JournalEntry::Drawing(png) => png.is_empty(),
        }
    }

    /// 日記添付APIのリクエストボディ
    ///
    /// 手書きは `canvas_image` にData URLで、テキストは `content` に入れる
    pub fn to_payload(&self, user_id: &str, post_id: &str) -> Value {
        match self {
            JournalEntry::Text(text) => json!({
                "user_id": user_id,
                "post_id": post_id,
                "content": text,
            }),
            JournalEntry::Drawing(png) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(png);
                json!({
                    "user_id": user_id,
                    "post_id": post_id,
                    "canvas_image": format!("data:image/png;base64,{}", encoded),
                })
            }
        }
    }
}
