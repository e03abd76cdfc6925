//! 気分コード定義
//!
//! 分類サービス・推薦サービス・手動選択で共通に使う5種類の気分ラベル

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 気分コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCode {
    Angry,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl MoodCode {
    /// 選択肢の表示順
    pub const ALL: [MoodCode; 5] = [
        MoodCode::Angry,
        MoodCode::Happy,
        MoodCode::Neutral,
        MoodCode::Sad,
        MoodCode::Surprise,
    ];

    /// ワイヤ上のコード文字列
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodCode::Angry => "angry",
            MoodCode::Happy => "happy",
            MoodCode::Neutral => "neutral",
            MoodCode::Sad => "sad",
            MoodCode::Surprise => "surprise",
        }
    }

    /// 気分選択UI用のラベル
    pub fn label(&self) -> &'static str {
        match self {
            MoodCode::Angry => "😡 Angry",
            MoodCode::Happy => "😊 Happy",
            MoodCode::Neutral => "😐 Neutral",
            MoodCode::Sad => "😢 Sad",
            MoodCode::Surprise => "😲 Surprise",
        }
    }
}

impl fmt::Display for MoodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodCode {
    type Err = Error;

    /// 大文字小文字・前後空白は無視する
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        MoodCode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| Error::UnknownMood(s.to_string()))
    }
}
