//! 楽曲・投稿関連の型定義
//!
//! CLIとサービス層で共有される型:
//! - Track: 取り込み済みの楽曲（取得後は不変）
//! - TrackSubmission: 投稿作成APIへ送る楽曲ペイロード
//! - Prediction: 気分分類APIの結果
//! - PostCreated: 投稿作成APIの結果

use crate::mood::MoodCode;
use serde::{Deserialize, Serialize};

/// 楽曲
///
/// 外部サービスの生ペイロードは `parser::coerce_track` を通してのみ生成する
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub artist: String,

    #[serde(default)]
    pub album_name: String,

    #[serde(default)]
    pub cover_url: String,

    /// 試聴URL（提供されない楽曲も多い）
    #[serde(default)]
    pub preview_url: Option<String>,

    #[serde(default)]
    pub duration_ms: u64,

    #[serde(default)]
    pub genre: String,
}

/// 投稿作成APIへ送る楽曲
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSubmission {
    pub spotify_id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub image_url: String,
    pub duration_ms: u64,
    pub genre: String,
}

impl From<&Track> for TrackSubmission {
    fn from(track: &Track) -> Self {
        Self {
            spotify_id: track.id.clone(),
            name: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album_name.clone(),
            image_url: track.cover_url.clone(),
            duration_ms: track.duration_ms,
            genre: track.genre.clone(),
        }
    }
}

/// 気分分類の結果
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub mood: MoodCode,
    /// サーバに保存された画像の参照
    pub image_ref: String,
    /// 分類の確信度（0.0〜1.0、返さないサーバもある）
    pub confidence: Option<f32>,
}

/// 投稿作成の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCreated {
    pub post_id: String,
    /// サーバが保存した楽曲ID
    pub saved_tracks: Vec<String>,
}
