//! APIレスポンスパーサー
//!
//! 分類・推薦・投稿サービスのレスポンスは型が揺れる（キー名の違い、
//! 配列/文字列の混在、null）。ここで検証して `Track` などの型に
//! 変換し、不正なエントリは下流に流さず除外する。

use crate::error::{Error, Result};
use crate::mood::MoodCode;
use crate::types::{PostCreated, Prediction, Track};
use serde_json::{Map, Value};
use std::collections::HashSet;

const ID_KEYS: &[&str] = &["id", "spotify_id", "spotifyId"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const ARTIST_KEYS: &[&str] = &["artist", "artists"];
const ALBUM_NAME_KEYS: &[&str] = &["albumName", "album_name"];
const COVER_KEYS: &[&str] = &["coverUrl", "cover_url", "album_cover", "album_image", "image_url"];
const PREVIEW_KEYS: &[&str] = &["previewUrl", "preview_url"];
const DURATION_KEYS: &[&str] = &["durationMs", "duration_ms"];
const IMAGE_REF_KEYS: &[&str] = &["imageRef", "image_ref", "imageUrl", "image_url"];
const TRACK_LIST_KEYS: &[&str] = &["tracks", "recommendations"];

/// 取り込みで除外されたエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// レスポンス配列内の位置
    pub index: usize,
    pub reason: String,
}

/// 楽曲リストの取り込み結果
///
/// `tracks` はサーバの順位をそのまま保持する
#[derive(Debug, Clone, Default)]
pub struct IngestedTracks {
    pub tracks: Vec<Track>,
    pub rejected: Vec<Rejection>,
}

/// 最初に見つかった空でない文字列値
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(|v| v.as_str())
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// 文字列または {name} オブジェクトの配列を ", " で連結
fn artist_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(items) => {
            let names: Vec<&str> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(o) => o.get("name").and_then(|n| n.as_str()),
                    _ => None,
                })
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            Some(names.join(", "))
        }
        _ => None,
    }
}

fn duration_value(value: &Value) -> std::result::Result<u64, String> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => {
            if let Some(ms) = n.as_u64() {
                Ok(ms)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 => Ok(f.round() as u64),
                    _ => Err(format!("再生時間が不正です: {}", n)),
                }
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("再生時間が数値ではありません: {}", s)),
        other => Err(format!("再生時間の型が不正です: {}", other)),
    }
}

/// 1件の生ペイロードを `Track` に変換
///
/// idとタイトルは必須。その他は欠損時に空文字/0/None とする。
pub fn coerce_track(value: &Value) -> Result<Track> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::InvalidTrack("オブジェクトではありません".into()))?;

    let id = first_string(obj, ID_KEYS)
        .ok_or_else(|| Error::InvalidTrack("idがありません".into()))?;
    let title = first_string(obj, TITLE_KEYS)
        .ok_or_else(|| Error::InvalidTrack(format!("{}: タイトルがありません", id)))?;

    let artist = ARTIST_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .find_map(artist_text)
        .unwrap_or_default();

    // album は文字列か {name, images: [{url}]} のどちらか
    let album = obj.get("album");
    let album_name = first_string(obj, ALBUM_NAME_KEYS)
        .or_else(|| match album {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Object(o)) => o.get("name").and_then(|n| n.as_str()).map(|s| s.to_string()),
            _ => None,
        })
        .unwrap_or_default();
    let cover_url = first_string(obj, COVER_KEYS)
        .or_else(|| {
            album
                .and_then(|a| a.get("images"))
                .and_then(|imgs| imgs.get(0))
                .and_then(|img| img.get("url"))
                .and_then(|u| u.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_default();

    let preview_url = first_string(obj, PREVIEW_KEYS);

    let duration_ms = match DURATION_KEYS.iter().find_map(|k| obj.get(*k)) {
        Some(v) => duration_value(v).map_err(|e| Error::InvalidTrack(format!("{}: {}", id, e)))?,
        None => 0,
    };

    let genre = first_string(obj, &["genre"]).unwrap_or_default();

    Ok(Track {
        id,
        title,
        artist,
        album_name,
        cover_url,
        preview_url,
        duration_ms,
        genre,
    })
}

/// 生ペイロード配列を取り込む
///
/// 不正なエントリと重複idは除外し、残りはサーバの順序を保つ
pub fn ingest_tracks(values: &[Value]) -> IngestedTracks {
    let mut seen = HashSet::new();
    let mut ingested = IngestedTracks::default();

    for (index, value) in values.iter().enumerate() {
        match coerce_track(value) {
            Ok(track) => {
                if seen.insert(track.id.clone()) {
                    ingested.tracks.push(track);
                } else {
                    ingested.rejected.push(Rejection {
                        index,
                        reason: format!("重複したid: {}", track.id),
                    });
                }
            }
            Err(e) => ingested.rejected.push(Rejection {
                index,
                reason: e.to_string(),
            }),
        }
    }

    ingested
}

/// 推薦APIのレスポンスをパース
///
/// `{"recommendations": [...]}`、`{"tracks": [...]}`、生の配列のいずれも受け付ける
pub fn parse_recommendations(body: &str) -> Result<IngestedTracks> {
    let value: Value = serde_json::from_str(body.trim())?;

    let list = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => TRACK_LIST_KEYS
            .iter()
            .filter_map(|k| obj.get(*k))
            .find_map(|v| v.as_array())
            .ok_or_else(|| Error::Parse("楽曲リストが見つかりません".into()))?,
        _ => return Err(Error::Parse("楽曲リストが見つかりません".into())),
    };

    Ok(ingest_tracks(list))
}

/// 分類APIのレスポンスをパース
pub fn parse_prediction(body: &str) -> Result<Prediction> {
    let value: Value = serde_json::from_str(body.trim())?;
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Parse("分類レスポンスがオブジェクトではありません".into()))?;

    let mood = obj
        .get("mood")
        .and_then(|m| m.as_str())
        .ok_or_else(|| Error::Parse("moodがありません".into()))?
        .parse::<MoodCode>()?;

    let image_ref = first_string(obj, IMAGE_REF_KEYS)
        .ok_or_else(|| Error::Parse("画像参照がありません".into()))?;

    let confidence = obj
        .get("confidence")
        .and_then(|c| c.as_f64())
        .filter(|c| (0.0..=1.0).contains(c))
        .map(|c| c as f32);

    Ok(Prediction {
        mood,
        image_ref,
        confidence,
    })
}

/// 投稿作成APIのレスポンスをパース
///
/// post_id は数値でも文字列でも受け付ける
pub fn parse_post_created(body: &str) -> Result<PostCreated> {
    let value: Value = serde_json::from_str(body.trim())?;

    let post_id = match value.get("post_id").or_else(|| value.get("postId")) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(Error::Parse("post_idがありません".into())),
    };

    let saved_tracks = value
        .get("saved_tracks")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    Ok(PostCreated {
        post_id,
        saved_tracks,
    })
}

/// 日記添付APIのレスポンスをパース
///
/// `{"ok": bool}` を優先し、なければ `error` キーの有無で判定する
pub fn parse_journal_ack(body: &str) -> Result<bool> {
    if body.trim().is_empty() {
        return Ok(true);
    }
    let value: Value = serde_json::from_str(body.trim())?;

    if let Some(ok) = value.get("ok").and_then(|v| v.as_bool()) {
        return Ok(ok);
    }
    Ok(value.get("error").is_none())
}
