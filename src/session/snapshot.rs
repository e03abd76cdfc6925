//! セッションのスナップショット
//!
//! 選択・画像が変わるたびに書き出し、ステップに入るときに一度だけ読む。
//! ステップ遷移で引き継ぎデータが渡された場合はそちらを優先し、
//! 保存済みのスナップショットを上書きする。

use super::Session;
use crate::error::Result;
use crate::workflow::Step;
use chrono::{DateTime, Utc};
use moodpost_common::{MoodCode, Track};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

const SNAPSHOT_FILE_NAME: &str = ".moodpost-snapshot.json";

/// スナップショットファイルの構造
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// バージョン（互換性チェック用）
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// 書き出したステップ
    pub step: Step,
    pub user_id: String,
    pub post_id: Option<String>,
    pub mood: Option<MoodCode>,
    pub image_ref: Option<String>,
    pub candidate_tracks: Vec<Track>,
    /// 選択順
    pub selected_tracks: Vec<Track>,
}

impl Snapshot {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn from_session(session: &Session, step: Step) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            saved_at: Utc::now(),
            step,
            user_id: session.user_id().to_string(),
            post_id: session.post_id().map(str::to_string),
            mood: session.mood(),
            image_ref: session.image_ref().map(str::to_string),
            candidate_tracks: session.candidate_tracks().to_vec(),
            selected_tracks: session.selected_tracks().to_vec(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            saved_at: Utc::now(),
            step: Step::Capture,
            user_id: String::new(),
            post_id: None,
            mood: None,
            image_ref: None,
            candidate_tracks: Vec::new(),
            selected_tracks: Vec::new(),
        }
    }
}

/// スナップショットの保存先
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE_NAME)
    }

    /// スナップショットを読み込み
    ///
    /// 存在しない・壊れている・バージョン違い・別ユーザーのものは None
    pub fn load(&self, user_id: &str) -> Option<Snapshot> {
        let path = self.path();
        if !path.exists() {
            return None;
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "スナップショットを開けません");
                return None;
            }
        };

        let snapshot: Snapshot = match serde_json::from_reader(BufReader::new(file)) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "スナップショットが壊れています");
                return None;
            }
        };

        if snapshot.version != Snapshot::CURRENT_VERSION {
            tracing::warn!(
                found = snapshot.version,
                expected = Snapshot::CURRENT_VERSION,
                "スナップショットのバージョン不一致、無視します"
            );
            return None;
        }
        if snapshot.user_id != user_id {
            tracing::debug!(stored = %snapshot.user_id, user = %user_id, "別ユーザーのスナップショット");
            return None;
        }
        Some(snapshot)
    }

    /// スナップショットを保存
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let file = File::create(self.path())?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, snapshot)?;
        Ok(())
    }

    /// スナップショットを削除（削除した場合 true）
    pub fn clear(&self) -> Result<bool> {
        let path = self.path();
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    /// ステップに入るときの状態を決める
    ///
    /// 引き継ぎデータがあれば保存して返し、なければ保存済みを読む
    pub fn resolve_entry(&self, user_id: &str, handoff: Option<Snapshot>) -> Result<Option<Snapshot>> {
        match handoff {
            Some(snapshot) => {
                self.save(&snapshot)?;
                Ok(Some(snapshot))
            }
            None => Ok(self.load(user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load("1").is_none());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_old_format_fills_defaults() {
        let json = r#"{"userId": "1", "imageRef": "img/1.jpg", "selectedTracks": [{"id": "a", "title": "A"}]}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.version, Snapshot::CURRENT_VERSION);
        assert_eq!(snapshot.step, Step::Capture);
        assert_eq!(snapshot.selected_tracks[0].id, "a");
        assert!(snapshot.candidate_tracks.is_empty());
    }
}
