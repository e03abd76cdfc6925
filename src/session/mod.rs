//! 選曲セッション
//!
//! ワークフロー全体で共有する可変状態。書き込みは `Session::apply` のみで、
//! 更新は複製に対して検証・適用し、成功した場合だけ差し替える。
//! 失敗した更新がセッションを中途半端に変えることはない。

pub mod snapshot;

pub use snapshot::{Snapshot, SnapshotStore};

use crate::error::{MoodPostError, Result, ValidationIssue};
use crate::workflow::WorkflowState;
use moodpost_common::{display_order, toggle, MoodCode, Track};
use std::collections::HashSet;

/// 更新で変わったフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    UserId,
    PostId,
    Mood,
    ManualMood,
    ImageRef,
    Candidates,
    Selection,
    Display,
    Status,
}

impl std::fmt::Display for SessionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionField::UserId => write!(f, "ユーザー"),
            SessionField::PostId => write!(f, "投稿ID"),
            SessionField::Mood => write!(f, "気分"),
            SessionField::ManualMood => write!(f, "手動選択"),
            SessionField::ImageRef => write!(f, "画像"),
            SessionField::Candidates => write!(f, "候補"),
            SessionField::Selection => write!(f, "選択"),
            SessionField::Display => write!(f, "表示順"),
            SessionField::Status => write!(f, "状態"),
        }
    }
}

/// セッションへの更新
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// 手動の気分選択（None で解除）
    ManualMoodChanged(Option<MoodCode>),
    /// 判定結果の反映。手動選択があればそちらを優先する
    ///
    /// `image_ref` が None のときは既存の画像参照を保つ
    MoodResolved {
        mood: MoodCode,
        image_ref: Option<String>,
    },
    /// 判定失敗・入力なし
    MoodCleared,
    /// 推薦の反映。新しい候補にない選択は外す
    CandidatesLoaded { tracks: Vec<Track>, window: usize },
    TrackToggled(Track),
    PostCreated(String),
    StatusChanged(WorkflowState),
    /// スナップショット・引き継ぎデータからの復元
    Restored(Snapshot),
    /// 新規投稿・ログアウト
    Reset { user_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    user_id: String,
    post_id: Option<String>,
    mood: Option<MoodCode>,
    manual_mood_override: Option<MoodCode>,
    image_ref: Option<String>,
    candidate_tracks: Vec<Track>,
    selected_tracks: Vec<Track>,
    display_tracks: Vec<Track>,
    window: usize,
    status: WorkflowState,
}

impl Session {
    pub fn new(user_id: impl Into<String>, window: usize) -> Self {
        Self {
            user_id: user_id.into(),
            post_id: None,
            mood: None,
            manual_mood_override: None,
            image_ref: None,
            candidate_tracks: Vec::new(),
            selected_tracks: Vec::new(),
            display_tracks: Vec::new(),
            window: window.max(1),
            status: WorkflowState::Idle,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn post_id(&self) -> Option<&str> {
        self.post_id.as_deref()
    }

    pub fn mood(&self) -> Option<MoodCode> {
        self.mood
    }

    pub fn manual_mood_override(&self) -> Option<MoodCode> {
        self.manual_mood_override
    }

    pub fn image_ref(&self) -> Option<&str> {
        self.image_ref.as_deref()
    }

    pub fn candidate_tracks(&self) -> &[Track] {
        &self.candidate_tracks
    }

    pub fn selected_tracks(&self) -> &[Track] {
        &self.selected_tracks
    }

    /// 画面に出す順の楽曲
    pub fn display_tracks(&self) -> &[Track] {
        &self.display_tracks
    }

    pub fn status(&self) -> &WorkflowState {
        &self.status
    }

    /// 更新を適用し、変わったフィールドを返す
    pub fn apply(&mut self, update: SessionUpdate) -> Result<Vec<SessionField>> {
        let mut next = self.clone();
        next.reduce(update)?;
        let changed = self.diff(&next);
        *self = next;
        Ok(changed)
    }

    fn reduce(&mut self, update: SessionUpdate) -> Result<()> {
        match update {
            SessionUpdate::ManualMoodChanged(mood) => {
                self.manual_mood_override = mood;
            }
            SessionUpdate::MoodResolved { mood, image_ref } => {
                self.mood = Some(self.manual_mood_override.unwrap_or(mood));
                if image_ref.is_some() {
                    self.image_ref = image_ref;
                }
            }
            SessionUpdate::MoodCleared => {
                self.mood = None;
                self.image_ref = None;
            }
            SessionUpdate::CandidatesLoaded { tracks, window } => {
                self.window = window.max(1);
                self.candidate_tracks = dedup_by_id(tracks);
                self.retain_known_selection();
                self.refresh_display();
            }
            SessionUpdate::TrackToggled(track) => {
                if !self.candidate_tracks.iter().any(|t| t.id == track.id) {
                    return Err(ValidationIssue::UnknownTrack(track.id).into());
                }
                let outcome = toggle(&self.candidate_tracks, &self.selected_tracks, &track);
                self.selected_tracks = outcome.selected;
                self.display_tracks = outcome.display;
            }
            SessionUpdate::PostCreated(id) => {
                if id.trim().is_empty() {
                    return Err(MoodPostError::ApiParse("投稿IDが空です".into()));
                }
                match &self.post_id {
                    Some(existing) if *existing == id => {}
                    Some(existing) => {
                        return Err(MoodPostError::Consistency(format!(
                            "投稿IDは作成済みです: {} (新しいID: {})",
                            existing, id
                        )));
                    }
                    None => self.post_id = Some(id),
                }
            }
            SessionUpdate::StatusChanged(next) => {
                if !self.status.allows(&next) {
                    return Err(MoodPostError::Consistency(format!(
                        "状態遷移が不正です: {} → {}",
                        self.status.label(),
                        next.label()
                    )));
                }
                self.status = next;
            }
            SessionUpdate::Restored(snapshot) => {
                if snapshot.user_id != self.user_id {
                    return Err(MoodPostError::Consistency(format!(
                        "別ユーザーのスナップショットです: {}",
                        snapshot.user_id
                    )));
                }
                self.restore(snapshot);
            }
            SessionUpdate::Reset { user_id } => {
                *self = Session::new(user_id, self.window);
            }
        }
        Ok(())
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.post_id = snapshot.post_id.or_else(|| self.post_id.take());
        self.mood = snapshot.mood.or(self.mood);
        if snapshot.image_ref.is_some() {
            self.image_ref = snapshot.image_ref;
        }

        // 旧形式は選択済みしか持たないので、それを候補として扱う
        let pool = if snapshot.candidate_tracks.is_empty() {
            snapshot.selected_tracks.clone()
        } else {
            snapshot.candidate_tracks
        };
        self.candidate_tracks = dedup_by_id(pool);
        self.selected_tracks = dedup_by_id(snapshot.selected_tracks);
        self.retain_known_selection();
        self.refresh_display();
        self.status = if self.post_id.is_some() {
            WorkflowState::JournalPending
        } else if self.candidate_tracks.is_empty() {
            WorkflowState::Idle
        } else {
            WorkflowState::Curating
        };
    }

    fn retain_known_selection(&mut self) {
        let pool = &self.candidate_tracks;
        self.selected_tracks.retain(|s| pool.iter().any(|p| p.id == s.id));
    }

    fn refresh_display(&mut self) {
        self.display_tracks = if self.selected_tracks.is_empty() {
            let end = self.window.min(self.candidate_tracks.len());
            self.candidate_tracks[..end].to_vec()
        } else {
            display_order(&self.candidate_tracks, &self.selected_tracks)
        };
    }

    fn diff(&self, next: &Session) -> Vec<SessionField> {
        let mut changed = Vec::new();
        if self.user_id != next.user_id {
            changed.push(SessionField::UserId);
        }
        if self.post_id != next.post_id {
            changed.push(SessionField::PostId);
        }
        if self.mood != next.mood {
            changed.push(SessionField::Mood);
        }
        if self.manual_mood_override != next.manual_mood_override {
            changed.push(SessionField::ManualMood);
        }
        if self.image_ref != next.image_ref {
            changed.push(SessionField::ImageRef);
        }
        if self.candidate_tracks != next.candidate_tracks {
            changed.push(SessionField::Candidates);
        }
        if self.selected_tracks != next.selected_tracks {
            changed.push(SessionField::Selection);
        }
        if self.display_tracks != next.display_tracks {
            changed.push(SessionField::Display);
        }
        if self.status != next.status {
            changed.push(SessionField::Status);
        }
        changed
    }
}

fn dedup_by_id(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}
