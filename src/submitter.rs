//! 投稿作成と日記添付
//!
//! 投稿はセッションごとに1回だけ作成する。2回目以降の呼び出しは
//! 外部呼び出しを行わず既存の投稿IDを返す。

use crate::api::{JournalEntry, MoodApi, PostRequest};
use crate::error::{MoodPostError, Result, ServiceCall, ValidationIssue};
use crate::session::{Session, SessionUpdate};
use moodpost_common::TrackSubmission;

pub struct PostSubmitter;

impl PostSubmitter {
    /// 投稿作成の前提条件を確認する（セッションは変えない）
    pub fn validate(session: &Session) -> Result<()> {
        if session.post_id().is_some() {
            return Ok(());
        }
        if session.selected_tracks().is_empty() {
            return Err(ValidationIssue::NoTracksSelected.into());
        }
        if session.mood().is_none() && session.image_ref().is_none() {
            return Err(ValidationIssue::MissingMood.into());
        }
        Ok(())
    }

    /// 選択済み楽曲から投稿リクエストを組み立てる
    pub fn build_request(session: &Session) -> PostRequest {
        PostRequest {
            user_id: session.user_id().to_string(),
            image_ref: session.image_ref().map(str::to_string),
            tracks: session
                .selected_tracks()
                .iter()
                .map(TrackSubmission::from)
                .collect(),
        }
    }

    pub async fn create_post<A: MoodApi + ?Sized>(api: &A, session: &mut Session) -> Result<String> {
        if let Some(post_id) = session.post_id() {
            tracing::debug!(post_id = %post_id, "投稿作成済み、再送しません");
            return Ok(post_id.to_string());
        }
        Self::validate(session)?;

        let request = Self::build_request(session);
        let created = api.create_post(&request).await?;

        // 保存済みIDを返さないサーバもある
        let missing: Vec<&str> = if created.saved_tracks.is_empty() {
            Vec::new()
        } else {
            request
                .tracks
                .iter()
                .map(|t| t.spotify_id.as_str())
                .filter(|id| !created.saved_tracks.iter().any(|s| s.as_str() == *id))
                .collect()
        };
        if !missing.is_empty() {
            tracing::warn!(post_id = %created.post_id, missing = ?missing, "保存されなかった楽曲があります");
        }

        session.apply(SessionUpdate::PostCreated(created.post_id.clone()))?;
        tracing::info!(post_id = %created.post_id, tracks = request.tracks.len(), "投稿を作成");
        Ok(created.post_id)
    }

    pub async fn attach_journal<A: MoodApi + ?Sized>(
        api: &A,
        session: &Session,
        entry: &JournalEntry,
    ) -> Result<()> {
        let post_id = session.post_id().ok_or(MoodPostError::MissingPost)?;
        if entry.is_empty() {
            return Err(ValidationIssue::EmptyJournal.into());
        }

        let ok = api.attach_journal(session.user_id(), post_id, entry).await?;
        if !ok {
            return Err(MoodPostError::service(
                ServiceCall::AttachJournal,
                "サーバが日記の保存を拒否しました",
            ));
        }
        tracing::info!(post_id = %post_id, "日記を添付");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodpost_common::{MoodCode, Track};

    fn session_with_selection() -> Session {
        let mut session = Session::new("1", 5);
        session
            .apply(SessionUpdate::CandidatesLoaded {
                tracks: vec![
                    Track {
                        id: "a".into(),
                        title: "A".into(),
                        ..Default::default()
                    },
                    Track {
                        id: "b".into(),
                        title: "B".into(),
                        ..Default::default()
                    },
                ],
                window: 5,
            })
            .unwrap();
        session
            .apply(SessionUpdate::TrackToggled(Track {
                id: "b".into(),
                ..Default::default()
            }))
            .unwrap();
        session
    }

    #[test]
    fn test_validate_requires_selection() {
        let mut session = Session::new("1", 5);
        session
            .apply(SessionUpdate::MoodResolved {
                mood: MoodCode::Happy,
                image_ref: None,
            })
            .unwrap();
        let err = PostSubmitter::validate(&session).unwrap_err();
        assert!(matches!(err, MoodPostError::Validation(ValidationIssue::NoTracksSelected)));
    }

    #[test]
    fn test_validate_requires_mood_or_image() {
        let session = session_with_selection();
        let err = PostSubmitter::validate(&session).unwrap_err();
        assert!(matches!(err, MoodPostError::Validation(ValidationIssue::MissingMood)));
    }

    #[test]
    fn test_request_carries_selected_tracks_only() {
        let session = session_with_selection();
        let request = PostSubmitter::build_request(&session);
        assert_eq!(request.tracks.len(), 1);
        assert_eq!(request.tracks[0].spotify_id, "b");
        assert_eq!(request.tracks[0].name, "B");
    }
}
