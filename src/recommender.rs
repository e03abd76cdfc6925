//! 楽曲推薦の取得
//!
//! サーバの順位をそのまま使い、クライアント側で並べ替えない。
//! 先頭 `window` 件を初期表示とし、残りも候補プールとして保持する。

use crate::api::MoodApi;
use crate::error::Result;
use crate::token::RequestToken;
use moodpost_common::{MoodCode, Track};

/// 候補プール
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub pool: Vec<Track>,
    pub window: usize,
}

impl Candidates {
    /// 初期表示分
    pub fn visible(&self) -> &[Track] {
        &self.pool[..self.window.min(self.pool.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

/// 発行済みの推薦リクエスト（判定と同じトークン列に属する）
#[derive(Debug, Clone, Copy)]
pub struct RecommendationRequest {
    pub token: RequestToken,
    pub mood: MoodCode,
}

/// 推薦レスポンス（反映前）
#[derive(Debug)]
pub struct RecommendationOutcome {
    pub token: RequestToken,
    pub mood: MoodCode,
    pub result: Result<Candidates>,
}

pub struct RecommendationFetcher {
    window: usize,
}

impl RecommendationFetcher {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub async fn fetch<A: MoodApi + ?Sized>(&self, api: &A, mood: MoodCode) -> Result<Candidates> {
        let ingested = api.fetch_recommendations(mood).await?;
        tracing::debug!(
            mood = %mood,
            tracks = ingested.tracks.len(),
            rejected = ingested.rejected.len(),
            "推薦取得"
        );
        Ok(Candidates {
            pool: ingested.tracks,
            window: self.window,
        })
    }

    pub async fn resolve<A: MoodApi + ?Sized>(
        &self,
        api: &A,
        request: RecommendationRequest,
    ) -> RecommendationOutcome {
        RecommendationOutcome {
            token: request.token,
            mood: request.mood,
            result: self.fetch(api, request.mood).await,
        }
    }
}
