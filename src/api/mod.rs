//! 外部サービス連携
//!
//! 分類・推薦・投稿・日記の4つの呼び出しを `MoodApi` トレイトにまとめる。
//! 本番は `HttpMoodApi`（reqwest）、テストはメモリ上の実装を使う。

mod http;
mod types;

pub use http::HttpMoodApi;
pub use types::{JournalEntry, PostRequest};

use crate::capture::ImagePayload;
use crate::error::Result;
use async_trait::async_trait;
use moodpost_common::{IngestedTracks, MoodCode, PostCreated, Prediction};

#[async_trait]
pub trait MoodApi: Send + Sync {
    /// 画像から気分を分類
    async fn predict_mood(&self, image: &ImagePayload) -> Result<Prediction>;

    /// 気分に対する楽曲候補（サーバ側で順位付け済み）
    async fn fetch_recommendations(&self, mood: MoodCode) -> Result<IngestedTracks>;

    /// 投稿を作成
    async fn create_post(&self, request: &PostRequest) -> Result<PostCreated>;

    /// 投稿に日記を添付
    async fn attach_journal(&self, user_id: &str, post_id: &str, entry: &JournalEntry) -> Result<bool>;
}
