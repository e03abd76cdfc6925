//! HTTPクライアント実装
//!
//! 各呼び出しにタイムアウトを設定し、1回だけ黙って再試行する。
//! 気分分類と推薦は通信エラーと5xxで、投稿作成と日記添付は
//! 接続できなかった（リクエストが届いていない）場合のみ再試行する。

use super::{JournalEntry, MoodApi, PostRequest};
use crate::capture::ImagePayload;
use crate::config::Config;
use crate::error::{MoodPostError, Result, ServiceCall};
use async_trait::async_trait;
use moodpost_common::{
    parse_journal_ack, parse_post_created, parse_prediction, parse_recommendations, IngestedTracks,
    MoodCode, PostCreated, Prediction,
};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;

const USER_AGENT: &str = concat!("moodpost/", env!("CARGO_PKG_VERSION"));

pub struct HttpMoodApi {
    client: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl HttpMoodApi {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| MoodPostError::Config(format!("HTTPクライアント作成エラー: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url(),
            retries: config.retries(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// リクエストを送りレスポンス本文を返す
    ///
    /// `build` は再試行のたびに呼ばれる（multipartのFormは使い回せないため）
    async fn send<F>(&self, call: ServiceCall, build: F) -> Result<String>
    where
        F: Fn() -> Result<RequestBuilder> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let response = build()?.send().await;

            let retryable = match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .await
                            .map_err(|e| MoodPostError::service(call, e.to_string()));
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let retry = status.is_server_error() && call.is_repeatable();
                    if !retry || attempt >= self.retries {
                        return Err(MoodPostError::service(
                            call,
                            format!("HTTP {}: {}", status.as_u16(), body.trim()),
                        ));
                    }
                    format!("HTTP {}", status.as_u16())
                }
                Err(e) => {
                    let retry = call.is_repeatable() || e.is_connect();
                    if !retry || attempt >= self.retries {
                        return Err(MoodPostError::service(call, e.to_string()));
                    }
                    e.to_string()
                }
            };

            attempt += 1;
            tracing::debug!(call = %call, attempt, reason = %retryable, "再試行");
        }
    }
}

#[async_trait]
impl MoodApi for HttpMoodApi {
    async fn predict_mood(&self, image: &ImagePayload) -> Result<Prediction> {
        let url = self.url("predict/");
        tracing::debug!(url = %url, file = %image.file_name, bytes = image.bytes.len(), "気分分類リクエスト");

        let body = self
            .send(ServiceCall::PredictMood, || {
                let part = Part::bytes(image.bytes.clone())
                    .file_name(image.file_name.clone())
                    .mime_str(&image.mime_type)
                    .map_err(|e| MoodPostError::ImageLoad(e.to_string()))?;
                Ok(self.client.post(&url).multipart(Form::new().part("image", part)))
            })
            .await?;

        parse_prediction(&body)
            .map_err(|e| MoodPostError::ApiParse(format!("気分分類: {}", e)))
    }

    async fn fetch_recommendations(&self, mood: MoodCode) -> Result<IngestedTracks> {
        let url = self.url("get_Recommendation/");
        tracing::debug!(url = %url, mood = %mood, "楽曲推薦リクエスト");

        let body = self
            .send(ServiceCall::FetchRecommendations, || {
                Ok(self.client.get(&url).query(&[("mood", mood.as_str())]))
            })
            .await?;

        let ingested = parse_recommendations(&body)
            .map_err(|e| MoodPostError::ApiParse(format!("楽曲推薦: {}", e)))?;
        for rejection in &ingested.rejected {
            tracing::warn!(index = rejection.index, reason = %rejection.reason, "不正な楽曲を除外");
        }
        Ok(ingested)
    }

    async fn create_post(&self, request: &PostRequest) -> Result<PostCreated> {
        let url = self.url("create_post/");
        tracing::debug!(url = %url, tracks = request.tracks.len(), "投稿作成リクエスト");

        let body = self
            .send(ServiceCall::CreatePost, || Ok(self.client.post(&url).json(request)))
            .await?;

        parse_post_created(&body).map_err(|e| MoodPostError::ApiParse(format!("投稿作成: {}", e)))
    }

    async fn attach_journal(&self, user_id: &str, post_id: &str, entry: &JournalEntry) -> Result<bool> {
        let url = self.url("save_canvas/");
        let payload = entry.to_payload(user_id, post_id);
        tracing::debug!(url = %url, post_id = %post_id, "日記添付リクエスト");

        let body = self
            .send(ServiceCall::AttachJournal, || Ok(self.client.post(&url).json(&payload)))
            .await?;

        parse_journal_ack(&body).map_err(|e| MoodPostError::ApiParse(format!("日記添付: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// 受け取ったリクエスト数を数える簡易サーバー
    ///
    /// `responses` を順に返し、尽きたら最後のものを返し続ける
    async fn stub_server(responses: Vec<(u16, &'static str)>, delay: Duration) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let counter = counter.clone();
                let responses = responses.clone();
                tokio::spawn(async move {
                    if !read_request(&mut stream).await {
                        return;
                    }
                    let index = counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;

                    let (status, body) = responses[index.min(responses.len() - 1)];
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), received)
    }

    /// ヘッダーと Content-Length 分の本文を読み切る
    async fn read_request(stream: &mut TcpStream) -> bool {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return false,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return true;
                }
            }
        }
    }

    fn stub_api(base_url: String, timeout_seconds: u64) -> HttpMoodApi {
        let config = Config {
            api_base_url: base_url,
            timeout_seconds,
            ..Default::default()
        };
        HttpMoodApi::new(&config).unwrap()
    }

    fn post_request() -> PostRequest {
        PostRequest {
            user_id: "7".to_string(),
            image_ref: None,
            tracks: Vec::new(),
        }
    }

    #[test]
    fn test_client_creation() {
        let api = HttpMoodApi::new(&Config::default());
        assert!(api.is_ok());
    }

    #[test]
    fn test_url_join() {
        let config = Config {
            api_base_url: "http://localhost:8000/api/".to_string(),
            ..Default::default()
        };
        // 環境変数が設定されているとベースURLが変わるため比較しない
        if std::env::var("MOODPOST_API_URL").is_ok() {
            return;
        }
        let api = HttpMoodApi::new(&config).unwrap();
        assert_eq!(api.url("predict/"), "http://localhost:8000/api/predict/");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_service_error() {
        let config = Config {
            api_base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        };
        if std::env::var("MOODPOST_API_URL").is_ok() {
            return;
        }
        let api = HttpMoodApi::new(&config).unwrap();
        let err = api.fetch_recommendations(MoodCode::Happy).await.unwrap_err();
        assert!(matches!(
            err,
            MoodPostError::Service { call: ServiceCall::FetchRecommendations, .. }
        ));
    }

    #[tokio::test]
    async fn test_server_error_retried_once() {
        if std::env::var("MOODPOST_API_URL").is_ok() {
            return;
        }
        let (url, received) = stub_server(
            vec![(503, "busy"), (200, r#"{"tracks": [{"id": "1", "title": "One"}]}"#)],
            Duration::ZERO,
        )
        .await;
        let api = stub_api(url, 5);

        let ingested = api.fetch_recommendations(MoodCode::Happy).await.unwrap();
        assert_eq!(ingested.tracks.len(), 1);
        assert_eq!(received.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        if std::env::var("MOODPOST_API_URL").is_ok() {
            return;
        }
        let (url, received) = stub_server(vec![(400, r#"{"error": "Mood is required"}"#)], Duration::ZERO).await;
        let api = stub_api(url, 5);

        let err = api.fetch_recommendations(MoodCode::Happy).await.unwrap_err();
        assert!(matches!(
            err,
            MoodPostError::Service { call: ServiceCall::FetchRecommendations, ref message } if message.contains("HTTP 400")
        ));
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_server_error_surfaces() {
        if std::env::var("MOODPOST_API_URL").is_ok() {
            return;
        }
        let (url, received) = stub_server(vec![(500, "down"), (502, "bad gateway")], Duration::ZERO).await;
        let api = stub_api(url, 5);

        let err = api.fetch_recommendations(MoodCode::Sad).await.unwrap_err();
        assert!(matches!(
            err,
            MoodPostError::Service { call: ServiceCall::FetchRecommendations, ref message } if message.contains("HTTP 502")
        ));
        assert_eq!(received.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_post_timeout_sent_once() {
        if std::env::var("MOODPOST_API_URL").is_ok() {
            return;
        }
        let (url, received) = stub_server(vec![(200, r#"{"post_id": 1}"#)], Duration::from_secs(3)).await;
        let api = stub_api(url, 1);

        let err = api.create_post(&post_request()).await.unwrap_err();
        assert!(matches!(err, MoodPostError::Service { call: ServiceCall::CreatePost, .. }));
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_post_server_error_sent_once() {
        if std::env::var("MOODPOST_API_URL").is_ok() {
            return;
        }
        let (url, received) = stub_server(vec![(500, "error"), (200, r#"{"post_id": 1}"#)], Duration::ZERO).await;
        let api = stub_api(url, 5);

        let err = api.create_post(&post_request()).await.unwrap_err();
        assert!(matches!(err, MoodPostError::Service { call: ServiceCall::CreatePost, .. }));
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_only_lookups_are_repeatable() {
        assert!(ServiceCall::PredictMood.is_repeatable());
        assert!(ServiceCall::FetchRecommendations.is_repeatable());
        assert!(!ServiceCall::CreatePost.is_repeatable());
        assert!(!ServiceCall::AttachJournal.is_repeatable());
    }
}
