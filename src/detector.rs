//! 気分判定
//!
//! 画像があれば分類サービスを1回呼ぶ。手動選択がある場合は
//! 分類結果より常に手動選択を優先する（画像参照は分類結果のものを使う）。

use crate::api::MoodApi;
use crate::capture::ImagePayload;
use crate::error::{MoodPostError, Result};
use crate::token::{RequestToken, RequestTokens};
use moodpost_common::MoodCode;

/// 判定の入力
#[derive(Debug, Clone, Default)]
pub struct DetectionInput {
    pub image: Option<ImagePayload>,
    pub manual: Option<MoodCode>,
}

/// 気分の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodSource {
    Manual,
    Detected,
}

/// 判定結果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub mood: MoodCode,
    /// 画像を送った場合のみ
    pub image_ref: Option<String>,
    pub confidence: Option<f32>,
    pub source: MoodSource,
}

/// 発行済みの判定リクエスト
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub token: RequestToken,
    input: DetectionInput,
}

impl DetectionRequest {
    pub fn has_image(&self) -> bool {
        self.input.image.is_some()
    }
}

/// 判定レスポンス（反映前）
#[derive(Debug)]
pub struct DetectionOutcome {
    pub token: RequestToken,
    pub result: Result<Detection>,
}

pub struct MoodDetector;

impl MoodDetector {
    /// 判定リクエストを発行する
    ///
    /// 画像も手動選択もなければ呼び出しは行わず None
    pub fn plan(tokens: &mut RequestTokens, input: DetectionInput) -> Option<DetectionRequest> {
        if input.image.is_none() && input.manual.is_none() {
            return None;
        }
        Some(DetectionRequest {
            token: tokens.issue(),
            input,
        })
    }

    /// 判定を実行する
    pub async fn resolve<A: MoodApi + ?Sized>(api: &A, request: DetectionRequest) -> DetectionOutcome {
        let DetectionRequest { token, input } = request;

        let result = match (input.image, input.manual) {
            (Some(image), manual) => api.predict_mood(&image).await.map(|prediction| {
                tracing::debug!(
                    token = token.value(),
                    detected = %prediction.mood,
                    manual = ?manual,
                    "気分分類レスポンス"
                );
                Detection {
                    mood: manual.unwrap_or(prediction.mood),
                    image_ref: Some(prediction.image_ref),
                    confidence: prediction.confidence,
                    source: if manual.is_some() {
                        MoodSource::Manual
                    } else {
                        MoodSource::Detected
                    },
                }
            }),
            (None, Some(manual)) => Ok(Detection {
                mood: manual,
                image_ref: None,
                confidence: None,
                source: MoodSource::Manual,
            }),
            // plan() が弾くので到達しない
            (None, None) => Err(MoodPostError::Consistency("判定の入力がありません".into())),
        };

        DetectionOutcome { token, result }
    }
}
