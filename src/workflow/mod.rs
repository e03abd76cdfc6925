//! ワークフロー制御
//!
//! 撮影 → 選曲 → 日記 の3ステップを順に進める。セッションの唯一の
//! 書き手で、外部呼び出しは「発行 → 解決 → 反映」の3段に分ける。
//! 解決は `&self` で行うため複数の呼び出しを同時に待てるが、反映は
//! 最新トークンのものだけが通る。

pub mod state;

pub use state::{ErrorOrigin, Step, WorkflowState};

use crate::api::{JournalEntry, MoodApi};
use crate::capture::ImagePayload;
use crate::detector::{DetectionInput, DetectionOutcome, DetectionRequest, MoodDetector};
use crate::error::{MoodPostError, Result, ValidationIssue};
use crate::recommender::{RecommendationFetcher, RecommendationOutcome, RecommendationRequest};
use crate::session::{Session, SessionField, SessionUpdate, Snapshot, SnapshotStore};
use crate::submitter::PostSubmitter;
use crate::token::RequestTokens;
use moodpost_common::{now_playing, MoodCode, Track};

/// レスポンス反映の結果
#[derive(Debug)]
pub enum Applied<T> {
    Committed(T),
    /// 古いレスポンスなので捨てた
    Discarded,
    /// 失敗をエラー状態として反映した
    Failed(MoodPostError),
}

impl<T> Applied<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Applied::Committed(_))
    }
}

pub struct Workflow<A: MoodApi> {
    api: A,
    session: Session,
    tokens: RequestTokens,
    last_image: Option<ImagePayload>,
    /// 外部呼び出し前の状態（失敗時の戻り先）
    pre_call: WorkflowState,
    fetcher: RecommendationFetcher,
    snapshots: SnapshotStore,
}

impl<A: MoodApi> Workflow<A> {
    /// 撮影ステップに入る
    ///
    /// 引き継ぎデータがあればそれを、なければ保存済みスナップショットを復元する
    pub fn start(
        api: A,
        user_id: impl Into<String>,
        snapshots: SnapshotStore,
        window: usize,
        handoff: Option<Snapshot>,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let mut session = Session::new(user_id.clone(), window);

        if let Some(entry) = snapshots.resolve_entry(&user_id, handoff)? {
            match session.apply(SessionUpdate::Restored(entry)) {
                Ok(changed) => tracing::info!(
                    changed = ?changed,
                    state = session.status().label(),
                    "スナップショットから復元"
                ),
                Err(e) => tracing::warn!(error = %e, "スナップショットを復元できません"),
            }
        }

        Ok(Self {
            api,
            pre_call: session.status().clone(),
            session,
            tokens: RequestTokens::new(),
            last_image: None,
            fetcher: RecommendationFetcher::new(window),
            snapshots,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &WorkflowState {
        self.session.status()
    }

    pub fn step(&self) -> Step {
        Step::of(self.state())
    }

    pub fn now_playing(&self) -> Option<&Track> {
        now_playing(self.session.selected_tracks())
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    // ---- 気分判定 ----

    /// 画像を受け取り判定リクエストを発行する
    pub fn submit_image(&mut self, image: ImagePayload) -> Result<Option<DetectionRequest>> {
        self.ensure_can_detect()?;
        self.last_image = Some(image.clone());
        let input = DetectionInput {
            image: Some(image),
            manual: self.session.manual_mood_override(),
        };
        self.begin_detection(input)
    }

    /// 手動の気分選択を変える（None で解除）
    ///
    /// 画像参照が既にあれば分類は呼ばない。解除したときは
    /// 直前の画像があれば分類し直す。
    pub fn set_manual_mood(&mut self, mood: Option<MoodCode>) -> Result<Option<DetectionRequest>> {
        self.ensure_can_detect()?;
        self.session.apply(SessionUpdate::ManualMoodChanged(mood))?;

        let needs_image = mood.is_none() || self.session.image_ref().is_none();
        let input = DetectionInput {
            image: if needs_image { self.last_image.clone() } else { None },
            manual: mood,
        };
        self.begin_detection(input)
    }

    pub async fn resolve_detection(&self, request: DetectionRequest) -> DetectionOutcome {
        MoodDetector::resolve(&self.api, request).await
    }

    /// 判定結果を反映し、推薦リクエストを返す
    pub fn commit_detection(&mut self, outcome: DetectionOutcome) -> Result<Applied<RecommendationRequest>> {
        if !self.tokens.is_current(outcome.token) {
            tracing::warn!(token = outcome.token.value(), "古い判定結果を破棄");
            return Ok(Applied::Discarded);
        }

        match outcome.result {
            Ok(detection) => {
                self.session.apply(SessionUpdate::MoodResolved {
                    mood: detection.mood,
                    image_ref: detection.image_ref,
                })?;
                self.transition(WorkflowState::Recommending)?;
                self.persist();

                let mood = self.session.mood().unwrap_or(detection.mood);
                tracing::info!(
                    mood = %mood,
                    source = ?detection.source,
                    confidence = ?detection.confidence,
                    "気分を確定"
                );
                Ok(Applied::Committed(RecommendationRequest {
                    token: outcome.token,
                    mood,
                }))
            }
            Err(e) => {
                // 確定済みの気分・画像参照はそのまま残す
                tracing::warn!(error = %e, "気分判定に失敗");
                self.fail(ErrorOrigin::Detecting, self.pre_call.clone(), &e)?;
                Ok(Applied::Failed(e))
            }
        }
    }

    // ---- 推薦 ----

    pub async fn resolve_recommendations(&self, request: RecommendationRequest) -> RecommendationOutcome {
        self.fetcher.resolve(&self.api, request).await
    }

    /// 推薦を反映する。失敗時は候補なしで選曲へ進める
    pub fn commit_recommendations(&mut self, outcome: RecommendationOutcome) -> Result<Applied<()>> {
        if !self.tokens.is_current(outcome.token) {
            tracing::warn!(token = outcome.token.value(), mood = %outcome.mood, "古い推薦結果を破棄");
            return Ok(Applied::Discarded);
        }

        match outcome.result {
            Ok(candidates) => {
                let count = candidates.pool.len();
                self.session.apply(SessionUpdate::CandidatesLoaded {
                    tracks: candidates.pool,
                    window: candidates.window,
                })?;
                self.transition(WorkflowState::Curating)?;
                tracing::info!(mood = %outcome.mood, tracks = count, "推薦を反映");
                Ok(Applied::Committed(()))
            }
            Err(e) => {
                tracing::warn!(mood = %outcome.mood, error = %e, "推薦取得に失敗、候補なしで続行");
                self.session.apply(SessionUpdate::CandidatesLoaded {
                    tracks: Vec::new(),
                    window: self.fetcher.window(),
                })?;
                self.fail(ErrorOrigin::Recommending, WorkflowState::Curating, &e)?;
                Ok(Applied::Failed(e))
            }
        }
    }

    /// 判定から推薦の反映までを続けて行う
    pub async fn run_detection(&mut self, request: DetectionRequest) -> Result<Applied<()>> {
        let outcome = self.resolve_detection(request).await;
        match self.commit_detection(outcome)? {
            Applied::Committed(next) => {
                let outcome = self.resolve_recommendations(next).await;
                self.commit_recommendations(outcome)
            }
            Applied::Discarded => Ok(Applied::Discarded),
            Applied::Failed(e) => Ok(Applied::Failed(e)),
        }
    }

    // ---- 選曲 ----

    pub fn toggle_track(&mut self, track_id: &str) -> Result<Vec<SessionField>> {
        self.require(&WorkflowState::Curating, "選曲中ではありません")?;

        let track = self
            .session
            .candidate_tracks()
            .iter()
            .find(|t| t.id == track_id)
            .cloned()
            .ok_or_else(|| ValidationIssue::UnknownTrack(track_id.to_string()))?;

        let changed = self.session.apply(SessionUpdate::TrackToggled(track))?;
        self.persist();
        Ok(changed)
    }

    /// 「次へ」: 投稿を作成して日記ステップへ進む
    ///
    /// 投稿済みなら既存の投稿IDを返す
    pub async fn advance(&mut self) -> Result<String> {
        if let (WorkflowState::JournalPending | WorkflowState::Completed, Some(post_id)) =
            (self.state(), self.session.post_id())
        {
            return Ok(post_id.to_string());
        }
        self.require(&WorkflowState::Curating, "選曲中ではありません")?;
        PostSubmitter::validate(&self.session)?;

        self.transition(WorkflowState::Submitting)?;
        match PostSubmitter::create_post(&self.api, &mut self.session).await {
            Ok(post_id) => {
                self.transition(WorkflowState::JournalPending)?;
                Ok(post_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "投稿作成に失敗");
                self.fail(ErrorOrigin::Submitting, WorkflowState::Curating, &e)?;
                Err(e)
            }
        }
    }

    // ---- 日記 ----

    pub async fn attach_journal(&mut self, entry: &JournalEntry) -> Result<()> {
        if self.session.post_id().is_none() {
            return Err(MoodPostError::MissingPost);
        }
        self.require(&WorkflowState::JournalPending, "日記を添付できる状態ではありません")?;

        PostSubmitter::attach_journal(&self.api, &self.session, entry).await?;
        self.transition(WorkflowState::Completed)?;
        if let Err(e) = self.snapshots.clear() {
            tracing::warn!(error = %e, "スナップショットを削除できません");
        }
        Ok(())
    }

    // ---- 制御 ----

    /// エラー通知を確認し、戻り先の状態へ戻る
    pub fn acknowledge(&mut self) -> Result<()> {
        if let WorkflowState::Error { resume, .. } = self.state() {
            let resume = resume.as_ref().clone();
            self.transition(resume)?;
        }
        Ok(())
    }

    /// 画面を離れる。処理中のレスポンスはすべて無視される
    pub fn leave_step(&mut self) {
        self.tokens.invalidate();
        self.persist();
    }

    /// 新規投稿・ログアウト
    pub fn reset(&mut self) -> Result<()> {
        self.tokens.invalidate();
        self.last_image = None;
        let user_id = self.session.user_id().to_string();
        self.session.apply(SessionUpdate::Reset { user_id })?;
        self.pre_call = WorkflowState::Idle;
        self.snapshots.clear()?;
        tracing::info!("セッションをリセット");
        Ok(())
    }

    /// 現在のセッションを書き出す（失敗はログのみ）
    pub fn persist(&self) {
        let snapshot = Snapshot::from_session(&self.session, self.step());
        if let Err(e) = self.snapshots.save(&snapshot) {
            tracing::warn!(error = %e, "スナップショットを保存できません");
        }
    }

    fn ensure_can_detect(&self) -> Result<()> {
        if self.state().allows(&WorkflowState::Detecting) {
            Ok(())
        } else {
            Err(MoodPostError::Consistency(format!(
                "{}のため気分を変更できません",
                self.state().label()
            )))
        }
    }

    fn begin_detection(&mut self, input: DetectionInput) -> Result<Option<DetectionRequest>> {
        if input.image.is_none() && input.manual.is_none() {
            self.tokens.invalidate();
            self.session.apply(SessionUpdate::MoodCleared)?;
            self.transition(WorkflowState::Idle)?;
            self.persist();
            return Ok(None);
        }

        let pre_call = match self.state() {
            state @ (WorkflowState::Idle | WorkflowState::Curating) => Some(state.clone()),
            WorkflowState::Error { resume, .. } => Some(resume.as_ref().clone()),
            _ => None,
        };
        if let Some(state) = pre_call {
            self.pre_call = state;
        }
        self.transition(WorkflowState::Detecting)?;
        self.persist();

        let request = MoodDetector::plan(&mut self.tokens, input);
        if let Some(request) = &request {
            tracing::debug!(token = request.token.value(), image = request.has_image(), "判定リクエスト発行");
        }
        Ok(request)
    }

    fn require(&self, expected: &WorkflowState, message: &str) -> Result<()> {
        if self.state() == expected {
            Ok(())
        } else {
            Err(MoodPostError::Consistency(format!(
                "{} (現在: {})",
                message,
                self.state().label()
            )))
        }
    }

    fn fail(&mut self, origin: ErrorOrigin, resume: WorkflowState, error: &MoodPostError) -> Result<()> {
        self.transition(WorkflowState::Error {
            origin,
            resume: Box::new(resume),
            notice: error.to_string(),
        })
    }

    /// 状態を変える。ステップが変わる場合は引き継ぎデータを書き出す
    fn transition(&mut self, next: WorkflowState) -> Result<()> {
        let before = self.step();
        self.session.apply(SessionUpdate::StatusChanged(next))?;
        let after = self.step();

        if before != after {
            self.tokens.invalidate();
            let handoff = Snapshot::from_session(&self.session, after);
            if let Err(e) = self.snapshots.resolve_entry(self.session.user_id(), Some(handoff)) {
                tracing::warn!(error = %e, "引き継ぎデータを保存できません");
            }
            tracing::info!(from = ?before, to = ?after, "ステップ遷移");
        }
        Ok(())
    }
}
