//! ワークフローの状態と画面ステップ

use serde::{Deserialize, Serialize};

/// エラーが発生した段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    Detecting,
    Recommending,
    Submitting,
}

/// ワークフロー状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    Detecting,
    Recommending,
    Curating,
    Submitting,
    JournalPending,
    Completed,
    /// 確認後に `resume` へ戻る
    Error {
        origin: ErrorOrigin,
        resume: Box<WorkflowState>,
        notice: String,
    },
}

impl WorkflowState {
    /// 許可された遷移か
    ///
    /// 同じ状態への遷移は常に許可する（変更なし扱い）
    pub fn allows(&self, next: &WorkflowState) -> bool {
        use WorkflowState::*;

        if self == next {
            return true;
        }
        match (self, next) {
            (Idle, Detecting) => true,
            (Detecting, Recommending | Idle) => true,
            (Detecting, Error { origin: ErrorOrigin::Detecting, .. }) => true,
            (Recommending, Curating | Detecting | Idle) => true,
            (Recommending, Error { origin: ErrorOrigin::Recommending, .. }) => true,
            (Curating, Detecting | Submitting | Idle) => true,
            (Submitting, JournalPending) => true,
            (Submitting, Error { origin: ErrorOrigin::Submitting, .. }) => true,
            (JournalPending, Completed) => true,
            (Error { resume, .. }, next) => resume.as_ref() == next || matches!(next, Detecting | Idle),
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "待機中",
            WorkflowState::Detecting => "気分判定中",
            WorkflowState::Recommending => "推薦取得中",
            WorkflowState::Curating => "選曲中",
            WorkflowState::Submitting => "投稿中",
            WorkflowState::JournalPending => "日記待ち",
            WorkflowState::Completed => "完了",
            WorkflowState::Error { .. } => "エラー",
        }
    }
}

/// 画面ステップ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Capture,
    Curate,
    Journal,
}

impl Step {
    /// 状態が属するステップ
    pub fn of(state: &WorkflowState) -> Step {
        match state {
            WorkflowState::Idle | WorkflowState::Detecting | WorkflowState::Recommending => Step::Capture,
            WorkflowState::Curating | WorkflowState::Submitting => Step::Curate,
            WorkflowState::JournalPending | WorkflowState::Completed => Step::Journal,
            WorkflowState::Error { origin, .. } => match origin {
                ErrorOrigin::Detecting | ErrorOrigin::Recommending => Step::Capture,
                ErrorOrigin::Submitting => Step::Curate,
            },
        }
    }
}
