use thiserror::Error;

/// 入力不足などで操作を受け付けない理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// 気分も画像も未確定
    MissingMood,
    /// 楽曲が1曲も選択されていない
    NoTracksSelected,
    /// 候補にない楽曲
    UnknownTrack(String),
    /// 日記の内容が空
    EmptyJournal,
    /// ユーザーIDが未設定
    MissingUserId,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::MissingMood => write!(f, "気分を選択するか写真をアップロードしてください"),
            ValidationIssue::NoTracksSelected => write!(f, "楽曲を1曲以上選択してください"),
            ValidationIssue::UnknownTrack(id) => write!(f, "候補にない楽曲です: {}", id),
            ValidationIssue::EmptyJournal => write!(f, "日記の内容が空です"),
            ValidationIssue::MissingUserId => write!(
                f,
                "ユーザーIDが設定されていません。`moodpost config --set-user ID` で設定してください"
            ),
        }
    }
}

/// 外部サービス呼び出しの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    PredictMood,
    FetchRecommendations,
    CreatePost,
    AttachJournal,
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceCall::PredictMood => write!(f, "気分分類"),
            ServiceCall::FetchRecommendations => write!(f, "楽曲推薦"),
            ServiceCall::CreatePost => write!(f, "投稿作成"),
            ServiceCall::AttachJournal => write!(f, "日記添付"),
        }
    }
}

impl ServiceCall {
    /// 届いた後に再送しても重複しない呼び出しか
    ///
    /// 投稿作成と日記添付はサーバー側で重複を除かないため対象外
    pub fn is_repeatable(self) -> bool {
        matches!(self, ServiceCall::PredictMood | ServiceCall::FetchRecommendations)
    }
}

/// エラーの扱い区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// ユーザーの確認が必要。状態は進めない
    Validation,
    /// 外部呼び出しの失敗。呼び出し前の段階に留まり再試行できる
    Transient,
    /// 順序違反。試みた遷移だけを中止する
    Consistency,
    /// 設定・IOなどワークフロー外の失敗
    Fatal,
}

#[derive(Error, Debug)]
pub enum MoodPostError {
    #[error("入力エラー: {0}")]
    Validation(ValidationIssue),

    #[error("{call}の呼び出しに失敗: {message}")]
    Service { call: ServiceCall, message: String },

    #[error("APIレスポンスが不正: {0}")]
    ApiParse(String),

    #[error("投稿がまだ存在しません (no post exists yet)")]
    MissingPost,

    #[error("操作の順序が不正: {0}")]
    Consistency(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error(transparent)]
    Common(#[from] moodpost_common::Error),
}

impl MoodPostError {
    pub fn service(call: ServiceCall, message: impl Into<String>) -> Self {
        MoodPostError::Service {
            call,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MoodPostError::Validation(_) => ErrorKind::Validation,
            MoodPostError::Service { .. } | MoodPostError::ApiParse(_) => ErrorKind::Transient,
            MoodPostError::MissingPost | MoodPostError::Consistency(_) => ErrorKind::Consistency,
            MoodPostError::Common(moodpost_common::Error::Json(_))
            | MoodPostError::Common(moodpost_common::Error::Parse(_))
            | MoodPostError::Common(moodpost_common::Error::InvalidTrack(_))
            | MoodPostError::Common(moodpost_common::Error::UnknownMood(_)) => ErrorKind::Transient,
            _ => ErrorKind::Fatal,
        }
    }

    /// ユーザーの確認が必要なエラーか
    pub fn is_blocking(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::Consistency)
    }
}

impl From<ValidationIssue> for MoodPostError {
    fn from(issue: ValidationIssue) -> Self {
        MoodPostError::Validation(issue)
    }
}

pub type Result<T> = std::result::Result<T, MoodPostError>;
