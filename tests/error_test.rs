//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use moodpost::capture;
use moodpost::error::{ErrorKind, MoodPostError, ServiceCall, ValidationIssue};
use std::path::Path;
use tempfile::tempdir;

/// 存在しない画像を読み込んだ場合
#[test]
fn test_load_nonexistent_image() {
    let result = capture::load_image(Path::new("/nonexistent/path/12345.jpg"), 1024);
    assert!(matches!(result.unwrap_err(), MoodPostError::FileNotFound(_)));
}

/// 画像でないファイルを読み込んだ場合
#[test]
fn test_load_non_image_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("photo.jpg");
    std::fs::write(&path, "not an image").unwrap();

    let result = capture::load_image(&path, 1024);
    assert!(matches!(result.unwrap_err(), MoodPostError::ImageLoad(_)));
}

/// MoodPostErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        MoodPostError::Config("テスト設定エラー".to_string()),
        MoodPostError::FileNotFound("test.jpg".to_string()),
        MoodPostError::ApiParse("不正なJSON".to_string()),
        MoodPostError::Consistency("順序違反".to_string()),
        MoodPostError::MissingPost,
        MoodPostError::Validation(ValidationIssue::NoTracksSelected),
        MoodPostError::service(ServiceCall::CreatePost, "HTTP 500"),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// ユーザーID未設定のメッセージ確認
#[test]
fn test_missing_user_id_message() {
    let err = MoodPostError::Validation(ValidationIssue::MissingUserId);
    let display = format!("{}", err);

    assert!(display.contains("ユーザーID"));
    assert!(display.contains("moodpost config"));
}

/// サービス呼び出しエラーは呼び出し種別を含む
#[test]
fn test_service_error_names_call() {
    let err = MoodPostError::service(ServiceCall::FetchRecommendations, "timeout");
    let display = format!("{}", err);

    assert!(display.contains("楽曲推薦"));
    assert!(display.contains("timeout"));
}

/// エラー区分
#[test]
fn test_error_kinds() {
    assert_eq!(
        MoodPostError::Validation(ValidationIssue::MissingMood).kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        MoodPostError::service(ServiceCall::PredictMood, "x").kind(),
        ErrorKind::Transient
    );
    assert_eq!(MoodPostError::MissingPost.kind(), ErrorKind::Consistency);
    assert_eq!(MoodPostError::Config("x".into()).kind(), ErrorKind::Fatal);

    assert!(MoodPostError::MissingPost.is_blocking());
    assert!(!MoodPostError::service(ServiceCall::PredictMood, "x").is_blocking());
}

/// エラーのDebug実装確認
#[test]
fn test_error_debug() {
    let err = MoodPostError::Config("テスト".to_string());
    let debug = format!("{:?}", err);

    assert!(debug.contains("Config"));
    assert!(debug.contains("テスト"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: MoodPostError = io_err.into();

    assert!(matches!(err, MoodPostError::Io(_)));
    let display = format!("{}", err);
    assert!(display.contains("IO"));
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: MoodPostError = json_err.into();

    assert!(matches!(err, MoodPostError::JsonParse(_)));
}

/// common::Errorからの変換
#[test]
fn test_common_error_conversion() {
    let common_err = moodpost_common::Error::InvalidTrack("idがありません".to_string());
    let err: MoodPostError = common_err.into();

    assert!(matches!(err, MoodPostError::Common(_)));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

/// エラーチェーン（透過的エラー）
#[test]
fn test_error_chain_transparent() {
    let common_err = moodpost_common::Error::UnknownMood("sleepy".to_string());
    let err: MoodPostError = common_err.into();

    // 透過的エラーなのでメッセージがそのまま表示される
    assert_eq!(format!("{}", err), "Unknown mood: sleepy");
}
