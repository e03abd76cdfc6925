//! 対話式選曲モジュール
//!
//! 表示順の楽曲リストから1曲ずつ選択を切り替え、「次へ」で確定する。

use crate::api::MoodApi;
use crate::error::{MoodPostError, Result};
use crate::workflow::Workflow;
use dialoguer::Select;
use moodpost_common::{selection_rank, Track};

/// 対話アクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurateAction {
    /// 選択を切り替える楽曲ID
    Toggle(String),
    /// 投稿へ進む
    Next,
    /// 保存して終了
    Quit,
}

/// 一覧の1行
pub fn track_line(track: &Track, selected: &[Track]) -> String {
    let badge = match selection_rank(selected, &track.id) {
        Some(rank) => format!("[Selected #{}]", rank),
        None => "[ ]".to_string(),
    };
    let mut line = format!("{} {} - {}", badge, track.title, track.artist);
    if !track.album_name.is_empty() {
        line.push_str(&format!(" ({})", track.album_name));
    }
    line
}

/// 選択肢を組み立てる（末尾に「次へ」「終了」）
pub fn build_items(display: &[Track], selected: &[Track]) -> Vec<String> {
    let mut items: Vec<String> = display.iter().map(|t| track_line(t, selected)).collect();
    items.push("▶ 次へ（投稿を作成）".to_string());
    items.push("✕ 保存して終了".to_string());
    items
}

/// 選択肢の番号をアクションに変換
pub fn action_for(index: usize, display: &[Track]) -> CurateAction {
    match display.get(index) {
        Some(track) => CurateAction::Toggle(track.id.clone()),
        None if index == display.len() => CurateAction::Next,
        None => CurateAction::Quit,
    }
}

/// 対話式で選曲する
///
/// 「次へ」を選んだら true、終了したら false
pub fn run_interactive_curation<A: MoodApi>(workflow: &mut Workflow<A>) -> Result<bool> {
    if workflow.session().candidate_tracks().is_empty() {
        println!("推薦された楽曲がありません");
    }

    let mut cursor = 0;
    loop {
        let session = workflow.session();
        let display = session.display_tracks().to_vec();
        let items = build_items(&display, session.selected_tracks());

        if let Some(track) = workflow.now_playing() {
            println!("♪ 再生中: {} - {}", track.title, track.artist);
        }

        let index = Select::new()
            .with_prompt("楽曲を選択 (Enterで切り替え)")
            .items(&items)
            .default(cursor.min(items.len() - 1))
            .interact()
            .map_err(|e| MoodPostError::CliExecution(e.to_string()))?;

        match action_for(index, &display) {
            CurateAction::Toggle(id) => {
                workflow.toggle_track(&id)?;
                cursor = index;
            }
            CurateAction::Next => {
                if workflow.session().selected_tracks().is_empty() {
                    println!("  → 楽曲を1曲以上選択してください\n");
                    continue;
                }
                return Ok(true);
            }
            CurateAction::Quit => {
                workflow.leave_step();
                println!("選択を保存して終了します...");
                return Ok(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.into(),
            title: format!("Song {}", id),
            artist: "Artist".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_track_line_shows_rank() {
        let selected = vec![track("b"), track("a")];
        assert_eq!(track_line(&track("a"), &selected), "[Selected #2] Song a - Artist");
        assert_eq!(track_line(&track("c"), &selected), "[ ] Song c - Artist");
    }

    #[test]
    fn test_action_for_index() {
        let display = vec![track("a"), track("b")];
        assert_eq!(action_for(1, &display), CurateAction::Toggle("b".into()));
        assert_eq!(action_for(2, &display), CurateAction::Next);
        assert_eq!(action_for(3, &display), CurateAction::Quit);
    }

    #[test]
    fn test_items_include_controls() {
        let items = build_items(&[track("a")], &[]);
        assert_eq!(items.len(), 3);
    }
}
