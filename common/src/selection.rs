//! 楽曲選択ロジック
//!
//! 選択の切り替えと表示順の再計算。I/Oを持たない純粋関数のみ。
//!
//! 表示順 = 選択済み楽曲（選択した順） + 未選択楽曲（候補プールの元の順）

use crate::types::Track;
use std::collections::HashSet;

/// 切り替え結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// 選択順の選択済み楽曲
    pub selected: Vec<Track>,
    /// 表示順
    pub display: Vec<Track>,
}

/// 楽曲が選択済みか
pub fn is_selected(selected: &[Track], track_id: &str) -> bool {
    selected.iter().any(|t| t.id == track_id)
}

/// 選択順の順位（1始まり、「Selected #n」表示用）
pub fn selection_rank(selected: &[Track], track_id: &str) -> Option<usize> {
    selected.iter().position(|t| t.id == track_id).map(|i| i + 1)
}

/// 再生中の楽曲（最後に選択した楽曲）
pub fn now_playing(selected: &[Track]) -> Option<&Track> {
    selected.last()
}

/// 選択状態から表示順を組み立てる
///
/// 選択済み楽曲は候補プール側の正規オブジェクトに置き換える
pub fn display_order(pool: &[Track], selected: &[Track]) -> Vec<Track> {
    let selected_ids: HashSet<&str> = selected.iter().map(|t| t.id.as_str()).collect();

    let head = selected.iter().map(|s| {
        pool.iter()
            .find(|p| p.id == s.id)
            .unwrap_or(s)
            .clone()
    });
    let tail = pool
        .iter()
        .filter(|p| !selected_ids.contains(p.id.as_str()))
        .cloned();

    head.chain(tail).collect()
}

/// 選択を切り替える
///
/// - 選択済みなら外す、未選択なら末尾に追加する
/// - 候補プールにも選択済みにもない楽曲は何も変えない
///
/// 同じ楽曲で2回呼ぶと元の選択状態と表示順に戻る
pub fn toggle(pool: &[Track], selected: &[Track], track: &Track) -> SelectionOutcome {
    let new_selected: Vec<Track> = if is_selected(selected, &track.id) {
        selected
            .iter()
            .filter(|t| t.id != track.id)
            .cloned()
            .collect()
    } else if let Some(canonical) = pool.iter().find(|p| p.id == track.id) {
        let mut next = selected.to_vec();
        next.push(canonical.clone());
        next
    } else {
        selected.to_vec()
    };

    let display = display_order(pool, &new_selected);
    SelectionOutcome {
        selected: new_selected,
        display,
    }
}
