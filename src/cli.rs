use clap::{Parser, Subcommand};
use moodpost_common::MoodCode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "moodpost")]
#[command(about = "写真・気分から投稿と楽曲プレイリストを作成するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 気分判定から日記添付まで対話的に実行
    Run {
        /// 写真ファイル
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// 気分を手動指定 (angry/happy/neutral/sad/surprise)
        #[arg(short, long)]
        mood: Option<MoodCode>,

        /// 日記テキスト
        #[arg(short, long, conflicts_with = "canvas")]
        journal: Option<String>,

        /// 手書き日記のPNGファイル
        #[arg(long)]
        canvas: Option<PathBuf>,

        /// 保存済みの選択を使わずに始める
        #[arg(long)]
        fresh: bool,
    },

    /// 写真の気分を判定
    Detect {
        /// 写真ファイル
        #[arg(short, long)]
        image: PathBuf,
    },

    /// 気分に合う楽曲を表示
    Recommend {
        /// 気分 (angry/happy/neutral/sad/surprise)
        #[arg(short, long)]
        mood: MoodCode,

        /// すべての候補を表示
        #[arg(short, long)]
        all: bool,
    },

    /// スナップショット管理
    Snapshot {
        /// スナップショットを削除
        #[arg(long)]
        clear: bool,

        /// スナップショット情報を表示
        #[arg(long)]
        info: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIのベースURLを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// ユーザーIDを設定
        #[arg(long)]
        set_user: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
