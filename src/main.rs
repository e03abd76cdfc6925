use clap::Parser;
use dialoguer::{Input, Select};
use moodpost::api::{HttpMoodApi, JournalEntry, MoodApi};
use moodpost::recommender::RecommendationFetcher;
use moodpost::session::SnapshotStore;
use moodpost::workflow::{Applied, Workflow, WorkflowState};
use moodpost::{capture, cli, config, curate, error};
use cli::{Cli, Commands};
use config::Config;
use error::{MoodPostError, Result};
use moodpost_common::MoodCode;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Run { image, mood, journal, canvas, fresh } => {
            println!("🎵 moodpost - 投稿作成\n");
            run_workflow(&config, image, mood, journal, canvas, fresh).await?;
        }

        Commands::Detect { image } => {
            println!("🔍 moodpost - 気分判定\n");
            let api = HttpMoodApi::new(&config)?;
            let payload = capture::load_image(&image, config.max_image_size)?;
            let prediction = api.predict_mood(&payload).await?;

            println!("気分: {}", prediction.mood.label());
            if let Some(confidence) = prediction.confidence {
                println!("確信度: {:.0}%", confidence * 100.0);
            }
            println!("画像参照: {}", prediction.image_ref);
        }

        Commands::Recommend { mood, all } => {
            println!("🎧 moodpost - 楽曲推薦 ({})\n", mood.label());
            let api = HttpMoodApi::new(&config)?;
            let fetcher = RecommendationFetcher::new(config.recommendation_window);
            let candidates = fetcher.fetch(&api, mood).await?;

            if candidates.is_empty() {
                println!("推薦された楽曲がありません");
            }
            let tracks = if all { &candidates.pool[..] } else { candidates.visible() };
            for (i, track) in tracks.iter().enumerate() {
                println!("{:>2}. {} - {} [{}]", i + 1, track.title, track.artist, track.id);
            }
            if !all && candidates.pool.len() > tracks.len() {
                println!("\n他 {}曲 (--all で表示)", candidates.pool.len() - tracks.len());
            }
        }

        Commands::Snapshot { clear, info } => {
            let store = SnapshotStore::new(config.snapshot_dir()?);
            let path = store.path();

            if info || !clear {
                // デフォルトまたは--info: 情報表示
                if path.exists() {
                    println!("スナップショット情報:");
                    println!("  パス: {}", path.display());
                    if let Ok(meta) = std::fs::metadata(&path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                    match config.get_user_id().ok().and_then(|user| store.load(&user)) {
                        Some(snapshot) => {
                            println!("  保存日時: {}", snapshot.saved_at.format("%Y-%m-%d %H:%M:%S"));
                            println!("  ステップ: {:?}", snapshot.step);
                            if let Some(mood) = snapshot.mood {
                                println!("  気分: {}", mood.label());
                            }
                            println!("  候補: {}曲 / 選択: {}曲", snapshot.candidate_tracks.len(), snapshot.selected_tracks.len());
                            if let Some(post_id) = &snapshot.post_id {
                                println!("  投稿ID: {}", post_id);
                            }
                        }
                        None => println!("  (現在のユーザーでは読み込めません)"),
                    }
                } else {
                    println!("スナップショットが存在しません: {}", path.display());
                }
            }

            if clear {
                match store.clear() {
                    Ok(true) => println!("✔ スナップショットを削除しました: {}", path.display()),
                    Ok(false) => println!("スナップショットが存在しません"),
                    Err(e) => println!("スナップショット削除エラー: {}", e),
                }
            }
        }

        Commands::Config { set_api_url, set_user, show } => {
            let mut config = config;

            if let Some(url) = set_api_url {
                config.set_api_base_url(url)?;
                println!("✔ APIのURLを設定しました");
            }

            if let Some(user) = set_user {
                config.set_user_id(user)?;
                println!("✔ ユーザーIDを設定しました");
            }

            if show {
                println!("設定:");
                println!("  API: {}", config.api_base_url());
                println!("  ユーザーID: {}", config.get_user_id().unwrap_or_else(|_| "未設定".into()));
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  推薦の表示件数: {}", config.recommendation_window);
                println!("  最大画像サイズ: {}px", config.max_image_size);
                match config.snapshot_dir() {
                    Ok(dir) => println!("  スナップショット: {}", dir.display()),
                    Err(e) => println!("  スナップショット: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "moodpost=debug,moodpost_common=debug" } else { "moodpost=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run_workflow(
    config: &Config,
    image: Option<PathBuf>,
    mood: Option<MoodCode>,
    journal: Option<String>,
    canvas: Option<PathBuf>,
    fresh: bool,
) -> Result<()> {
    let user_id = config.get_user_id()?;
    let api = HttpMoodApi::new(config)?;
    let store = SnapshotStore::new(config.snapshot_dir()?);
    if fresh {
        store.clear()?;
    }
    let mut workflow = Workflow::start(api, user_id, store, config.recommendation_window, None)?;

    // 1. 気分判定・推薦
    let resumed = !matches!(workflow.state(), WorkflowState::Idle);
    if !resumed || image.is_some() || mood.is_some() {
        println!("[1/4] 気分を判定中...");
        let mut request = None;
        if let Some(mood) = mood {
            request = workflow.set_manual_mood(Some(mood))?;
        }
        if let Some(path) = image {
            let payload = capture::load_image(&path, config.max_image_size)?;
            request = workflow.submit_image(payload)?;
        }
        if request.is_none() {
            request = workflow.set_manual_mood(Some(prompt_mood()?))?;
        }

        if let Some(request) = request {
            match workflow.run_detection(request).await? {
                Applied::Committed(()) | Applied::Discarded => {}
                Applied::Failed(e) => {
                    println!("⚠ {}", e);
                    workflow.acknowledge()?;
                    if workflow.session().mood().is_none() {
                        return Err(e);
                    }
                }
            }
        }
        if let Some(mood) = workflow.session().mood() {
            println!("✔ 気分: {}\n", mood.label());
        }
    } else {
        println!("保存済みのセッションを再開します ({})\n", workflow.state().label());
    }

    // 2. 選曲
    if matches!(workflow.state(), WorkflowState::Curating) {
        println!("[2/4] 楽曲を選択...");
        if !curate::run_interactive_curation(&mut workflow)? {
            return Ok(());
        }
        println!("✔ {}曲を選択\n", workflow.session().selected_tracks().len());
    }

    // 3. 投稿
    println!("[3/4] 投稿を作成中...");
    let post_id = match workflow.advance().await {
        Ok(post_id) => post_id,
        Err(e) => {
            if !e.is_blocking() {
                // 選曲中へ戻して選択を残す
                workflow.acknowledge()?;
                workflow.leave_step();
            }
            return Err(e);
        }
    };
    println!("✔ 投稿ID: {}\n", post_id);

    // 4. 日記
    println!("[4/4] 日記を添付...");
    let entry = match (journal, canvas) {
        (Some(text), _) => JournalEntry::Text(text),
        (None, Some(path)) => {
            if !path.exists() {
                return Err(MoodPostError::FileNotFound(path.display().to_string()));
            }
            JournalEntry::Drawing(std::fs::read(&path)?)
        }
        (None, None) => JournalEntry::Text(prompt_journal()?),
    };

    if entry.is_empty() {
        workflow.leave_step();
        println!("日記なしで終了します (後で `moodpost run` で再開できます)");
        return Ok(());
    }
    workflow.attach_journal(&entry).await?;

    println!("\n✅ 完了");
    Ok(())
}

fn prompt_mood() -> Result<MoodCode> {
    let labels: Vec<&str> = MoodCode::ALL.iter().map(|m| m.label()).collect();
    let index = Select::new()
        .with_prompt("今の気分は？")
        .items(&labels)
        .default(2)
        .interact()
        .map_err(|e| MoodPostError::CliExecution(e.to_string()))?;
    Ok(MoodCode::ALL[index])
}

fn prompt_journal() -> Result<String> {
    Input::new()
        .with_prompt("日記 (空でスキップ)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| MoodPostError::CliExecution(e.to_string()))
}
