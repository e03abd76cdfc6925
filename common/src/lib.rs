//! Moodpost Common Library
//!
//! CLIとサービス層で共有される型・取り込みパーサー・選択ロジック

pub mod error;
pub mod mood;
pub mod parser;
pub mod selection;
pub mod types;

pub use error::{Error, Result};
pub use mood::MoodCode;
pub use parser::{
    coerce_track, ingest_tracks, parse_journal_ack, parse_post_created, parse_prediction,
    parse_recommendations, IngestedTracks, Rejection,
};
pub use selection::{display_order, is_selected, now_playing, selection_rank, toggle, SelectionOutcome};
pub use types::{PostCreated, Prediction, Track, TrackSubmission};
