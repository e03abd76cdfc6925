use moodpost::api::{HttpMoodApi, MoodApi};
use moodpost::config::Config;
use moodpost::recommender::RecommendationFetcher;
use moodpost_common::MoodCode;

#[tokio::test]
async fn recommendations_integration() {
    match std::env::var("MOODPOST_API_URL") {
        Ok(url) if !url.trim().is_empty() => {}
        _ => {
            eprintln!("MOODPOST_API_URL not set; skipping integration test");
            return;
        }
    }

    let config = Config::default();
    let api = HttpMoodApi::new(&config).expect("client creation failed");

    let ingested = api
        .fetch_recommendations(MoodCode::Happy)
        .await
        .expect("recommendation request failed");

    for track in &ingested.tracks {
        assert!(!track.id.is_empty());
        assert!(!track.title.is_empty());
    }
    let mut ids: Vec<&str> = ingested.tracks.iter().map(|t| t.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), ingested.tracks.len(), "duplicate track ids");

    let fetcher = RecommendationFetcher::new(config.recommendation_window);
    let candidates = fetcher.fetch(&api, MoodCode::Happy).await.expect("fetch failed");
    assert!(candidates.visible().len() <= config.recommendation_window);
}
