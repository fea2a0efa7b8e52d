use recommendation_engine::{
    build_interest_matrix, Config, CsvDataSource, InteractionStore, RecommendError,
    RecommendationEngine,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const TAGS: [&str; 4] = ["movie", "music", "game", "tech"];

/// 12 users, 40 videos, every user touching a handful of videos
fn write_dataset(dir: &Path) {
    let mut users = String::from("id,age\n");
    for id in 1..=12 {
        users.push_str(&format!("{},{}\n", id, 18 + id * 3));
    }

    let mut videos = String::from("id,tag,views,likes,viewed_by,liked_by\n");
    for id in 1..=40 {
        videos.push_str(&format!("{},{},0,0,[],[]\n", id, TAGS[(id % 4) as usize]));
    }

    let mut operations = String::from("user_id,video_id,liked,day\n");
    for user in 1..=12u32 {
        for step in 0..6u32 {
            let video = (user * 7 + step * 3) % 40 + 1;
            let liked = (user + step) % 3 == 0;
            let day = step % 7 + 1;
            operations.push_str(&format!("{},{},{},{}\n", user, video, liked as u8, day));
        }
    }

    fs::write(dir.join("users.csv"), users).unwrap();
    fs::write(dir.join("videos.csv"), videos).unwrap();
    fs::write(dir.join("operations.csv"), operations).unwrap();
}

fn engine_for(dir: &Path) -> RecommendationEngine {
    let mut config = Config::default();
    config.data.data_dir = dir.to_path_buf();
    RecommendationEngine::from_config(config)
}

fn history(dir: &Path, user_id: u32) -> HashSet<u32> {
    let content = fs::read_to_string(dir.join("operations.csv")).unwrap();
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            if fields[0].parse::<u32>().ok()? != user_id {
                return None;
            }
            fields[1].parse::<u32>().ok()
        })
        .collect()
}

#[test]
fn test_similar_users_properties_for_every_user() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let engine = engine_for(dir.path());

    for user_id in 1..=12 {
        let neighbors = engine.find_similar(user_id).unwrap();

        assert!(neighbors.len() <= 5);
        assert!(neighbors.iter().all(|n| n.user_id != user_id));
        assert!(neighbors
            .iter()
            .all(|n| (-1.0..=1.0).contains(&n.similarity)));
        assert!(neighbors
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
    }
}

#[test]
fn test_recommendations_exclude_history() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let engine = engine_for(dir.path());

    for user_id in 1..=12 {
        let seen = history(dir.path(), user_id);
        match engine.recommend(user_id) {
            Ok(videos) => {
                assert!(videos.len() <= 10);
                assert!(videos.iter().all(|v| !seen.contains(&v.video_id)));
                assert!(videos.iter().all(|v| TAGS.contains(&v.tag.as_str())));
                assert!(videos.windows(2).all(|w| w[0].score >= w[1].score));
            }
            Err(RecommendError::NoCandidates(_)) => {}
            Err(other) => panic!("unexpected error for user {}: {}", user_id, other),
        }
    }
}

#[test]
fn test_unknown_user_on_both_operations() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let engine = engine_for(dir.path());

    assert!(matches!(
        engine.find_similar(999),
        Err(RecommendError::UnknownUser(999))
    ));
    assert!(matches!(
        engine.recommend(999),
        Err(RecommendError::UnknownUser(999))
    ));
}

#[test]
fn test_matrix_is_cached_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let engine = engine_for(dir.path());

    engine.find_similar(1).unwrap();
    let first = engine.matrix_cache().get().unwrap();
    engine.recommend(1).ok();
    let second = engine.matrix_cache().get().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    engine.invalidate_cache();
    let rebuilt = engine.preload().unwrap();
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(first.user_ids(), rebuilt.user_ids());
    for row in 0..first.n_users() {
        assert_eq!(first.row_vector(row), rebuilt.row_vector(row));
    }
}

#[test]
fn test_reload_picks_up_regenerated_data() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let engine = engine_for(dir.path());
    assert!(engine.find_similar(13).is_err());

    let mut operations = fs::read_to_string(dir.path().join("operations.csv")).unwrap();
    operations.push_str("13,1,1,2\n");
    fs::write(dir.path().join("operations.csv"), operations).unwrap();

    // still served from cache
    assert!(engine.find_similar(13).is_err());

    engine.reload_data();
    assert!(engine.find_similar(13).is_ok());
}

#[test]
fn test_two_users_with_partial_tag_overlap() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("users.csv"), "id,age\n1,30\n2,31\n").unwrap();
    fs::write(
        dir.path().join("videos.csv"),
        concat!(
            "id,tag,views,likes,viewed_by,liked_by\n",
            "10,movie,2,1,[],[]\n",
            "11,music,1,1,[],[]\n",
            "12,movie,1,0,[],[]\n",
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("operations.csv"),
        "user_id,video_id,liked,day\n1,10,0,1\n1,11,1,2\n2,10,1,1\n2,12,0,3\n",
    )
    .unwrap();

    let store = InteractionStore::from_source(CsvDataSource::new(dir.path()));
    let matrix = build_interest_matrix(&store).unwrap();

    // {movie: 1, music: 3} and {movie: 4} before normalization
    let norm = 10f64.sqrt();
    assert!((matrix.value(1, "movie") - 1.0 / norm).abs() < 1e-12);
    assert!((matrix.value(1, "music") - 3.0 / norm).abs() < 1e-12);
    assert!((matrix.value(2, "movie") - 1.0).abs() < 1e-12);

    let engine = engine_for(dir.path());
    let neighbors = engine.find_similar(1).unwrap();
    assert_eq!(neighbors.len(), 1);
    assert!(neighbors[0].similarity > 0.0 && neighbors[0].similarity < 1.0);
    assert!((neighbors[0].similarity - 0.3162).abs() < 1e-4);
}

#[test]
fn test_missing_tables_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_for(dir.path());

    let err = engine.find_similar(1).unwrap_err();
    assert!(err.is_fatal());
    assert!(engine.preload().unwrap_err().is_fatal());
}
