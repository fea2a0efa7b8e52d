use super::DataSource;
use crate::error::{RecommendError, Result};
use crate::models::{Operation, TableKind, User, Video, VideoEvent};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

const MIN_AGE: u32 = 18;
const MAX_AGE: u32 = 60;
const FIRST_DAY: u8 = 1;
const LAST_DAY: u8 = 7;

/// Reads `users.csv`, `videos.csv` and `operations.csv` from one directory.
///
/// Every row is validated; a single bad row fails the whole table.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: u32,
    age: u32,
}

#[derive(Debug, Deserialize)]
struct VideoRecord {
    id: u32,
    tag: String,
    views: i64,
    likes: i64,
    #[serde(default)]
    viewed_by: String,
    #[serde(default)]
    liked_by: String,
}

#[derive(Debug, Deserialize)]
struct OperationRecord {
    user_id: u32,
    video_id: u32,
    liked: u8,
    day: u8,
}

impl CsvDataSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path_of(&self, kind: TableKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    fn read_records<R: DeserializeOwned>(&self, kind: TableKind) -> Result<Vec<R>> {
        let path = self.path_of(kind);
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            RecommendError::data_unavailable(format!("failed to open {}: {}", path.display(), e))
        })?;

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<R>().enumerate() {
            let record = row.map_err(|e| {
                RecommendError::data_unavailable(format!(
                    "{} row {}: {}",
                    kind.file_name(),
                    idx + 2,
                    e
                ))
            })?;
            records.push(record);
        }

        info!(
            table = kind.as_str(),
            rows = records.len(),
            path = %path.display(),
            "Loaded CSV table"
        );
        Ok(records)
    }
}

impl DataSource for CsvDataSource {
    fn read_users(&self) -> Result<Vec<User>> {
        self.read_records::<UserRecord>(TableKind::Users)?
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                if !(MIN_AGE..=MAX_AGE).contains(&record.age) {
                    return Err(invalid_row(
                        TableKind::Users,
                        idx,
                        format!("age {} outside {}-{}", record.age, MIN_AGE, MAX_AGE),
                    ));
                }
                Ok(User {
                    id: record.id,
                    age: record.age,
                })
            })
            .collect()
    }

    fn read_videos(&self) -> Result<Vec<Video>> {
        self.read_records::<VideoRecord>(TableKind::Videos)?
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                if record.views < 0 || record.likes < 0 {
                    return Err(invalid_row(
                        TableKind::Videos,
                        idx,
                        "views and likes must be non-negative",
                    ));
                }
                if record.tag.trim().is_empty() {
                    return Err(invalid_row(TableKind::Videos, idx, "empty tag"));
                }
                let viewed_by = parse_event_list(&record.viewed_by)
                    .map_err(|e| invalid_row(TableKind::Videos, idx, format!("viewed_by: {}", e)))?;
                let liked_by = parse_event_list(&record.liked_by)
                    .map_err(|e| invalid_row(TableKind::Videos, idx, format!("liked_by: {}", e)))?;

                Ok(Video {
                    id: record.id,
                    tag: record.tag,
                    views: record.views as u64,
                    likes: record.likes as u64,
                    viewed_by,
                    liked_by,
                })
            })
            .collect()
    }

    fn read_operations(&self) -> Result<Vec<Operation>> {
        let operations = self
            .read_records::<OperationRecord>(TableKind::Operations)?
            .into_iter()
            .enumerate()
            .map(|(idx, record)| {
                if record.liked > 1 {
                    return Err(invalid_row(
                        TableKind::Operations,
                        idx,
                        format!("liked must be 0 or 1, got {}", record.liked),
                    ));
                }
                if !(FIRST_DAY..=LAST_DAY).contains(&record.day) {
                    return Err(invalid_row(
                        TableKind::Operations,
                        idx,
                        format!("day {} outside {}-{}", record.day, FIRST_DAY, LAST_DAY),
                    ));
                }
                Ok(Operation {
                    user_id: record.user_id,
                    video_id: record.video_id,
                    liked: record.liked == 1,
                    day: record.day,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if operations.is_empty() {
            warn!("operations.csv contains no rows");
        }
        Ok(operations)
    }
}

fn invalid_row(kind: TableKind, idx: usize, reason: impl std::fmt::Display) -> RecommendError {
    // +2: one for the header, one for 1-based line numbers
    RecommendError::data_unavailable(format!("{} row {}: {}", kind.file_name(), idx + 2, reason))
}

/// Parse a list literal such as `[(1, 3), (2, 5)]` into events.
fn parse_event_list(raw: &str) -> std::result::Result<Vec<VideoEvent>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("expected a [...] list, got {:?}", trimmed))?;

    let mut events = Vec::new();
    for chunk in inner.split(')') {
        let chunk = chunk.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if chunk.is_empty() {
            continue;
        }
        let pair = chunk
            .strip_prefix('(')
            .ok_or_else(|| format!("malformed pair {:?}", chunk))?;
        let mut parts = pair.split(',').map(str::trim);
        let user_id = parts
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| format!("bad user id in {:?}", chunk))?;
        let day = parts
            .next()
            .and_then(|s| s.parse::<u8>().ok())
            .ok_or_else(|| format!("bad day in {:?}", chunk))?;
        if parts.next().is_some() {
            return Err(format!("pair has more than two fields: {:?}", chunk));
        }
        events.push(VideoEvent { user_id, day });
    }

    Ok(events)
}
