// ============================================
// Interaction Store
// ============================================
//
// Read-only accessor over the three relations (users, videos, operations).
// Each table is read from the injected DataSource on first access and kept
// in memory until `invalidate()`.

mod csv_source;

pub use csv_source::CsvDataSource;

use crate::error::{RecommendError, Result};
use crate::models::{Operation, TableKind, User, UserId, Video, VideoId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where the raw tables come from. The core never reads storage directly.
#[cfg_attr(test, mockall::automock)]
pub trait DataSource: Send + Sync {
    fn read_users(&self) -> Result<Vec<User>>;
    fn read_videos(&self) -> Result<Vec<Video>>;
    fn read_operations(&self) -> Result<Vec<Operation>>;
}

/// Tables handed over by an external loader
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    users: Vec<User>,
    videos: Vec<Video>,
    operations: Vec<Operation>,
}

impl InMemoryDataSource {
    pub fn new(users: Vec<User>, videos: Vec<Video>, operations: Vec<Operation>) -> Self {
        Self {
            users,
            videos,
            operations,
        }
    }
}

impl DataSource for InMemoryDataSource {
    fn read_users(&self) -> Result<Vec<User>> {
        Ok(self.users.clone())
    }

    fn read_videos(&self) -> Result<Vec<Video>> {
        Ok(self.videos.clone())
    }

    fn read_operations(&self) -> Result<Vec<Operation>> {
        Ok(self.operations.clone())
    }
}

/// Videos with an id index
#[derive(Debug)]
pub struct VideoTable {
    rows: Vec<Video>,
    by_id: HashMap<VideoId, usize>,
}

impl VideoTable {
    fn new(rows: Vec<Video>) -> Self {
        let by_id = rows
            .iter()
            .enumerate()
            .map(|(idx, video)| (video.id, idx))
            .collect();
        Self { rows, by_id }
    }

    pub fn get(&self, id: VideoId) -> Option<&Video> {
        self.by_id.get(&id).map(|&idx| &self.rows[idx])
    }

    pub fn tag(&self, id: VideoId) -> Option<&str> {
        self.get(id).map(|video| video.tag.as_str())
    }

    pub fn rows(&self) -> &[Video] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Operations plus the distinct users that appear in them
#[derive(Debug)]
pub struct OperationTable {
    rows: Vec<Operation>,
    /// Distinct user ids in first-seen order
    user_order: Vec<UserId>,
    users: HashSet<UserId>,
}

impl OperationTable {
    fn new(rows: Vec<Operation>) -> Self {
        let mut user_order = Vec::new();
        let mut users = HashSet::new();
        for op in &rows {
            if users.insert(op.user_id) {
                user_order.push(op.user_id);
            }
        }
        Self {
            rows,
            user_order,
            users,
        }
    }

    pub fn rows(&self) -> &[Operation] {
        &self.rows
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_order
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.users.contains(&user_id)
    }

    /// Videos the user has interacted with
    pub fn videos_of(&self, user_id: UserId) -> HashSet<VideoId> {
        self.rows
            .iter()
            .filter(|op| op.user_id == user_id)
            .map(|op| op.video_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A loaded table, as returned by `InteractionStore::load`
#[derive(Debug, Clone)]
pub enum Table {
    Users(Arc<Vec<User>>),
    Videos(Arc<VideoTable>),
    Operations(Arc<OperationTable>),
}

impl Table {
    pub fn kind(&self) -> TableKind {
        match self {
            Table::Users(_) => TableKind::Users,
            Table::Videos(_) => TableKind::Videos,
            Table::Operations(_) => TableKind::Operations,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Table::Users(rows) => rows.len(),
            Table::Videos(table) => table.len(),
            Table::Operations(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached tables. All three live behind one lock so an invalidation swaps them
/// together.
#[derive(Default)]
struct TableSlots {
    users: Option<Arc<Vec<User>>>,
    videos: Option<Arc<VideoTable>>,
    operations: Option<Arc<OperationTable>>,
}

pub struct InteractionStore {
    source: Box<dyn DataSource>,
    tables: RwLock<TableSlots>,
}

impl InteractionStore {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self {
            source,
            tables: RwLock::new(TableSlots::default()),
        }
    }

    pub fn from_source<S: DataSource + 'static>(source: S) -> Self {
        Self::new(Box::new(source))
    }

    pub fn load(&self, kind: TableKind) -> Result<Table> {
        match kind {
            TableKind::Users => self.users().map(Table::Users),
            TableKind::Videos => self.videos().map(Table::Videos),
            TableKind::Operations => self.operations().map(Table::Operations),
        }
    }

    pub fn users(&self) -> Result<Arc<Vec<User>>> {
        self.load_cached(
            TableKind::Users,
            |tables| tables.users.clone(),
            |tables, table| tables.users = Some(table),
            || self.source.read_users(),
        )
    }

    pub fn videos(&self) -> Result<Arc<VideoTable>> {
        self.load_cached(
            TableKind::Videos,
            |tables| tables.videos.clone(),
            |tables, table| tables.videos = Some(table),
            || self.source.read_videos().map(VideoTable::new),
        )
    }

    pub fn operations(&self) -> Result<Arc<OperationTable>> {
        self.load_cached(
            TableKind::Operations,
            |tables| tables.operations.clone(),
            |tables, table| tables.operations = Some(table),
            || self.source.read_operations().map(OperationTable::new),
        )
    }

    /// Load every table up front
    pub fn preload(&self) -> Result<()> {
        for kind in [TableKind::Videos, TableKind::Operations, TableKind::Users] {
            let table = self.load(kind)?;
            if table.is_empty() {
                warn!(table = kind.as_str(), "Table is empty");
            }
        }
        info!("All tables preloaded");
        Ok(())
    }

    /// Drop all cached tables in one step; the next access re-reads the source.
    pub fn invalidate(&self) {
        *self.tables.write() = TableSlots::default();
        info!("Interaction store cache cleared");
    }

    /// Whether the user appears in the operations table
    pub fn contains_user(&self, user_id: UserId) -> Result<bool> {
        Ok(self.operations()?.contains_user(user_id))
    }

    /// Distinct users with at least one operation, first-seen order
    pub fn user_ids(&self) -> Result<Vec<UserId>> {
        Ok(self.operations()?.user_ids().to_vec())
    }

    pub fn video(&self, video_id: VideoId) -> Result<Option<Video>> {
        Ok(self.videos()?.get(video_id).cloned())
    }

    pub fn videos_viewed_by(&self, user_id: UserId) -> Result<HashSet<VideoId>> {
        Ok(self.operations()?.videos_of(user_id))
    }

    fn load_cached<T, R>(
        &self,
        kind: TableKind,
        cached: fn(&TableSlots) -> Option<Arc<T>>,
        fill: fn(&mut TableSlots, Arc<T>),
        read: R,
    ) -> Result<Arc<T>>
    where
        R: FnOnce() -> Result<T>,
    {
        if let Some(table) = cached(&self.tables.read()) {
            return Ok(table);
        }

        let mut tables = self.tables.write();
        // another caller may have filled the slot while we waited for the lock
        if let Some(table) = cached(&tables) {
            return Ok(table);
        }

        let table = read().map_err(|e| {
            error!(table = kind.as_str(), error = %e, "Failed to load table");
            match e {
                RecommendError::DataUnavailable(_) => e,
                other => RecommendError::data_unavailable(format!(
                    "{}: {}",
                    kind.as_str(),
                    other
                )),
            }
        })?;
        let table = Arc::new(table);
        fill(&mut tables, Arc::clone(&table));

        debug!(table = kind.as_str(), "Table loaded into cache");
        Ok(table)
    }
}
