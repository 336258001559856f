//! JSON-document backed release catalog.
//!
//! The whole catalog lives in one JSON document that is rewritten atomically
//! on every mutation. Mutations are serialized through `write_lock`; readers
//! clone the `Arc` of the last committed snapshot and never block on a write
//! in progress.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::atomic;
use super::{
    CatalogStats, Release, ReleasePage, ReleaseQuery, ReleaseStatus, ReleaseStore, ScrapedFields,
    SortKey, StoreError, UpsertKind, UpsertOutcome,
};

const DOCUMENT_VERSION: u32 = 1;

/// On-disk layout of the catalog document.
#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    next_id: u64,
    last_sync_at: Option<DateTime<Utc>>,
    releases: &'a [Release],
}

/// In-memory committed state. `releases` is kept sorted by id.
#[derive(Debug, Clone)]
struct Catalog {
    next_id: u64,
    last_sync_at: Option<DateTime<Utc>>,
    releases: Vec<Release>,
    by_url: HashMap<String, u64>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            next_id: 1,
            last_sync_at: None,
            releases: Vec::new(),
            by_url: HashMap::new(),
        }
    }
}

impl Catalog {
    fn from_document(doc: StoredDocument) -> Self {
        let mut releases = doc.releases;
        releases.sort_by_key(|r| r.id);

        let mut by_url = HashMap::with_capacity(releases.len());
        releases.retain(|r| {
            if by_url.contains_key(&r.source_url) {
                warn!(id = r.id, url = %r.source_url, "Dropping duplicate catalog entry");
                false
            } else {
                by_url.insert(r.source_url.clone(), r.id);
                true
            }
        });

        let max_id = releases.last().map(|r| r.id).unwrap_or(0);
        Self {
            next_id: doc.next_id.max(max_id + 1),
            last_sync_at: doc.last_sync_at,
            releases,
            by_url,
        }
    }

    fn index_of(&self, id: u64) -> Option<usize> {
        self.releases.binary_search_by_key(&id, |r| r.id).ok()
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let doc = DocumentRef {
            version: DOCUMENT_VERSION,
            next_id: self.next_id,
            last_sync_at: self.last_sync_at,
            releases: &self.releases,
        };
        Ok(serde_json::to_vec_pretty(&doc)?)
    }
}

/// Release catalog persisted as a single JSON document.
pub struct JsonReleaseStore {
    path: PathBuf,
    snapshot: RwLock<Arc<Catalog>>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for JsonReleaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonReleaseStore")
            .field("path", &self.path)
            .finish()
    }
}

impl JsonReleaseStore {
    /// Open the catalog at `path`, creating an empty one if the file is missing.
    ///
    /// A document that fails to parse is moved aside to
    /// `<path>.corrupt-<timestamp>` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let catalog = Self::load(&path)?;
        info!(
            path = %path.display(),
            releases = catalog.releases.len(),
            "Release catalog opened"
        );
        Ok(Self {
            path,
            snapshot: RwLock::new(Arc::new(catalog)),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Catalog, StoreError> {
        let stale_tmp = atomic::temp_path(path);
        if stale_tmp.exists() {
            debug!(path = %stale_tmp.display(), "Removing leftover temp file");
            let _ = fs::remove_file(&stale_tmp);
        }

        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Catalog::default()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<StoredDocument>(&raw) {
            Ok(doc) => Ok(Catalog::from_document(doc)),
            Err(e) => {
                let mut aside = path.as_os_str().to_owned();
                aside.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
                let aside = PathBuf::from(aside);
                warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Catalog document is unreadable, starting empty"
                );
                fs::rename(path, &aside)?;
                Ok(Catalog::default())
            }
        }
    }

    fn current(&self) -> Arc<Catalog> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one mutation under the write lock.
    ///
    /// `f` works on a copy of the committed catalog and reports whether it
    /// changed anything. Changed copies are persisted before they become the
    /// visible snapshot; a failed write leaves both disk and memory as they were.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Catalog) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = (*self.current()).clone();
        let (value, dirty) = f(&mut next)?;
        if dirty {
            atomic::write_atomic(&self.path, &next.to_bytes()?)?;
            *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        }
        Ok(value)
    }

    /// Write the committed snapshot to another file.
    pub fn backup_to(&self, destination: &Path) -> Result<(), StoreError> {
        let bytes = self.current().to_bytes()?;
        atomic::write_atomic(destination, &bytes)?;
        info!(destination = %destination.display(), "Catalog backup written");
        Ok(())
    }

    /// Number of entries in the committed snapshot.
    pub fn len(&self) -> usize {
        self.current().releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn merge(
    release: &mut Release,
    fields: ScrapedFields,
    now: DateTime<Utc>,
) -> UpsertKind {
    let hash = fields.content_hash();
    if release.content_hash == hash {
        return UpsertKind::Unchanged;
    }
    release.apply_scrape(fields, hash, now);
    UpsertKind::Updated
}

fn compare_dates_desc(a: &Release, b: &Release) -> Ordering {
    // `None` sorts below any date, so descending puts unknown dates last.
    b.publish_date
        .cmp(&a.publish_date)
        .then_with(|| b.id.cmp(&a.id))
}

fn compare_dates_asc(a: &Release, b: &Release) -> Ordering {
    match (a.publish_date, b.publish_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

fn compare_titles(a: &Release, b: &Release) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

impl ReleaseStore for JsonReleaseStore {
    fn upsert_from_scrape(
        &self,
        source_url: &str,
        fields: ScrapedFields,
    ) -> Result<UpsertOutcome, StoreError> {
        self.mutate(|catalog| {
            let now = Utc::now();
            if let Some(id) = catalog.by_url.get(source_url).copied() {
                let idx = catalog
                    .index_of(id)
                    .ok_or_else(|| StoreError::Internal(format!("url index points at missing id {}", id)))?;
                let kind = merge(&mut catalog.releases[idx], fields, now);
                return Ok((UpsertOutcome { id, kind }, kind == UpsertKind::Updated));
            }

            let id = catalog.next_id;
            catalog.next_id += 1;
            catalog
                .releases
                .push(Release::from_scrape(id, source_url, fields, now));
            catalog.by_url.insert(source_url.to_string(), id);
            debug!(id, url = source_url, "Release created");
            Ok((
                UpsertOutcome {
                    id,
                    kind: UpsertKind::Created,
                },
                true,
            ))
        })
    }

    fn refresh(&self, id: u64, fields: ScrapedFields) -> Result<(Release, UpsertKind), StoreError> {
        self.mutate(|catalog| {
            let idx = catalog.index_of(id).ok_or(StoreError::NotFound(id))?;
            let kind = merge(&mut catalog.releases[idx], fields, Utc::now());
            Ok((
                (catalog.releases[idx].clone(), kind),
                kind == UpsertKind::Updated,
            ))
        })
    }

    fn get(&self, id: u64) -> Result<Release, StoreError> {
        let catalog = self.current();
        catalog
            .index_of(id)
            .map(|idx| catalog.releases[idx].clone())
            .ok_or(StoreError::NotFound(id))
    }

    fn find_by_url(&self, source_url: &str) -> Result<Option<Release>, StoreError> {
        let catalog = self.current();
        Ok(catalog
            .by_url
            .get(source_url)
            .and_then(|id| catalog.index_of(*id))
            .map(|idx| catalog.releases[idx].clone()))
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.mutate(|catalog| {
            let idx = catalog.index_of(id).ok_or(StoreError::NotFound(id))?;
            let removed = catalog.releases.remove(idx);
            catalog.by_url.remove(&removed.source_url);
            debug!(id, url = %removed.source_url, "Release deleted");
            Ok(((), true))
        })
    }

    fn list(&self, query: &ReleaseQuery) -> Result<ReleasePage, StoreError> {
        let catalog = self.current();
        let mut matched: Vec<&Release> = catalog
            .releases
            .iter()
            .filter(|r| query.matches(r))
            .collect();

        match query.sort {
            SortKey::DateDesc => matched.sort_by(|a, b| compare_dates_desc(a, b)),
            SortKey::DateAsc => matched.sort_by(|a, b| compare_dates_asc(a, b)),
            SortKey::TitleAsc => matched.sort_by(|a, b| compare_titles(a, b)),
            SortKey::TitleDesc => matched.sort_by(|a, b| compare_titles(b, a)),
        }

        let page = query.page.max(1);
        let limit = query.limit.max(1);
        let start = (page as usize - 1).saturating_mul(limit as usize);
        let filtered_total = matched.len();
        let items: Vec<Release> = matched
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        let has_more = start + items.len() < filtered_total;

        Ok(ReleasePage {
            items,
            total: catalog.releases.len(),
            filtered_total,
            page,
            limit,
            has_more,
        })
    }

    fn set_status(&self, id: u64, status: ReleaseStatus) -> Result<Release, StoreError> {
        self.mutate(|catalog| {
            let idx = catalog.index_of(id).ok_or(StoreError::NotFound(id))?;
            let release = &mut catalog.releases[idx];
            if release.status == status {
                return Ok((release.clone(), false));
            }
            release.status = status;
            release.updated_at = Utc::now();
            Ok((release.clone(), true))
        })
    }

    fn clear_all(&self) -> Result<usize, StoreError> {
        self.mutate(|catalog| {
            let removed = catalog.releases.len();
            catalog.releases.clear();
            catalog.by_url.clear();
            Ok((removed, true))
        })
    }

    fn stats(&self) -> Result<CatalogStats, StoreError> {
        let catalog = self.current();
        let mut stats = CatalogStats {
            total: catalog.releases.len(),
            last_sync_at: catalog.last_sync_at,
            ..Default::default()
        };
        for release in &catalog.releases {
            match release.status {
                ReleaseStatus::New => stats.new += 1,
                ReleaseStatus::Downloaded => stats.downloaded += 1,
                ReleaseStatus::Ignored => stats.ignored += 1,
            }
            if release.has_download_links() {
                stats.with_download_links += 1;
            }
            if let Some(date) = release.publish_date {
                stats.latest_publish_date = stats.latest_publish_date.max(Some(date));
                stats.earliest_publish_date = Some(match stats.earliest_publish_date {
                    Some(current) => current.min(date),
                    None => date,
                });
            }
        }
        Ok(stats)
    }

    fn mark_synced(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.mutate(|catalog| {
            catalog.last_sync_at = Some(at);
            Ok(((), true))
        })
    }
}
