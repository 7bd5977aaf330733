use super::{
    BucketEntry, DeleteDisposition, DeleteTicket, IndexError, MediaIndex, MediaRow, MediaSelection,
    compare_rows,
};
use crate::gallery::MediumKind;
use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::PathBuf;
use std::sync::Mutex;

/// In-memory media index with hand-built rows. Used as the fixture for
/// the invariant tests; the pixel source is synthesized from each row's
/// dimensions.
#[derive(Default)]
pub struct MemoryIndex {
    rows: Mutex<Vec<StoredRow>>,
    empty_buckets: Mutex<Vec<(String, String)>>,
    unavailable: bool,
}

struct StoredRow {
    row: MediaRow,
    bucket_id: String,
    bucket_name: String,
    trashed: bool,
    protected: bool,
    path: Option<PathBuf>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that answers every call with `IndexError::Unavailable`.
    pub fn unavailable() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            empty_buckets: Mutex::new(Vec::new()),
            unavailable: true,
        }
    }

    /// A collection that exists but has no members of any kind.
    pub fn push_empty_bucket(&mut self, id: &str, name: &str) {
        self.empty_buckets
            .get_mut()
            .expect("lock poisoned")
            .push((id.to_string(), name.to_string()));
    }

    pub fn push(&mut self, row: MediaRow, bucket_id: &str, bucket_name: &str) {
        self.rows.get_mut().expect("lock poisoned").push(StoredRow {
            row,
            bucket_id: bucket_id.to_string(),
            bucket_name: bucket_name.to_string(),
            trashed: false,
            protected: false,
            path: None,
        });
    }

    pub fn push_trashed(&mut self, row: MediaRow, bucket_id: &str, bucket_name: &str) {
        self.rows.get_mut().expect("lock poisoned").push(StoredRow {
            row,
            bucket_id: bucket_id.to_string(),
            bucket_name: bucket_name.to_string(),
            trashed: true,
            protected: false,
            path: None,
        });
    }

    /// Mark a medium as permission-gated: deleting it requires the
    /// confirmation step.
    pub fn protect(&mut self, id: &str) {
        for stored in self.rows.get_mut().expect("lock poisoned").iter_mut() {
            if stored.row.id == id {
                stored.protected = true;
            }
        }
    }

    pub fn set_native_path(&mut self, id: &str, path: PathBuf) {
        for stored in self.rows.get_mut().expect("lock poisoned").iter_mut() {
            if stored.row.id == id {
                stored.path = Some(path.clone());
            }
        }
    }

    fn check_available(&self) -> Result<(), IndexError> {
        if self.unavailable {
            Err(IndexError::Unavailable("memory index offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MediaIndex for MemoryIndex {
    async fn buckets(&self, kind: MediumKind) -> Result<Vec<BucketEntry>, IndexError> {
        self.check_available()?;
        let rows = self.rows.lock().expect("lock poisoned");
        let mut entries: Vec<BucketEntry> = rows
            .iter()
            .filter(|s| s.row.kind == kind)
            .map(|s| BucketEntry {
                id: s.bucket_id.clone(),
                name: s.bucket_name.clone(),
                trashed: s.trashed,
                empty: false,
            })
            .collect();
        for (id, name) in self.empty_buckets.lock().expect("lock poisoned").iter() {
            entries.push(BucketEntry {
                id: id.clone(),
                name: name.clone(),
                trashed: false,
                empty: true,
            });
        }
        Ok(entries)
    }

    async fn query(
        &self,
        kind: MediumKind,
        selection: &MediaSelection,
    ) -> Result<Vec<MediaRow>, IndexError> {
        self.check_available()?;
        let rows = self.rows.lock().expect("lock poisoned");
        let mut matching: Vec<MediaRow> = rows
            .iter()
            .filter(|s| {
                s.row.kind == kind
                    && !s.trashed
                    && selection
                        .bucket
                        .as_deref()
                        .is_none_or(|bucket| s.bucket_id == bucket)
            })
            .map(|s| s.row.clone())
            .collect();

        matching.sort_by(compare_rows);
        if selection.newest {
            matching.reverse();
        }

        let skip = selection.skip.unwrap_or(0);
        Ok(match selection.take {
            Some(take) => matching.into_iter().skip(skip).take(take).collect(),
            None => matching.into_iter().skip(skip).collect(),
        })
    }

    async fn count(&self, kind: MediumKind, bucket: Option<&str>) -> Result<usize, IndexError> {
        self.check_available()?;
        let rows = self.rows.lock().expect("lock poisoned");
        Ok(rows
            .iter()
            .filter(|s| {
                s.row.kind == kind
                    && !s.trashed
                    && bucket.is_none_or(|bucket| s.bucket_id == bucket)
            })
            .count())
    }

    async fn row(&self, kind: MediumKind, id: &str) -> Result<Option<MediaRow>, IndexError> {
        self.check_available()?;
        let rows = self.rows.lock().expect("lock poisoned");
        Ok(rows
            .iter()
            .find(|s| s.row.kind == kind && !s.trashed && s.row.id == id)
            .map(|s| s.row.clone()))
    }

    async fn native_path(
        &self,
        kind: MediumKind,
        id: &str,
    ) -> Result<Option<PathBuf>, IndexError> {
        self.check_available()?;
        let rows = self.rows.lock().expect("lock poisoned");
        Ok(rows
            .iter()
            .find(|s| s.row.kind == kind && !s.trashed && s.row.id == id)
            .and_then(|s| s.path.clone()))
    }

    async fn open_original(
        &self,
        kind: MediumKind,
        id: &str,
    ) -> Result<Option<DynamicImage>, IndexError> {
        let Some(row) = self.row(kind, id).await? else {
            return Ok(None);
        };
        if kind != MediumKind::Image || row.width == 0 || row.height == 0 {
            return Ok(None);
        }

        // Deterministic solid-color pixels derived from the id.
        let shade = row.id.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
        let pixels = RgbImage::from_pixel(row.width, row.height, Rgb([shade, shade, shade]));
        Ok(Some(DynamicImage::ImageRgb8(pixels)))
    }

    async fn delete(&self, kind: MediumKind, id: &str) -> Result<DeleteDisposition, IndexError> {
        self.check_available()?;
        let mut rows = self.rows.lock().expect("lock poisoned");
        let Some(position) = rows
            .iter()
            .position(|s| s.row.kind == kind && !s.trashed && s.row.id == id)
        else {
            return Ok(DeleteDisposition::NotFound);
        };

        if rows[position].protected {
            return Ok(DeleteDisposition::NeedsConfirmation(DeleteTicket {
                kind,
                id: id.to_string(),
            }));
        }

        rows.remove(position);
        Ok(DeleteDisposition::Deleted)
    }

    async fn confirm_delete(&self, ticket: DeleteTicket) -> Result<bool, IndexError> {
        self.check_available()?;
        let mut rows = self.rows.lock().expect("lock poisoned");
        let Some(position) = rows
            .iter()
            .position(|s| s.row.kind == ticket.kind && s.row.id == ticket.id)
        else {
            return Ok(false);
        };
        rows.remove(position);
        Ok(true)
    }
}
