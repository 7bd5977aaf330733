// Media index seam - the platform media index behind the facade.
//
// Rows keep the platform flavor: whole-second timestamps that may be
// absent, rotation in degrees, opaque bucket identifiers. Normalization
// into canonical records happens in the gallery layer.
mod fs;
mod memory;

pub use fs::FsMediaIndex;
pub use memory::MemoryIndex;

use crate::gallery::MediumKind;
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("media index unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One raw row of the media index.
#[derive(Debug, Clone)]
pub struct MediaRow {
    pub id: String,
    pub kind: MediumKind,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub width: u32,
    pub height: u32,
    pub size_bytes: Option<u64>,
    /// Rotation in degrees, as platform indices report it.
    pub orientation_degrees: i64,
    /// Milliseconds; 0 for images and for videos of unknown length.
    pub duration_ms: i64,
    /// Whole seconds since the epoch; `None` when the index has no value.
    pub date_added: Option<i64>,
    pub date_modified: Option<i64>,
}

/// One bucket sighting. The index emits an entry per indexed medium (plus
/// an `empty` placeholder for collections with no matching members) and
/// the album enumerator does the grouping and counting.
#[derive(Debug, Clone)]
pub struct BucketEntry {
    pub id: String,
    pub name: String,
    /// Recently-deleted pseudo-collections; enumeration must skip these.
    pub trashed: bool,
    /// Placeholder for a collection with no matching members.
    pub empty: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MediaSelection {
    /// `None` means no bucket filter (the synthetic All album).
    pub bucket: Option<String>,
    pub newest: bool,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

/// Continuation token for a delete that needs out-of-band confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTicket {
    pub kind: MediumKind,
    pub id: String,
}

#[derive(Debug)]
pub enum DeleteDisposition {
    Deleted,
    NotFound,
    NeedsConfirmation(DeleteTicket),
}

/// The two-key sort used everywhere: creation date, then modification
/// date, ascending, with absent timestamps ordering lowest.
pub fn compare_rows(a: &MediaRow, b: &MediaRow) -> Ordering {
    a.date_added
        .cmp(&b.date_added)
        .then(a.date_modified.cmp(&b.date_modified))
}

#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Bucket sightings for one medium kind, one per indexed medium.
    async fn buckets(&self, kind: MediumKind) -> Result<Vec<BucketEntry>, IndexError>;

    /// Query rows with the two-key sort, direction, offset and limit
    /// applied natively by the index.
    async fn query(
        &self,
        kind: MediumKind,
        selection: &MediaSelection,
    ) -> Result<Vec<MediaRow>, IndexError>;

    /// Number of rows matching a bucket filter (`None` = whole index).
    async fn count(&self, kind: MediumKind, bucket: Option<&str>) -> Result<usize, IndexError>;

    async fn row(&self, kind: MediumKind, id: &str) -> Result<Option<MediaRow>, IndexError>;

    /// Direct backing file of a medium, when the index can hand one out.
    async fn native_path(&self, kind: MediumKind, id: &str)
    -> Result<Option<PathBuf>, IndexError>;

    /// Decoded pixels of the original, `None` when the asset is gone or
    /// cannot be decoded (soft fail).
    async fn open_original(
        &self,
        kind: MediumKind,
        id: &str,
    ) -> Result<Option<DynamicImage>, IndexError>;

    /// Attempt direct deletion. A permission-gated index answers with
    /// `NeedsConfirmation`; the caller completes via `confirm_delete`.
    async fn delete(&self, kind: MediumKind, id: &str) -> Result<DeleteDisposition, IndexError>;

    async fn confirm_delete(&self, ticket: DeleteTicket) -> Result<bool, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(added: Option<i64>, modified: Option<i64>) -> MediaRow {
        MediaRow {
            id: "x".to_string(),
            kind: MediumKind::Image,
            filename: None,
            title: None,
            mime_type: None,
            width: 0,
            height: 0,
            size_bytes: None,
            orientation_degrees: 0,
            duration_ms: 0,
            date_added: added,
            date_modified: modified,
        }
    }

    #[test]
    fn creation_date_is_the_primary_key() {
        let older = row(Some(10), Some(99));
        let newer = row(Some(20), Some(1));
        assert_eq!(compare_rows(&older, &newer), Ordering::Less);
    }

    #[test]
    fn modification_date_breaks_ties() {
        let a = row(Some(10), Some(1));
        let b = row(Some(10), Some(2));
        assert_eq!(compare_rows(&a, &b), Ordering::Less);
        assert_eq!(compare_rows(&b, &a), Ordering::Greater);
    }

    #[test]
    fn absent_timestamps_sort_lowest() {
        let dated = row(Some(0), None);
        let undated = row(None, Some(100));
        assert_eq!(compare_rows(&undated, &dated), Ordering::Less);

        let tie_dated = row(Some(5), Some(1));
        let tie_undated = row(Some(5), None);
        assert_eq!(compare_rows(&tie_undated, &tie_dated), Ordering::Less);
    }
}
