use super::{
    BucketEntry, DeleteDisposition, DeleteTicket, IndexError, MediaIndex, MediaRow, MediaSelection,
    compare_rows,
};
use crate::gallery::MediumKind;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Directory name that plays the role of the platform's recently-deleted
/// pseudo-collection.
const TRASH_BUCKET: &str = ".trash";

/// Filesystem-backed media index. First-level (and deeper) directories of
/// the source root are buckets, files are media. The directory tree is
/// authoritative and re-read on every call; nothing is cached between
/// requests.
pub struct FsMediaIndex {
    root: PathBuf,
}

struct Scanned {
    row: MediaRow,
    bucket_id: String,
    bucket_name: String,
    trashed: bool,
}

impl FsMediaIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn scan(&self) -> Result<Vec<Scanned>, IndexError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_tree(&root))
            .await
            .map_err(|e| IndexError::Io(std::io::Error::other(e)))?
    }

    /// Directories under the root that can act as buckets, relative paths.
    async fn directories(&self) -> Result<Vec<(String, String)>, IndexError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || list_directories(&root))
            .await
            .map_err(|e| IndexError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl MediaIndex for FsMediaIndex {
    async fn buckets(&self, kind: MediumKind) -> Result<Vec<BucketEntry>, IndexError> {
        let media = self.scan().await?;
        let mut entries = Vec::new();
        for scanned in media.iter().filter(|s| s.row.kind == kind) {
            entries.push(BucketEntry {
                id: scanned.bucket_id.clone(),
                name: scanned.bucket_name.clone(),
                trashed: scanned.trashed,
                empty: false,
            });
        }

        // Directories with no matching media still exist as collections.
        for (id, name) in self.directories().await? {
            let populated = media
                .iter()
                .any(|s| s.row.kind == kind && !s.trashed && s.bucket_id == id);
            if !populated {
                entries.push(BucketEntry {
                    id,
                    name,
                    trashed: false,
                    empty: true,
                });
            }
        }

        Ok(entries)
    }

    async fn query(
        &self,
        kind: MediumKind,
        selection: &MediaSelection,
    ) -> Result<Vec<MediaRow>, IndexError> {
        let mut rows: Vec<MediaRow> = self
            .scan()
            .await?
            .into_iter()
            .filter(|s| {
                s.row.kind == kind
                    && !s.trashed
                    && selection
                        .bucket
                        .as_deref()
                        .is_none_or(|bucket| s.bucket_id == bucket)
            })
            .map(|s| s.row)
            .collect();

        rows.sort_by(compare_rows);
        if selection.newest {
            rows.reverse();
        }

        let skip = selection.skip.unwrap_or(0);
        let rows: Vec<MediaRow> = match selection.take {
            Some(take) => rows.into_iter().skip(skip).take(take).collect(),
            None => rows.into_iter().skip(skip).collect(),
        };

        trace!(
            kind = kind.as_str(),
            bucket = ?selection.bucket,
            returned = rows.len(),
            "fs index query"
        );
        Ok(rows)
    }

    async fn count(&self, kind: MediumKind, bucket: Option<&str>) -> Result<usize, IndexError> {
        Ok(self
            .scan()
            .await?
            .iter()
            .filter(|s| {
                s.row.kind == kind
                    && !s.trashed
                    && bucket.is_none_or(|bucket| s.bucket_id == bucket)
            })
            .count())
    }

    async fn row(&self, kind: MediumKind, id: &str) -> Result<Option<MediaRow>, IndexError> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .find(|s| s.row.kind == kind && !s.trashed && s.row.id == id)
            .map(|s| s.row))
    }

    async fn native_path(
        &self,
        kind: MediumKind,
        id: &str,
    ) -> Result<Option<PathBuf>, IndexError> {
        match self.row(kind, id).await? {
            Some(_) => Ok(Some(self.root.join(id))),
            None => Ok(None),
        }
    }

    async fn open_original(
        &self,
        kind: MediumKind,
        id: &str,
    ) -> Result<Option<DynamicImage>, IndexError> {
        if kind != MediumKind::Image {
            return Ok(None);
        }
        let Some(path) = self.native_path(kind, id).await? else {
            return Ok(None);
        };

        let decoded = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| IndexError::Io(std::io::Error::other(e)))?;
        match decoded {
            Ok(img) => Ok(Some(img)),
            Err(e) => {
                debug!("failed to decode original {}: {}", id, e);
                Ok(None)
            }
        }
    }

    async fn delete(&self, kind: MediumKind, id: &str) -> Result<DeleteDisposition, IndexError> {
        let Some(path) = self.native_path(kind, id).await? else {
            return Ok(DeleteDisposition::NotFound);
        };

        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.permissions().readonly() {
            // The analogue of a recoverable permission failure: hand the
            // caller a confirmation step instead of a hard error.
            debug!("delete of {} needs confirmation", id);
            return Ok(DeleteDisposition::NeedsConfirmation(DeleteTicket {
                kind,
                id: id.to_string(),
            }));
        }

        tokio::fs::remove_file(&path).await?;
        Ok(DeleteDisposition::Deleted)
    }

    async fn confirm_delete(&self, ticket: DeleteTicket) -> Result<bool, IndexError> {
        let Some(path) = self.native_path(ticket.kind, &ticket.id).await? else {
            return Ok(false);
        };

        let metadata = tokio::fs::metadata(&path).await?;
        let mut permissions = metadata.permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        tokio::fs::set_permissions(&path, permissions).await?;
        tokio::fs::remove_file(&path).await?;
        Ok(true)
    }
}

fn scan_tree(root: &Path) -> Result<Vec<Scanned>, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::Unavailable(root.display().to_string()));
    }

    let mut media = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() {
                !name.starts_with('.') || name == TRASH_BUCKET
            } else {
                !name.starts_with('.')
            }
        });

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = kind_of(&entry.file_name().to_string_lossy()) else {
            continue;
        };
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        let id = relative.to_string_lossy().to_string();
        let trashed = relative
            .components()
            .next()
            .is_some_and(|c| c.as_os_str() == TRASH_BUCKET);
        let (bucket_id, bucket_name) = bucket_of(root, relative);

        media.push(Scanned {
            row: read_row(entry.path(), &id, kind),
            bucket_id,
            bucket_name,
            trashed,
        });
    }

    Ok(media)
}

fn list_directories(root: &Path) -> Result<Vec<(String, String)>, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::Unavailable(root.display().to_string()));
    }

    let mut dirs = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker.flatten() {
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            let id = relative.to_string_lossy().to_string();
            let name = entry.file_name().to_string_lossy().to_string();
            dirs.push((id, name));
        }
    }
    Ok(dirs)
}

fn bucket_of(root: &Path, relative: &Path) -> (String, String) {
    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            let id = parent.to_string_lossy().to_string();
            let name = parent
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| id.clone());
            (id, name)
        }
        _ => {
            // Files directly under the root belong to a bucket named
            // after the library directory itself.
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "Library".to_string());
            (String::new(), name)
        }
    }
}

fn read_row(path: &Path, id: &str, kind: MediumKind) -> MediaRow {
    let metadata = std::fs::metadata(path).ok();
    let size_bytes = metadata.as_ref().map(|m| m.len());
    let fs_created = metadata.as_ref().and_then(|m| m.created().ok());
    let fs_modified = metadata.as_ref().and_then(|m| m.modified().ok());

    let filename = path.file_name().map(|n| n.to_string_lossy().to_string());
    let title = path.file_stem().map(|s| s.to_string_lossy().to_string());
    let mime_type = mime_guess::from_path(path).first().map(|m| m.to_string());

    let (width, height, orientation_degrees, exif_date) = match kind {
        MediumKind::Image => {
            let (width, height) = image::image_dimensions(path).unwrap_or((0, 0));
            let (degrees, date) = read_exif(path);
            (width, height, degrees, date)
        }
        // The filesystem index does not probe video containers.
        MediumKind::Video => (0, 0, 0, None),
    };

    MediaRow {
        id: id.to_string(),
        kind,
        filename,
        title,
        mime_type,
        width,
        height,
        size_bytes,
        orientation_degrees,
        duration_ms: 0,
        date_added: exif_date.or_else(|| epoch_seconds(fs_created)),
        date_modified: epoch_seconds(fs_modified),
    }
}

/// EXIF rotation in degrees plus the capture date in epoch seconds.
fn read_exif(path: &Path) -> (i64, Option<i64>) {
    let exif = match rexif::parse_file(path) {
        Ok(data) => data,
        Err(e) => {
            trace!("no EXIF data for {}: {}", path.display(), e);
            return (0, None);
        }
    };

    let mut degrees = 0;
    let mut capture = None;

    for entry in &exif.entries {
        match entry.tag {
            rexif::ExifTag::Orientation => {
                if let rexif::TagValue::U16(values) = &entry.value {
                    degrees = match values.first() {
                        Some(1) => 0,
                        Some(8) => 90,
                        Some(3) => 180,
                        Some(6) => 270,
                        _ => 0,
                    };
                }
            }
            rexif::ExifTag::DateTimeOriginal => {
                capture = parse_exif_datetime(&entry.value_more_readable);
            }
            _ => {}
        }
    }

    (degrees, capture)
}

fn parse_exif_datetime(datetime_str: &str) -> Option<i64> {
    // EXIF datetime format: "2005:07:30 07:22:46"
    let naive = NaiveDateTime::parse_from_str(datetime_str, "%Y:%m:%d %H:%M:%S").ok()?;
    let utc = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
    Some(utc.timestamp())
}

fn epoch_seconds(time: Option<SystemTime>) -> Option<i64> {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

fn kind_of(file_name: &str) -> Option<MediumKind> {
    let lower = file_name.to_lowercase();
    let image = lower.ends_with(".jpg")
        || lower.ends_with(".jpeg")
        || lower.ends_with(".png")
        || lower.ends_with(".gif")
        || lower.ends_with(".webp")
        || lower.ends_with(".bmp");
    if image {
        return Some(MediumKind::Image);
    }

    let video = lower.ends_with(".mp4")
        || lower.ends_with(".mov")
        || lower.ends_with(".m4v")
        || lower.ends_with(".mkv")
        || lower.ends_with(".avi")
        || lower.ends_with(".webm");
    if video {
        return Some(MediumKind::Video);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_detection_by_extension() {
        assert_eq!(kind_of("photo.JPG"), Some(MediumKind::Image));
        assert_eq!(kind_of("clip.mp4"), Some(MediumKind::Video));
        assert_eq!(kind_of("notes.txt"), None);
    }

    #[test]
    fn exif_datetime_parses_standard_format() {
        let ts = parse_exif_datetime("2005:07:30 07:22:46").unwrap();
        assert_eq!(ts, 1122708166);
        assert!(parse_exif_datetime("not a date").is_none());
    }
}
