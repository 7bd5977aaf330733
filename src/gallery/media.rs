use super::normalize::normalize;
use super::{ALL_ALBUM_ID, Gallery, GalleryError, MediaPage, MediumKind, MediumRecord};
use crate::index::{IndexError, MediaRow, MediaSelection, compare_rows};
use tracing::debug;

impl Gallery {
    /// Lists one page of media in an album. When no medium kind is given
    /// the image and video result sets are merged client-side and paged
    /// after the merge sort.
    pub async fn list_media(
        &self,
        album_id: &str,
        kind: Option<MediumKind>,
        newest: bool,
        skip: Option<usize>,
        take: Option<usize>,
        light: bool,
    ) -> Result<MediaPage, GalleryError> {
        match kind {
            Some(kind) => {
                self.list_single_kind(album_id, kind, newest, skip, take, light)
                    .await
            }
            None => {
                self.list_merged(album_id, newest, skip, take, light)
                    .await
            }
        }
    }

    async fn list_single_kind(
        &self,
        album_id: &str,
        kind: MediumKind,
        newest: bool,
        skip: Option<usize>,
        take: Option<usize>,
        light: bool,
    ) -> Result<MediaPage, GalleryError> {
        let bucket = bucket_filter(album_id);
        let selection = MediaSelection {
            bucket: bucket.clone(),
            newest,
            skip,
            take,
        };

        let rows = match self.index.query(kind, &selection).await {
            Ok(rows) => rows,
            Err(IndexError::Unavailable(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let total = self
            .index
            .count(kind, bucket.as_deref())
            .await
            .unwrap_or(rows.len());

        Ok(MediaPage {
            start: skip.unwrap_or(0),
            total,
            items: rows.iter().map(|row| normalize(row, light)).collect(),
        })
    }

    async fn list_merged(
        &self,
        album_id: &str,
        newest: bool,
        skip: Option<usize>,
        take: Option<usize>,
        light: bool,
    ) -> Result<MediaPage, GalleryError> {
        // Both sub-queries run unpaginated; slicing happens only after
        // the merge sort, otherwise the window would straddle two
        // independently paged sequences.
        let selection = MediaSelection {
            bucket: bucket_filter(album_id),
            newest,
            skip: None,
            take: None,
        };

        let mut rows = self.query_soft(MediumKind::Image, &selection).await?;
        rows.extend(self.query_soft(MediumKind::Video, &selection).await?);

        rows.sort_by(compare_rows);
        if newest {
            rows.reverse();
        }

        let total = rows.len();
        let start = skip.unwrap_or(0);
        let end = match take {
            Some(take) => (start.saturating_add(take)).min(total),
            None => total,
        };
        let items: Vec<MediumRecord> = if start < total {
            rows[start..end].iter().map(|row| normalize(row, light)).collect()
        } else {
            Vec::new()
        };

        debug!(
            album = album_id,
            start,
            total,
            returned = items.len(),
            "merged media listing"
        );
        Ok(MediaPage {
            start,
            total,
            items,
        })
    }

    /// Single-medium metadata lookup. Without a kind filter the image
    /// index is searched first, then the video index.
    pub async fn get_medium(
        &self,
        medium_id: &str,
        kind: Option<MediumKind>,
    ) -> Result<Option<MediumRecord>, GalleryError> {
        match kind {
            Some(kind) => Ok(self
                .row_soft(kind, medium_id)
                .await?
                .map(|row| normalize(&row, false))),
            None => {
                if let Some(row) = self.row_soft(MediumKind::Image, medium_id).await? {
                    return Ok(Some(normalize(&row, false)));
                }
                Ok(self
                    .row_soft(MediumKind::Video, medium_id)
                    .await?
                    .map(|row| normalize(&row, false)))
            }
        }
    }

    /// Query treating an unavailable index as an empty result set.
    pub(crate) async fn query_soft(
        &self,
        kind: MediumKind,
        selection: &MediaSelection,
    ) -> Result<Vec<MediaRow>, GalleryError> {
        match self.index.query(kind, selection).await {
            Ok(rows) => Ok(rows),
            Err(IndexError::Unavailable(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn row_soft(
        &self,
        kind: MediumKind,
        id: &str,
    ) -> Result<Option<MediaRow>, GalleryError> {
        match self.index.row(kind, id).await {
            Ok(row) => Ok(row),
            Err(IndexError::Unavailable(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn bucket_filter(album_id: &str) -> Option<String> {
    if album_id == ALL_ALBUM_ID {
        None
    } else {
        Some(album_id.to_string())
    }
}
