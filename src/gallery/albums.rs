use super::{ALL_ALBUM_ID, ALL_ALBUM_NAME, AlbumRecord, Gallery, GalleryError, MediumKind};
use crate::index::IndexError;
use std::collections::HashMap;
use tracing::{debug, warn};

impl Gallery {
    /// Enumerates albums for the requested medium kind, or for both kinds
    /// merged when no filter is given. The synthetic All album always
    /// comes first and carries the grand total.
    pub async fn list_albums(
        &self,
        kind: Option<MediumKind>,
        hide_if_empty: bool,
    ) -> Result<Vec<AlbumRecord>, GalleryError> {
        let kinds: &[MediumKind] = match kind {
            Some(MediumKind::Image) => &[MediumKind::Image],
            Some(MediumKind::Video) => &[MediumKind::Video],
            None => &[MediumKind::Image, MediumKind::Video],
        };

        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, AlbumRecord> = HashMap::new();
        let mut total = 0usize;

        for &enumerated in kinds {
            let entries = match self.index.buckets(enumerated).await {
                Ok(entries) => entries,
                Err(IndexError::Unavailable(reason)) => {
                    // Never fail the whole call: answer with the synthetic
                    // All album alone.
                    warn!("media index unavailable ({}), returning All only", reason);
                    return Ok(vec![AlbumRecord {
                        id: ALL_ALBUM_ID.to_string(),
                        name: ALL_ALBUM_NAME.to_string(),
                        count: 0,
                    }]);
                }
                Err(e) => return Err(e.into()),
            };

            for entry in entries {
                if entry.trashed {
                    continue;
                }
                let record = grouped.entry(entry.id.clone()).or_insert_with(|| {
                    order.push(entry.id.clone());
                    AlbumRecord {
                        id: entry.id,
                        name: entry.name,
                        count: 0,
                    }
                });
                if !entry.empty {
                    record.count += 1;
                    total += 1;
                }
            }
        }

        let mut albums = Vec::with_capacity(order.len() + 1);
        albums.push(AlbumRecord {
            id: ALL_ALBUM_ID.to_string(),
            name: ALL_ALBUM_NAME.to_string(),
            count: total,
        });
        for id in order {
            if let Some(album) = grouped.remove(&id)
                && (album.count > 0 || !hide_if_empty)
            {
                albums.push(album);
            }
        }

        debug!(
            albums = albums.len() - 1,
            total,
            kind = ?kind,
            "enumerated albums"
        );
        Ok(albums)
    }
}
