use serde::{Deserialize, Serialize};

/// Identifier and name of the synthetic album aggregating the whole index.
pub const ALL_ALBUM_ID: &str = "__ALL__";
pub const ALL_ALBUM_NAME: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediumKind {
    Image,
    Video,
}

impl MediumKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediumKind::Image => "image",
            MediumKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediumKind::Image),
            "video" => Some(MediumKind::Video),
            _ => None,
        }
    }
}

/// Canonical description of one photo or video, built fresh per response.
/// Timestamps are milliseconds since the epoch and stay `None` when the
/// index has no value for them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediumRecord {
    pub id: String,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub medium_type: MediumKind,
    pub mime_type: Option<String>,
    pub width: u32,
    pub height: u32,
    pub size: Option<u64>,
    /// EXIF-style orientation code, 0 when unknown.
    pub orientation: u8,
    /// Milliseconds, 0 for images.
    pub duration: i64,
    pub creation_date: Option<i64>,
    pub modified_date: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumRecord {
    pub id: String,
    pub name: String,
    pub count: usize,
}

/// One page of a media listing. `start` echoes the effective skip and
/// `total` is the size of the result set before slicing.
#[derive(Debug, Clone, Serialize)]
pub struct MediaPage {
    pub start: usize,
    pub total: usize,
    pub items: Vec<MediumRecord>,
}
