use super::types::{MediumKind, MediumRecord};
use crate::index::MediaRow;

/// Maps a platform rotation in degrees to the EXIF-style orientation code
/// used on the wire. Anything outside the known table is reported as 0
/// (unknown).
pub(crate) fn orientation_code(degrees: i64) -> u8 {
    match degrees {
        0 => 1,
        90 => 8,
        180 => 3,
        270 => 6,
        _ => 0,
    }
}

/// Pure transform from a raw index row to the canonical record. The light
/// projection drops filename, title, mime type and size; absent
/// timestamps stay `None` rather than becoming zero.
pub(crate) fn normalize(row: &MediaRow, light: bool) -> MediumRecord {
    MediumRecord {
        id: row.id.clone(),
        filename: if light { None } else { row.filename.clone() },
        title: if light { None } else { row.title.clone() },
        medium_type: row.kind,
        mime_type: if light { None } else { row.mime_type.clone() },
        width: row.width,
        height: row.height,
        size: if light { None } else { row.size_bytes },
        orientation: match row.kind {
            MediumKind::Image => orientation_code(row.orientation_degrees),
            MediumKind::Video => 0,
        },
        duration: row.duration_ms,
        creation_date: row.date_added.map(|seconds| seconds * 1000),
        modified_date: row.date_modified.map(|seconds| seconds * 1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_row() -> MediaRow {
        MediaRow {
            id: "42".to_string(),
            kind: MediumKind::Image,
            filename: Some("IMG_0042.jpg".to_string()),
            title: Some("IMG_0042".to_string()),
            mime_type: Some("image/jpeg".to_string()),
            width: 4032,
            height: 3024,
            size_bytes: Some(2_500_000),
            orientation_degrees: 90,
            duration_ms: 0,
            date_added: Some(1_600_000_000),
            date_modified: None,
        }
    }

    #[test]
    fn orientation_table_is_exhaustive_and_exact() {
        assert_eq!(orientation_code(0), 1);
        assert_eq!(orientation_code(90), 8);
        assert_eq!(orientation_code(180), 3);
        assert_eq!(orientation_code(270), 6);

        for odd in [-90, 45, 135, 360, 1] {
            assert_eq!(orientation_code(odd), 0);
        }
    }

    #[test]
    fn timestamps_scale_to_milliseconds_and_keep_nulls() {
        let record = normalize(&image_row(), false);
        assert_eq!(record.creation_date, Some(1_600_000_000_000));
        assert_eq!(record.modified_date, None);
    }

    #[test]
    fn light_projection_drops_descriptive_fields() {
        let record = normalize(&image_row(), true);
        assert_eq!(record.filename, None);
        assert_eq!(record.title, None);
        assert_eq!(record.mime_type, None);
        assert_eq!(record.size, None);
        // Dimensions and dates survive the projection.
        assert_eq!(record.width, 4032);
        assert_eq!(record.creation_date, Some(1_600_000_000_000));
    }

    #[test]
    fn video_rows_report_unknown_orientation() {
        let mut row = image_row();
        row.kind = MediumKind::Video;
        row.duration_ms = 12_000;
        let record = normalize(&row, false);
        assert_eq!(record.orientation, 0);
        assert_eq!(record.duration, 12_000);
    }
}
