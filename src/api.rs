// Method-call surface. Requests arrive as named methods with JSON
// arguments, run serialized through the gallery worker, and answer with
// either a JSON document or raw encoded bytes.
use crate::gallery::{DeleteOutcome, MediumKind, SharedGallery};
use crate::index::DeleteTicket;
use crate::worker::GalleryWorker;
use serde::Deserialize;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone)]
pub enum MethodReply {
    Json(Value),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct MethodError {
    pub code: String,
    pub message: String,
}

impl MethodError {
    fn bad_args(message: impl Into<String>) -> MethodError {
        MethodError {
            code: "badArguments".to_string(),
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> MethodError {
        MethodError {
            code: "notFound".to_string(),
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> MethodError {
        MethodError {
            code: "failed".to_string(),
            message: message.into(),
        }
    }

    fn not_implemented(method: &str) -> MethodError {
        MethodError {
            code: "notImplemented".to_string(),
            message: format!("unknown method {}", method),
        }
    }
}

pub struct MethodChannel {
    gallery: SharedGallery,
    worker: GalleryWorker,
}

impl MethodChannel {
    pub fn new(gallery: SharedGallery, worker: GalleryWorker) -> MethodChannel {
        MethodChannel { gallery, worker }
    }

    /// Dispatches one call. Argument validation happens up front on the
    /// caller's task; the gallery work itself runs on the worker queue.
    pub async fn handle(&self, call: MethodCall) -> Result<MethodReply, MethodError> {
        debug!("method call: {}", call.method);
        let gallery = Arc::clone(&self.gallery);
        let args = call.args;

        match call.method.as_str() {
            "listAlbums" => {
                let kind = opt_kind(&args)?;
                let hide_if_empty = bool_arg(&args, "hideIfEmpty", false)?;
                self.run(async move {
                    let albums = gallery
                        .list_albums(kind, hide_if_empty)
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?;
                    to_json(&albums)
                })
                .await
            }
            "listMedia" => {
                let album_id = str_arg(&args, "albumId")?;
                let kind = opt_kind(&args)?;
                let newest = bool_arg(&args, "newest", true)?;
                let skip = opt_usize(&args, "skip")?;
                let take = opt_usize(&args, "take")?;
                let light = bool_arg(&args, "lightWeight", false)?;
                self.run(async move {
                    let page = gallery
                        .list_media(&album_id, kind, newest, skip, take, light)
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?;
                    to_json(&page)
                })
                .await
            }
            "getMedium" => {
                let medium_id = str_arg(&args, "mediumId")?;
                let kind = opt_kind(&args)?;
                self.run(async move {
                    match gallery
                        .get_medium(&medium_id, kind)
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?
                    {
                        Some(record) => to_json(&record),
                        None => Err(MethodError::not_found(format!(
                            "no medium with id {}",
                            medium_id
                        ))),
                    }
                })
                .await
            }
            "getThumbnail" => {
                let medium_id = str_arg(&args, "mediumId")?;
                let kind = opt_kind(&args)?;
                let width = opt_u32(&args, "width")?;
                let height = opt_u32(&args, "height")?;
                let high_quality = bool_arg(&args, "highQuality", false)?;
                self.run(async move {
                    match gallery
                        .get_thumbnail(&medium_id, kind, width, height, high_quality)
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?
                    {
                        Some(bytes) => Ok(MethodReply::Bytes(bytes)),
                        None => Err(MethodError::not_found(format!(
                            "no thumbnail for medium {}",
                            medium_id
                        ))),
                    }
                })
                .await
            }
            "getAlbumThumbnail" => {
                let album_id = str_arg(&args, "albumId")?;
                let kind = opt_kind(&args)?;
                let newest = bool_arg(&args, "newest", true)?;
                let width = opt_u32(&args, "width")?;
                let height = opt_u32(&args, "height")?;
                let high_quality = bool_arg(&args, "highQuality", false)?;
                self.run(async move {
                    match gallery
                        .get_album_thumbnail(&album_id, kind, newest, width, height, high_quality)
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?
                    {
                        Some(bytes) => Ok(MethodReply::Bytes(bytes)),
                        None => Err(MethodError::not_found(format!(
                            "no thumbnail for album {}",
                            album_id
                        ))),
                    }
                })
                .await
            }
            "getFile" => {
                let medium_id = str_arg(&args, "mediumId")?;
                let kind = opt_kind(&args)?;
                let mime_type = opt_str(&args, "mimeType")?;
                self.run(async move {
                    let path = gallery
                        .get_file(&medium_id, kind, mime_type.as_deref())
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?;
                    Ok(MethodReply::Json(match path {
                        Some(path) => json!(path.to_string_lossy()),
                        None => Value::Null,
                    }))
                })
                .await
            }
            "deleteMedium" => {
                let medium_id = str_arg(&args, "mediumId")?;
                let kind = opt_kind(&args)?;
                self.run(async move {
                    match gallery
                        .delete_medium(&medium_id, kind)
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?
                    {
                        DeleteOutcome::NotFound => Err(MethodError::not_found(format!(
                            "no medium with id {}",
                            medium_id
                        ))),
                        outcome => to_json(&outcome),
                    }
                })
                .await
            }
            "confirmDelete" => {
                let ticket: DeleteTicket = serde_json::from_value(
                    args.get("ticket").cloned().unwrap_or(Value::Null),
                )
                .map_err(|e| MethodError::bad_args(format!("bad ticket: {}", e)))?;
                self.run(async move {
                    let done = gallery
                        .confirm_delete(ticket)
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?;
                    Ok(MethodReply::Json(json!(done)))
                })
                .await
            }
            "cleanCache" => {
                self.run(async move {
                    gallery
                        .clean_cache()
                        .await
                        .map_err(|e| MethodError::failed(e.to_string()))?;
                    Ok(MethodReply::Json(Value::Null))
                })
                .await
            }
            other => Err(MethodError::not_implemented(other)),
        }
    }

    async fn run<F>(&self, job: F) -> Result<MethodReply, MethodError>
    where
        F: Future<Output = Result<MethodReply, MethodError>> + Send + 'static,
    {
        self.worker
            .submit(job)
            .await
            .await
            .map_err(|_| MethodError::failed("gallery worker is gone"))?
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<MethodReply, MethodError> {
    serde_json::to_value(value)
        .map(MethodReply::Json)
        .map_err(|e| MethodError::failed(e.to_string()))
}

fn str_arg(args: &Value, name: &str) -> Result<String, MethodError> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(MethodError::bad_args(format!("{} must be a string", name))),
        None => Err(MethodError::bad_args(format!("missing argument {}", name))),
    }
}

fn opt_str(args: &Value, name: &str) -> Result<Option<String>, MethodError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MethodError::bad_args(format!("{} must be a string", name))),
    }
}

fn opt_kind(args: &Value) -> Result<Option<MediumKind>, MethodError> {
    match opt_str(args, "mediumType")? {
        None => Ok(None),
        Some(raw) => MediumKind::parse(&raw)
            .map(Some)
            .ok_or_else(|| MethodError::bad_args(format!("unknown medium type {}", raw))),
    }
}

fn bool_arg(args: &Value, name: &str, default: bool) -> Result<bool, MethodError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(MethodError::bad_args(format!("{} must be a bool", name))),
    }
}

fn opt_usize(args: &Value, name: &str) -> Result<Option<usize>, MethodError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| MethodError::bad_args(format!("{} must be a non-negative integer", name))),
    }
}

fn opt_u32(args: &Value, name: &str) -> Result<Option<u32>, MethodError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| MethodError::bad_args(format!("{} must be a u32", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_argument_is_rejected() {
        let err = str_arg(&json!({}), "albumId").unwrap_err();
        assert_eq!(err.code, "badArguments");
    }

    #[test]
    fn medium_type_parses_or_rejects() {
        assert_eq!(
            opt_kind(&json!({"mediumType": "image"})).unwrap(),
            Some(MediumKind::Image)
        );
        assert_eq!(opt_kind(&json!({})).unwrap(), None);
        assert_eq!(opt_kind(&json!({"mediumType": null})).unwrap(), None);
        assert!(opt_kind(&json!({"mediumType": "audio"})).is_err());
    }

    #[test]
    fn bools_default_when_absent() {
        assert!(bool_arg(&json!({}), "newest", true).unwrap());
        assert!(!bool_arg(&json!({"newest": false}), "newest", true).unwrap());
        assert!(bool_arg(&json!({"newest": 1}), "newest", true).is_err());
    }
}
