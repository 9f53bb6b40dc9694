//! Local decoding of the selected file and of the restored payload.

use crate::error::RestoreError;
use crate::model::{Preview, Restoration, SelectedFile, Thumbnail};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Images larger than this on either side are downscaled for terminal rendering.
const THUMBNAIL_EDGE: u32 = 256;

fn thumbnail_of(img: &DynamicImage) -> Thumbnail {
    // `thumbnail` scales up as well, so small images are kept at native size.
    let small = if img.width() <= THUMBNAIL_EDGE && img.height() <= THUMBNAIL_EDGE {
        img.to_rgb8()
    } else {
        img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgb8()
    };
    Thumbnail {
        width: small.width(),
        height: small.height(),
        rgb: small.into_raw(),
    }
}

fn decode_error(path: &Path, reason: impl ToString) -> RestoreError {
    RestoreError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read `path` and decode it into a previewable image.
pub(crate) async fn load_selection(path: &Path) -> Result<(SelectedFile, Preview), RestoreError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| RestoreError::io(format!("read {}", path.display()), e))?;
    let bytes = Bytes::from(raw);

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let mime = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string();

    let decode_bytes = bytes.clone();
    let decode_path: PathBuf = path.to_path_buf();
    let img = tokio::task::spawn_blocking(move || image::load_from_memory(&decode_bytes))
        .await
        .map_err(|e| decode_error(&decode_path, e))?
        .map_err(|e| decode_error(&decode_path, e))?;

    let preview = Preview {
        file_name: file_name.clone(),
        data_uri: format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)),
        width: img.width(),
        height: img.height(),
        thumbnail: thumbnail_of(&img),
    };
    let file = SelectedFile {
        path: path.to_path_buf(),
        file_name,
        mime,
        bytes,
    };
    Ok((file, preview))
}

/// Decode the base64 JPEG returned by the service. An undecodable image still yields a
/// downloadable result, just without dimensions or thumbnail.
pub(crate) fn decode_restored(payload: String) -> Result<Restoration, RestoreError> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let jpeg = STANDARD
        .decode(compact.as_bytes())
        .map_err(RestoreError::InvalidPayload)?;

    let (dimensions, thumbnail) = match image::load_from_memory(&jpeg) {
        Ok(img) => (Some((img.width(), img.height())), Some(thumbnail_of(&img))),
        Err(e) => {
            tracing::warn!("restored payload is not a decodable image: {e}");
            (None, None)
        }
    };

    Ok(Restoration {
        payload: compact,
        jpeg: Bytes::from(jpeg),
        dimensions,
        thumbnail,
    })
}
