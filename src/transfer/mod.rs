//! Byte movement in and out of the root: batch uploads, single-file
//! downloads and streamed zip export of whole subtrees.

mod archive;
mod download;
mod upload;

pub use archive::get_download_zip;
pub use download::get_download;
pub use upload::{UPLOAD_BODY_LIMIT, post_upload};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct FileParam {
    #[serde(default)]
    pub file: String,
}

/// `Content-Disposition` for a browser "save as", with an ASCII fallback
/// name and the exact UTF-8 name in `filename*`.
pub(crate) fn attachment_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = percent_encoding::utf8_percent_encode(name, percent_encoding::NON_ALPHANUMERIC);
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}
