//! Streaming helper for walking `files.list` pages without manual loops.

use async_stream::try_stream;
use futures_util::Stream;
use reqwest::Method;

use super::client::DriveService;
use super::types::{DriveError, DriveFile, FileListResponse};

const PAGE_SIZE: u32 = 1000;
const LIST_FIELDS: &str = "nextPageToken,files(id,name)";

/// Stream every file matching `query`, following `nextPageToken` until exhausted.
pub fn stream_files<'a>(
    service: &'a DriveService,
    query: String,
) -> impl Stream<Item = Result<DriveFile, DriveError>> + 'a {
    try_stream! {
        let mut page_token: Option<String> = None;

        loop {
            let page_size = PAGE_SIZE.to_string();
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = service
                .request(Method::GET, "files")
                .query(&params)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let FileListResponse { files, next_page_token } = response.json().await?;
                tracing::trace!(files = files.len(), "Drive page received");
                for file in files {
                    yield file;
                }

                match next_page_token.filter(|token| !token.is_empty()) {
                    Some(next) => page_token = Some(next),
                    None => break,
                }
            } else {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = %status, "Failed to list Drive files");
                Err(DriveError::from_status(status, body))?;
            }
        }
    }
}
