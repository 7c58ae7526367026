//! Background workers for network fetches that must not block the UI.

use std::sync::mpsc::Sender;
use std::time::Duration;

use futures::future::{AbortRegistration, Abortable};

use crate::types::ImageFetchResult;

/// Fetch a remote image for the preview pane in a background thread.
///
/// Runs its own small runtime so the UI thread never blocks; removing the
/// image (or loading a different URL) aborts the fetch via `abort_reg`.
pub fn run_image_fetch(url: String, tx: Sender<ImageFetchResult>, abort_reg: AbortRegistration) {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = tx.send(ImageFetchResult {
                url,
                result: Err(format!("Failed to start async runtime: {e}")),
            });
            return;
        }
    };

    let fetch = async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("server returned {}", response.status());
        }
        // Some hosts omit the content type; in that case the image decoder
        // gets the final say.
        let is_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("image/"))
            .unwrap_or(true);
        if !is_image {
            anyhow::bail!("URL does not point at an image");
        }
        let bytes = response.bytes().await?.to_vec();
        Ok::<Vec<u8>, anyhow::Error>(bytes)
    };

    let result = rt.block_on(Abortable::new(fetch, abort_reg));

    let outcome = match result {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(e.to_string()),
        // Aborted: the caller already moved on, nothing to report.
        Err(_aborted) => return,
    };
    let _ = tx.send(ImageFetchResult {
        url,
        result: outcome,
    });
}
