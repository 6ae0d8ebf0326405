//! Gallery assembly: resolving serving URLs and laying uploads out in rows

use futures::future::join_all;
use tracing::error;
use upload_storage::user_upload::UserUpload;

use crate::media_storage::ImageService;
use crate::types::RequestContext;

/// Number of uploads per gallery row
pub const ROW_LENGTH: usize = 3;

/// An upload paired with the URL its image is served from.
///
/// Built fresh for every gallery render. `url` is `None` when the serving URL
/// could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    /// The stored record
    pub upload: UserUpload,
    /// Time-limited URL of the image
    pub url: Option<String>,
}

/// Resolves a serving URL for every upload, keeping the input order.
///
/// A failed resolution is logged and yields an item without a URL.
pub async fn resolve_display_items(
    ctx: &RequestContext,
    images: &dyn ImageService,
    uploads: Vec<UserUpload>,
) -> Vec<DisplayItem> {
    let urls = join_all(
        uploads
            .iter()
            .map(|upload| ctx.within(images.serving_url(&upload.blob_key))),
    )
    .await;

    uploads
        .into_iter()
        .zip(urls)
        .map(|(upload, url)| {
            let url = match url {
                Ok(presigned) => Some(presigned.url),
                Err(err) => {
                    error!(blob_key = %upload.blob_key, %err, "Failed to obtain serving URL");
                    None
                }
            };
            DisplayItem { upload, url }
        })
        .collect()
}

/// Splits `items` into consecutive rows of `ROW_LENGTH`; only the last row may be shorter.
pub fn group_into_rows<T>(items: impl IntoIterator<Item = T>) -> Vec<Vec<T>> {
    let mut rows = Vec::new();
    let mut row = Vec::with_capacity(ROW_LENGTH);

    for item in items {
        row.push(item);
        if row.len() == ROW_LENGTH {
            rows.push(std::mem::replace(&mut row, Vec::with_capacity(ROW_LENGTH)));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_sizes() {
        for n in 0..=10_usize {
            let rows = group_into_rows(0..n);

            assert_eq!(rows.len(), n.div_ceil(ROW_LENGTH), "n = {n}");
            if let Some((last, full)) = rows.split_last() {
                assert!(full.iter().all(|row| row.len() == ROW_LENGTH), "n = {n}");
                let expected_last = if n % ROW_LENGTH == 0 { ROW_LENGTH } else { n % ROW_LENGTH };
                assert_eq!(last.len(), expected_last, "n = {n}");
            }
        }
    }

    #[test]
    fn test_group_keeps_order() {
        let rows = group_into_rows(["a", "b", "c", "d", "e"]);
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["d", "e"]]);
    }

    #[test]
    fn test_group_empty() {
        assert!(group_into_rows(Vec::<u8>::new()).is_empty());
    }
}
