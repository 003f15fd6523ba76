//! Chat webhook delivery of a comic and its explanation.

use crate::analysis::Description;
use crate::comic::ComicRecord;
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned HTTP {0}")]
    Status(u16),
}

/// Embed payload: title linking to the comic page, one field per
/// description section, the comic image and a timestamp footer.
pub fn comic_embed(
    record: &ComicRecord,
    description: &Description,
    posted_at: DateTime<FixedOffset>,
) -> Value {
    let fields: Vec<Value> = description
        .iter()
        .map(|(label, text)| json!({ "name": label, "value": text, "inline": false }))
        .collect();

    json!({
        "title": record.title,
        "url": record.source_url,
        "fields": fields,
        "image": { "url": record.image_url },
        "footer": {
            "text": format!("Posted on {}", posted_at.format("%Y/%m/%d %H:%M:%S")),
        },
    })
}

/// Posts embeds to chat webhooks.
#[derive(Clone, Default)]
pub struct WebhookPoster {
    client: reqwest::Client,
}

impl WebhookPoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn post(
        &self,
        webhook_url: &str,
        record: &ComicRecord,
        description: &Description,
        posted_at: DateTime<FixedOffset>,
    ) -> Result<(), PostError> {
        let payload = json!({
            "username": record.source_name(),
            "embeds": [comic_embed(record, description, posted_at)],
        });

        let response = self.client.post(webhook_url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(PostError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
