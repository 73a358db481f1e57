//! The compiled outbound message.
//!
//! Every reply the bot sends is normalized into a [`MessageSpec`] before it is
//! handed to the gateway: an optional plain-text body, optional rich content
//! (title, description, color, footer, ...) and an optional self-delete timer.
//!
//! # Wire shape
//!
//! The structured document form is a JSON object. The reserved key
//! [`PLAIN_TEXT_KEY`] carries the body; every other key belongs to the rich
//! content, except [`THUMBNAIL_KEY`] which is never sent.
//!
//! ```text
//! {"plainText": "hi", "title": "Weather", "color": 5}
//!  └── body ─────┘    └── rich content ────────────┘
//! ```

use std::time::Duration;

use serde_json::{Map, Value};

/// Reserved document key holding the plain-text body.
pub const PLAIN_TEXT_KEY: &str = "plainText";

/// Rich-content key that is always stripped before sending.
pub const THUMBNAIL_KEY: &str = "thumbnail";

/// Rendering keys passed verbatim to the remote renderer.
pub type RichContent = Map<String, Value>;

/// A normalized outbound message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageSpec {
    /// Plain-text body.
    pub body: Option<String>,
    /// Structured rendering instructions. Never contains [`THUMBNAIL_KEY`].
    pub rich_content: Option<RichContent>,
    /// Delete the sent message after this long.
    pub delete_after: Option<Duration>,
}

impl MessageSpec {
    /// Creates a plain-text message.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }

    /// Sets the self-delete timer.
    pub fn with_delete_after(mut self, delete_after: Option<Duration>) -> Self {
        self.delete_after = delete_after;
        self
    }

    /// Returns `true` when there is neither a body nor rich content.
    ///
    /// Gateways receive such messages as-is; whether they reject them is up
    /// to the remote end.
    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.rich_content.is_none()
    }

    /// Renders the message back into its structured document form.
    pub fn to_document(&self) -> Value {
        let mut doc = self.rich_content.clone().unwrap_or_default();
        if let Some(body) = &self.body {
            doc.insert(PLAIN_TEXT_KEY.to_string(), Value::String(body.clone()));
        }
        Value::Object(doc)
    }
}
