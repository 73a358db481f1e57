//! Outbound message compilation.
//!
//! A raw message may be a plain string, a JSON document (`plainText` plus
//! rich-content keys) or either of those with placeholder tokens. The
//! [`MessageCompiler`] reduces all three to a [`MessageSpec`]:
//!
//! ```text
//! raw text ──► placeholders (optional) ──► parse_structured ──┬─► Mapping ──► body + rich content
//!                                                              └─► NotStructured ──► body only
//! ```
//!
//! Compilation never fails on malformed documents; they are sent as text.
//! The only failure is a destination that the actor's server cannot reach.

use std::sync::Arc;

use aoi_core::{Actor, ChannelId, Location, MessageSpec, PLAIN_TEXT_KEY, THUMBNAIL_KEY};
use serde_json::{Map, Value};

use crate::error::{FrameworkError, FrameworkResult};
use crate::placeholder::{PlaceholderContext, Placeholders};

/// Rich content is only produced when at least this many keys remain after
/// the body is taken out.
pub const MIN_RICH_CONTENT_KEYS: usize = 2;

/// Outcome of [`parse_structured`].
#[derive(Debug, Clone, PartialEq)]
pub enum Structured {
    /// The text is a JSON object.
    Mapping(Map<String, Value>),
    /// The text is not JSON, or is JSON but not an object.
    NotStructured,
}

/// Parses `text` as a structured document.
pub fn parse_structured(text: &str) -> Structured {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Structured::Mapping(map),
        _ => Structured::NotStructured,
    }
}

/// Compiles already-substituted text into a [`MessageSpec`].
pub fn compile(text: &str) -> MessageSpec {
    let mut doc = match parse_structured(text) {
        Structured::Mapping(doc) => doc,
        Structured::NotStructured => return MessageSpec::text(text),
    };

    let body = doc.remove(PLAIN_TEXT_KEY).and_then(into_body);

    // A lone leftover key (e.g. `{"color": 5}`) is dropped rather than sent
    // as rich content.
    let rich_content = if doc.len() < MIN_RICH_CONTENT_KEYS {
        None
    } else {
        doc.remove(THUMBNAIL_KEY);
        Some(doc)
    };

    MessageSpec {
        body,
        rich_content,
        delete_after: None,
    }
}

fn into_body(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Compiles raw messages, substituting placeholders when a member is given.
#[derive(Debug, Clone)]
pub struct MessageCompiler {
    placeholders: Arc<Placeholders>,
}

impl MessageCompiler {
    /// Creates a compiler over the given placeholder table.
    pub fn new(placeholders: Arc<Placeholders>) -> Self {
        Self { placeholders }
    }

    /// Returns the placeholder table.
    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    /// Compiles `raw` without placeholder substitution.
    pub fn compile(&self, raw: &str) -> MessageSpec {
        compile(raw)
    }

    /// Substitutes placeholders for `actor` in `location`, checks that
    /// `channel` belongs to `location`, then compiles.
    pub fn compile_for(
        &self,
        raw: &str,
        actor: &Actor,
        location: &Location,
        channel: ChannelId,
    ) -> FrameworkResult<MessageSpec> {
        let text = self
            .placeholders
            .replace(&PlaceholderContext::member(actor, location), raw);

        if !location.has_channel(channel) {
            return Err(FrameworkError::DestinationUnavailable { channel });
        }

        Ok(compile(&text))
    }
}

impl Default for MessageCompiler {
    fn default() -> Self {
        Self::new(Arc::new(Placeholders::standard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text() {
        let spec = compile("hello");
        assert_eq!(spec.body.as_deref(), Some("hello"));
        assert!(spec.rich_content.is_none());
    }

    #[test]
    fn test_body_with_rich_content_drops_thumbnail() {
        let spec = compile(r#"{"plainText":"hi","color":5,"thumbnail":"x"}"#);
        assert_eq!(spec.body.as_deref(), Some("hi"));

        let rich = spec.rich_content.unwrap();
        assert_eq!(Value::Object(rich), json!({"color": 5}));
    }

    #[test]
    fn test_single_key_yields_empty_message() {
        let spec = compile(r#"{"color":5}"#);
        assert!(spec.body.is_none());
        assert!(spec.rich_content.is_none());
        assert!(spec.is_empty());
    }

    #[test]
    fn test_thumbnail_never_survives() {
        let inputs = [
            r#"{"thumbnail":"x","title":"t"}"#,
            r#"{"thumbnail":{"url":"x"},"title":"t","description":"d"}"#,
            r#"{"plainText":"p","thumbnail":"x","title":"t","color":1}"#,
        ];
        for input in inputs {
            let spec = compile(input);
            if let Some(rich) = spec.rich_content {
                assert!(!rich.contains_key(THUMBNAIL_KEY), "{input}");
            }
        }
    }

    #[test]
    fn test_malformed_documents_fall_back_to_text() {
        let inputs = [
            r#"{"plainText": "unterminated"#,
            "{not json}",
            "[1, 2, 3]",
            "42",
            r#""quoted""#,
            "",
        ];
        for input in inputs {
            let spec = compile(input);
            assert_eq!(spec.body.as_deref(), Some(input));
            assert!(spec.rich_content.is_none());
        }
    }

    #[test]
    fn test_body_only_document() {
        let spec = compile(r#"{"plainText":"just text"}"#);
        assert_eq!(spec.body.as_deref(), Some("just text"));
        assert!(spec.rich_content.is_none());
    }

    #[test]
    fn test_rich_content_without_body() {
        let spec = compile(r#"{"title":"Weather","description":"Sunny"}"#);
        assert!(spec.body.is_none());
        assert_eq!(
            Value::Object(spec.rich_content.unwrap()),
            json!({"title": "Weather", "description": "Sunny"})
        );
    }

    #[test]
    fn test_non_string_body_is_stringified() {
        assert_eq!(compile(r#"{"plainText":7}"#).body.as_deref(), Some("7"));
        assert!(compile(r#"{"plainText":null}"#).body.is_none());
    }

    #[test]
    fn test_parse_structured() {
        assert!(matches!(parse_structured("{}"), Structured::Mapping(m) if m.is_empty()));
        assert_eq!(parse_structured("[]"), Structured::NotStructured);
        assert_eq!(parse_structured("nope"), Structured::NotStructured);
    }

    #[test]
    fn test_compile_for_substitutes_before_parsing() {
        let compiler = MessageCompiler::default();
        let actor = Actor::new(5, "Aoi", "0001");
        let location = Location::new(1, "Guild").with_channel(10);

        let spec = compiler
            .compile_for(
                r#"{"plainText":"hi &user_mention;","title":"&guild_name;","color":3}"#,
                &actor,
                &location,
                10,
            )
            .unwrap();

        assert_eq!(spec.body.as_deref(), Some("hi <@5>"));
        assert_eq!(
            Value::Object(spec.rich_content.unwrap()),
            json!({"title": "Guild", "color": 3})
        );
    }

    #[test]
    fn test_compile_for_rejects_foreign_channel() {
        let compiler = MessageCompiler::default();
        let actor = Actor::new(5, "Aoi", "0001");
        let location = Location::new(1, "Guild").with_channel(10);

        let err = compiler
            .compile_for("hello", &actor, &location, 11)
            .unwrap_err();
        assert!(matches!(
            err,
            FrameworkError::DestinationUnavailable { channel: 11 }
        ));
    }
}
