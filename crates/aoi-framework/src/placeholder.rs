//! Placeholder substitution for user-authored message templates.
//!
//! Server admins write welcome messages, auto-replies and similar templates
//! containing tokens such as `&user_mention;` or `&guild_name;`. At send time
//! [`Placeholders::replace`] swaps each recognized token for its value.
//!
//! # Single-pass matching
//!
//! All tokens are compiled into one alternation pattern when the table is
//! built. Every match is replaced exactly once and the replacement text is
//! never scanned again, so a value that itself looks like a token (a user
//! named `&guild_name;`) is emitted verbatim.
//!
//! ```rust,ignore
//! let placeholders = Placeholders::standard();
//! let ctx = PlaceholderContext::member(&actor, &location);
//! let text = placeholders.replace(&ctx, "Welcome &user_mention; to &guild_name;!");
//! ```

use std::collections::HashMap;

use aoi_core::{Actor, Location};
use regex::{Captures, Regex};

/// Opening delimiter of a token.
pub const TOKEN_PREFIX: char = '&';

/// Closing delimiter of a token.
pub const TOKEN_SUFFIX: char = ';';

/// The values a template can refer to.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderContext<'a> {
    /// The user the message is about.
    pub actor: &'a Actor,
    /// The server the message is sent in, if known.
    pub location: Option<&'a Location>,
}

impl<'a> PlaceholderContext<'a> {
    /// Context with only an actor. Location tokens stay unresolved.
    pub fn actor(actor: &'a Actor) -> Self {
        Self {
            actor,
            location: None,
        }
    }

    /// Context with an actor inside a location.
    pub fn member(actor: &'a Actor, location: &'a Location) -> Self {
        Self {
            actor,
            location: Some(location),
        }
    }
}

/// Resolves one token. `None` leaves the token in the text untouched.
pub type ResolverFn = fn(&PlaceholderContext<'_>) -> Option<String>;

fn user_name(ctx: &PlaceholderContext<'_>) -> Option<String> {
    Some(ctx.actor.name.clone())
}

fn user_discrim(ctx: &PlaceholderContext<'_>) -> Option<String> {
    Some(ctx.actor.discriminator.clone())
}

fn user_mention(ctx: &PlaceholderContext<'_>) -> Option<String> {
    Some(ctx.actor.mention())
}

fn user_avatar(ctx: &PlaceholderContext<'_>) -> Option<String> {
    Some(ctx.actor.avatar_url.clone())
}

fn guild_name(ctx: &PlaceholderContext<'_>) -> Option<String> {
    ctx.location.map(|l| l.name.clone())
}

fn guild_icon(ctx: &PlaceholderContext<'_>) -> Option<String> {
    ctx.location.map(|l| l.icon_url.clone())
}

/// The built-in token table, in the order it is advertised.
pub const STANDARD_PLACEHOLDERS: &[(&str, ResolverFn)] = &[
    ("user_name", user_name),
    ("user_discrim", user_discrim),
    ("user_mention", user_mention),
    ("user_avatar", user_avatar),
    ("guild_name", guild_name),
    ("guild_icon", guild_icon),
];

struct Entry {
    name: &'static str,
    resolve: ResolverFn,
}

/// A compiled, immutable placeholder table.
pub struct Placeholders {
    entries: Vec<Entry>,
    by_token: HashMap<String, usize>,
    pattern: Option<Regex>,
}

impl Placeholders {
    /// Builds the table of [`STANDARD_PLACEHOLDERS`].
    pub fn standard() -> Self {
        Self::from_table(STANDARD_PLACEHOLDERS)
    }

    /// Builds a table from `(name, resolver)` pairs.
    ///
    /// Order is preserved for [`supported`](Self::supported); a repeated name
    /// keeps its first resolver.
    pub fn from_table(table: &[(&'static str, ResolverFn)]) -> Self {
        let mut entries = Vec::with_capacity(table.len());
        let mut by_token = HashMap::with_capacity(table.len());

        for &(name, resolve) in table {
            let token = format!("{TOKEN_PREFIX}{name}{TOKEN_SUFFIX}");
            if by_token.contains_key(&token) {
                continue;
            }
            by_token.insert(token, entries.len());
            entries.push(Entry { name, resolve });
        }

        // An empty alternation would match everywhere.
        let pattern = if entries.is_empty() {
            None
        } else {
            let alternation = entries
                .iter()
                .map(|e| regex::escape(&format!("{TOKEN_PREFIX}{}{TOKEN_SUFFIX}", e.name)))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation).expect("escaped literal alternation is a valid regex"))
        };

        Self {
            entries,
            by_token,
            pattern,
        }
    }

    /// Returns the supported token names (without delimiters), in table order.
    pub fn supported(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    /// Replaces every recognized token in `msg`.
    ///
    /// Unknown `&...;` sequences and tokens whose resolver has no value for
    /// `ctx` are left as they are.
    pub fn replace(&self, ctx: &PlaceholderContext<'_>, msg: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return msg.to_string();
        };

        pattern
            .replace_all(msg, |caps: &Captures<'_>| {
                let token = &caps[0];
                self.by_token
                    .get(token)
                    .and_then(|&i| (self.entries[i].resolve)(ctx))
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Placeholders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placeholders")
            .field("supported", &self.supported())
            .finish()
    }
}
