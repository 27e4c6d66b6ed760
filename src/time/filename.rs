//! Timestamp filename format
//!
//! Renders capture times into file stems and recognises stems that are
//! already in the configured format.

use crate::error::Error;
use chrono::format::{self, Item, Parsed, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;
use tracing::trace;

/// Trailing collision suffix such as `-1` or `-27`
static COLLISION_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn collision_suffix() -> &'static Regex {
    COLLISION_SUFFIX.get_or_init(|| Regex::new(r"^(.+)-(\d+)$").expect("valid regex"))
}

/// A validated strftime pattern for file stems
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
}

impl TimestampFormat {
    /// Validate a strftime pattern
    ///
    /// Rejects unknown specifiers, patterns that render to nothing and
    /// patterns whose output contains a path separator (`%D` for example).
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidInput(format!(
                "invalid timestamp format '{pattern}'"
            )));
        }

        let sample = NaiveDate::from_ymd_opt(2001, 2, 3)
            .and_then(|d| d.and_hms_opt(4, 5, 6))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| Error::InvalidInput("sample timestamp out of range".into()))?;

        let mut rendered = String::new();
        write!(rendered, "{}", sample.format(pattern)).map_err(|_| {
            Error::InvalidInput(format!("timestamp format '{pattern}' cannot be rendered"))
        })?;

        if rendered.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "timestamp format '{pattern}' renders an empty name"
            )));
        }
        if rendered.contains(std::path::is_separator) {
            return Err(Error::InvalidInput(format!(
                "timestamp format '{pattern}' renders a path separator ('{rendered}')"
            )));
        }

        Ok(Self {
            pattern: pattern.to_string(),
        })
    }

    /// Render a timestamp as a file stem
    pub fn render(&self, timestamp: &DateTime<Local>) -> String {
        timestamp.format(&self.pattern).to_string()
    }

    /// Check whether a file stem is already in this format
    ///
    /// A stem carrying a collision suffix (`<formatted>-N`) counts as
    /// formatted, so renamed collisions stay put on the next run.
    pub fn matches_stem(&self, stem: &str) -> bool {
        if self.parses(stem) {
            return true;
        }

        match collision_suffix().captures(stem) {
            Some(caps) => {
                let base = caps.get(1).map_or("", |m| m.as_str());
                let matched = self.parses(base);
                if matched {
                    trace!(stem, "Matched format with collision suffix");
                }
                matched
            }
            None => false,
        }
    }

    /// Syntactic match only: formats without a full date or time (`%Y-%m`,
    /// `%H.%M.%S`) still recognise their own output.
    fn parses(&self, s: &str) -> bool {
        format::parse(&mut Parsed::new(), s, StrftimeItems::new(&self.pattern)).is_ok()
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            pattern: crate::config::DEFAULT_FORMAT.to_string(),
        }
    }
}
