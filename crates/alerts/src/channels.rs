//! Monitored channel list.
//!
//! One entry per line: `@name`, `https://t.me/name`, a bare `name`, or a
//! numeric chat id. Blank lines and `#` comments are ignored.

use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// A channel reference from the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Public username, stored without the leading `@`.
    Username(String),
    /// Numeric chat id, e.g. `-1001234567890`.
    Id(i64),
}

impl ChannelRef {
    /// Parse one line. Returns `None` for blanks, comments and invite links.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if let Ok(id) = line.parse::<i64>() {
            return Some(Self::Id(id));
        }

        if line.starts_with("http://") || line.starts_with("https://") || line.starts_with("t.me/")
        {
            return Self::from_link(line);
        }

        let name = line.strip_prefix('@').unwrap_or(line);
        (!name.is_empty()).then(|| Self::Username(name.to_string()))
    }

    fn from_link(link: &str) -> Option<Self> {
        let rest = link
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let mut segments = rest.split('/').filter(|s| !s.is_empty()).skip(1);

        let mut name = segments.next()?;
        // Web preview links: t.me/s/<name>
        if name == "s" {
            name = segments.next()?;
        }
        if name.starts_with('+') || name == "joinchat" {
            return None;
        }
        let name = name.split(['?', '#']).next().unwrap_or(name);
        (!name.is_empty()).then(|| Self::Username(name.to_string()))
    }

    /// Whether two entries name the same channel. Usernames ignore case.
    pub fn is_same_channel(&self, other: &ChannelRef) -> bool {
        match (self, other) {
            (Self::Id(a), Self::Id(b)) => a == b,
            (Self::Username(a), Self::Username(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    /// Whether this entry refers to the given chat.
    pub fn matches(&self, chat_id: i64, username: Option<&str>) -> bool {
        match self {
            Self::Id(id) => *id == chat_id,
            Self::Username(name) => username.is_some_and(|u| u.eq_ignore_ascii_case(name)),
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(name) => write!(f, "@{name}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Channels the bot listens to. Empty means every channel.
#[derive(Debug, Clone, Default)]
pub struct MonitoredChannels {
    entries: Vec<ChannelRef>,
}

impl MonitoredChannels {
    pub fn new(entries: Vec<ChannelRef>) -> Self {
        Self { entries }
    }

    /// Parse a channel list, skipping lines that are not channel references.
    pub fn parse(content: &str) -> Self {
        let mut entries: Vec<ChannelRef> = Vec::new();
        for line in content.lines() {
            match ChannelRef::parse(line) {
                Some(entry) if !entries.iter().any(|e| e.is_same_channel(&entry)) => {
                    entries.push(entry)
                }
                Some(_) => {}
                None => {
                    let line = line.trim();
                    if !line.is_empty() && !line.starts_with('#') {
                        warn!(line, "Unsupported channel entry, ignoring");
                    }
                }
            }
        }
        Self { entries }
    }

    /// Load the list from a file. A missing or unreadable file yields an empty list.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let channels = Self::parse(&content);
                info!(
                    path = %path.display(),
                    count = channels.len(),
                    "Loaded channel list"
                );
                channels
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Channel list not readable, monitoring all channels"
                );
                Self::default()
            }
        }
    }

    /// Whether posts from this chat should be processed.
    pub fn allows(&self, chat_id: i64, username: Option<&str>) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|e| e.matches(chat_id, username))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelRef> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_entry_forms() {
        assert_eq!(
            ChannelRef::parse("@deals_ksa"),
            Some(ChannelRef::Username("deals_ksa".into()))
        );
        assert_eq!(
            ChannelRef::parse("https://t.me/deals_ksa"),
            Some(ChannelRef::Username("deals_ksa".into()))
        );
        assert_eq!(
            ChannelRef::parse("https://t.me/s/deals_ksa?before=10"),
            Some(ChannelRef::Username("deals_ksa".into()))
        );
        assert_eq!(
            ChannelRef::parse("  deals_ksa  "),
            Some(ChannelRef::Username("deals_ksa".into()))
        );
        assert_eq!(
            ChannelRef::parse("-1001234567890"),
            Some(ChannelRef::Id(-1001234567890))
        );
        assert_eq!(ChannelRef::parse("# comment"), None);
        assert_eq!(ChannelRef::parse("   "), None);
        assert_eq!(ChannelRef::parse("https://t.me/+AbCdEf"), None);
    }

    #[test]
    fn test_list_parsing_and_matching() {
        let channels = MonitoredChannels::parse(
            "# deals\n@Deals_KSA\n\nhttps://t.me/joinchat/xyz\n-100777\n@deals_ksa\n",
        );
        assert_eq!(channels.len(), 2);
        assert_eq!(
            channels.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["@Deals_KSA", "-100777"]
        );

        assert!(channels.allows(-1, Some("deals_ksa")));
        assert!(channels.allows(-100777, None));
        assert!(!channels.allows(-5, Some("other")));
        assert!(!channels.allows(-5, None));
    }

    #[test]
    fn test_duplicates_differ_only_in_case() {
        let channels = MonitoredChannels::parse("@DEALS\nhttps://t.me/deals\ndeals\n-1\n-1\n");
        assert_eq!(channels.len(), 2);
        assert!(ChannelRef::Username("Deals".into())
            .is_same_channel(&ChannelRef::Username("deals".into())));
        assert!(!ChannelRef::Id(1).is_same_channel(&ChannelRef::Username("1".into())));
    }

    #[test]
    fn test_empty_list_allows_everything() {
        let channels = MonitoredChannels::default();
        assert!(channels.is_empty());
        assert!(channels.allows(42, None));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let channels = MonitoredChannels::load(Path::new("/nonexistent/channels.txt"));
        assert!(channels.is_empty());
    }
}
