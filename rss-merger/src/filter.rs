use crate::types::FeedItem;
use std::fmt;

/// AND-combined, case-sensitive title substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Keywords(Vec<String>);

impl Keywords {
    /// Splits on any whitespace; blank tokens never make it in.
    pub fn parse(raw: &str) -> Self {
        Self::from_tokens(raw.split_whitespace())
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            tokens
                .into_iter()
                .map(Into::into)
                .filter(|token: &String| !token.trim().is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn matches(&self, title: &str) -> bool {
        self.0.iter().all(|token| title.contains(token.as_str()))
    }
}

impl From<&str> for Keywords {
    fn from(raw: &str) -> Self {
        Keywords::parse(raw)
    }
}

impl fmt::Display for Keywords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Keeps items whose title contains every keyword, in their original order.
pub fn filter_items(items: Vec<FeedItem>, keywords: &Keywords) -> Vec<FeedItem> {
    if keywords.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| keywords.matches(&item.title))
        .collect()
}
