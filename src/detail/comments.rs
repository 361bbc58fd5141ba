//! Market discussion thread.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A comment under a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment id.
    pub id: u64,
    /// Author handle.
    pub username: String,
    /// Author avatar glyph.
    pub avatar: String,
    /// Author position, e.g. `"768 Curtis Sliwa"`. Empty for non-holders.
    pub holdings: String,
    /// Relative age as displayed.
    pub time_ago: String,
    /// Comment body.
    pub content: String,
    /// Like count.
    pub likes: u32,
}

impl Comment {
    /// Create a comment.
    pub fn new(
        id: u64,
        username: impl Into<String>,
        avatar: impl Into<String>,
        holdings: impl Into<String>,
        time_ago: impl Into<String>,
        content: impl Into<String>,
        likes: u32,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            avatar: avatar.into(),
            holdings: holdings.into(),
            time_ago: time_ago.into(),
            content: content.into(),
            likes,
        }
    }

    /// Whether the author holds a position in the market.
    pub fn is_holder(&self) -> bool {
        !self.holdings.trim().is_empty()
    }
}

/// Comment ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum CommentSort {
    /// Thread order, newest first.
    #[default]
    Newest,
    /// Reverse thread order.
    Oldest,
    /// Most likes first; ties keep thread order.
    #[serde(rename = "Most Liked")]
    #[strum(serialize = "Most Liked")]
    MostLiked,
}

/// How a thread is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentView {
    /// Ordering.
    pub sort: CommentSort,
    /// Hide comments from authors without a position.
    pub holders_only: bool,
}

impl Default for CommentView {
    fn default() -> Self {
        Self {
            sort: CommentSort::Newest,
            holders_only: true,
        }
    }
}

impl CommentView {
    /// Apply the view to a thread stored newest first.
    pub fn apply<'a>(&self, thread: &'a [Comment]) -> Vec<&'a Comment> {
        let mut comments: Vec<&Comment> = thread
            .iter()
            .filter(|c| !self.holders_only || c.is_holder())
            .collect();

        match self.sort {
            CommentSort::Newest => {}
            CommentSort::Oldest => comments.reverse(),
            CommentSort::MostLiked => comments.sort_by(|a, b| b.likes.cmp(&a.likes)),
        }
        comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn thread() -> Vec<Comment> {
        vec![
            Comment::new(1, "a", "🙂", "10 Yes", "1m ago", "first", 2),
            Comment::new(2, "b", "🙂", "", "2m ago", "lurker", 9),
            Comment::new(3, "c", "🙂", "5 No", "3m ago", "third", 2),
            Comment::new(4, "d", "🙂", "1 Yes", "4m ago", "fourth", 7),
        ]
    }

    fn ids(comments: &[&Comment]) -> Vec<u64> {
        comments.iter().map(|c| c.id).collect()
    }

    #[test]
    fn default_view_is_newest_holders_only() {
        let thread = thread();
        let view = CommentView::default();
        assert_eq!(view.sort, CommentSort::Newest);
        assert_eq!(ids(&view.apply(&thread)), vec![1, 3, 4]);
    }

    #[test]
    fn oldest_reverses_thread_order() {
        let thread = thread();
        let view = CommentView {
            sort: CommentSort::Oldest,
            holders_only: false,
        };
        assert_eq!(ids(&view.apply(&thread)), vec![4, 3, 2, 1]);
    }

    #[test]
    fn most_liked_is_stable_on_ties() {
        let thread = thread();
        let view = CommentView {
            sort: CommentSort::MostLiked,
            holders_only: false,
        };
        assert_eq!(ids(&view.apply(&thread)), vec![2, 4, 1, 3]);
    }

    #[test]
    fn sort_names_match_the_selector_labels() {
        assert_eq!(CommentSort::from_str("Most Liked").unwrap(), CommentSort::MostLiked);
        assert_eq!(CommentSort::Oldest.to_string(), "Oldest");
        assert!(CommentSort::from_str("Hottest").is_err());

        let labels: Vec<String> = CommentSort::iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, vec!["Newest", "Oldest", "Most Liked"]);
    }

    #[test]
    fn comments_serialize_camel_case() {
        let json = serde_json::to_value(&thread()[0]).unwrap();
        assert_eq!(json["timeAgo"], "1m ago");
        assert_eq!(json["holdings"], "10 Yes");
    }
}
