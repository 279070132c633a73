//! Search, category and sort options shared by the note list and the community feed.

use serde::Deserialize;

use cin_common::types::{Note, NoteWithTrades};

/// Ordering applied to a note listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteSort {
    /// Most recently updated first
    #[default]
    Updated,
    /// Most recently created first
    Created,
    /// Most viewed first
    Views,
    /// Most liked first
    Likes,
    /// Likes, then views, then recency
    Trending,
}

impl NoteSort {
    /// SQL `ORDER BY` body for this sort, against a `notes` table aliased `n`.
    pub fn order_by_clause(self) -> &'static str {
        match self {
            NoteSort::Updated => "n.updated_at DESC, n.id",
            NoteSort::Created => "n.created_at DESC, n.id",
            NoteSort::Views => "n.views DESC, n.updated_at DESC, n.id",
            NoteSort::Likes => "n.likes DESC, n.updated_at DESC, n.id",
            NoteSort::Trending => "n.likes DESC, n.views DESC, n.updated_at DESC, n.id",
        }
    }

    fn compare(self, a: &Note, b: &Note) -> std::cmp::Ordering {
        match self {
            NoteSort::Updated => b.updated_at.cmp(&a.updated_at),
            NoteSort::Created => b.created_at.cmp(&a.created_at),
            NoteSort::Views => b
                .views
                .cmp(&a.views)
                .then_with(|| b.updated_at.cmp(&a.updated_at)),
            NoteSort::Likes => b
                .likes
                .cmp(&a.likes)
                .then_with(|| b.updated_at.cmp(&a.updated_at)),
            NoteSort::Trending => b
                .likes
                .cmp(&a.likes)
                .then_with(|| b.views.cmp(&a.views))
                .then_with(|| b.updated_at.cmp(&a.updated_at)),
        }
    }
}

/// Query-string filter for note listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    /// Case-insensitive substring matched against title, content and tags
    pub search: Option<String>,
    /// Exact category; `all` or empty disables the filter
    pub category: Option<String>,
    pub sort: Option<NoteSort>,
}

impl NoteFilter {
    /// Lower-cased search term, if one was given.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Category to filter on, if any.
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }

    pub fn matches(&self, note: &Note) -> bool {
        let matches_search = match self.search_term() {
            Some(term) => {
                note.title.to_lowercase().contains(&term)
                    || note.content.to_lowercase().contains(&term)
                    || note.tags.iter().any(|t| t.to_lowercase().contains(&term))
            }
            None => true,
        };

        let matches_category = match self.category_filter() {
            Some(category) => note.category == category,
            None => true,
        };

        matches_search && matches_category
    }

    /// Filter and sort an in-memory listing.
    pub fn apply(&self, notes: Vec<NoteWithTrades>, default_sort: NoteSort) -> Vec<NoteWithTrades> {
        let sort = self.sort.unwrap_or(default_sort);
        let mut kept: Vec<NoteWithTrades> = notes.into_iter().filter(|n| self.matches(&n.note)).collect();
        kept.sort_by(|a, b| sort.compare(&a.note, &b.note));
        kept
    }
}

/// Build an `ILIKE` pattern that matches `term` literally anywhere in a value.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
