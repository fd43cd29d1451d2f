use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_DUPLICATES_MESSAGE: &str = "No duplicates found";
pub const RENDER_ERROR_MESSAGE: &str = "Error displaying results";

/// One matching post as returned by the duplicate-check backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPost {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub reddit_url: String,
    #[serde(default)]
    pub subreddit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("post {id} has an unreadable date {date:?}")]
    InvalidDate { id: String, date: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostCard {
    pub post_id: String,
    pub image_url: String,
    pub title: String,
    pub date_label: String,
    pub author_line: String,
    pub link: String,
    pub subreddit: Option<String>,
    pub original: bool,
}

impl PostCard {
    fn new(post: ResultPost, posted_at: DateTime<Utc>, original: bool) -> Self {
        Self {
            date_label: posted_at.format("%b %-d, %Y").to_string(),
            author_line: format!("Posted by u/{}", post.author),
            post_id: post.id,
            image_url: post.image_url,
            title: post.title,
            link: post.reddit_url,
            subreddit: post.subreddit,
            original,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    NoDuplicates,
    Found {
        original: PostCard,
        duplicates: Vec<PostCard>,
    },
}

impl ResultsView {
    /// Orders posts oldest first; the oldest is the original.
    pub fn build(posts: Vec<ResultPost>) -> Result<Self, RenderError> {
        let mut dated = posts
            .into_iter()
            .map(|post| {
                let at = parse_date(&post.date).ok_or_else(|| RenderError::InvalidDate {
                    id: post.id.clone(),
                    date: post.date.clone(),
                })?;
                Ok((at, post))
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        dated.sort_by_key(|(at, _)| *at);

        let mut cards = dated.into_iter();
        let Some((at, first)) = cards.next() else {
            return Ok(ResultsView::NoDuplicates);
        };
        Ok(ResultsView::Found {
            original: PostCard::new(first, at, true),
            duplicates: cards
                .map(|(at, post)| PostCard::new(post, at, false))
                .collect(),
        })
    }

    pub fn show_duplicates_section(&self) -> bool {
        matches!(self, ResultsView::Found { duplicates, .. } if !duplicates.is_empty())
    }

    pub fn cards(&self) -> Vec<&PostCard> {
        match self {
            ResultsView::NoDuplicates => Vec::new(),
            ResultsView::Found {
                original,
                duplicates,
            } => std::iter::once(original).chain(duplicates.iter()).collect(),
        }
    }
}

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, date: &str) -> ResultPost {
        ResultPost {
            id: id.into(),
            title: format!("title {id}"),
            date: date.into(),
            author: format!("user_{id}"),
            image_url: format!("https://i.redd.it/{id}.jpg"),
            reddit_url: format!("https://reddit.com/r/pics/comments/{id}/"),
            subreddit: Some("pics".into()),
        }
    }

    #[test]
    fn earliest_post_is_original() {
        let view = ResultsView::build(vec![
            post("c", "2024-01-03"),
            post("a", "2024-01-01"),
            post("b", "2024-01-02"),
        ])
        .unwrap();

        let ResultsView::Found {
            original,
            duplicates,
        } = &view
        else {
            panic!("expected results");
        };
        assert_eq!(original.post_id, "a");
        assert!(original.original);
        let ids: Vec<_> = duplicates.iter().map(|card| card.post_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(duplicates.iter().all(|card| !card.original));
        assert!(view.show_duplicates_section());
    }

    #[test]
    fn empty_list_has_no_cards() {
        let view = ResultsView::build(Vec::new()).unwrap();
        assert_eq!(view, ResultsView::NoDuplicates);
        assert!(view.cards().is_empty());
        assert!(!view.show_duplicates_section());
    }

    #[test]
    fn single_post_hides_duplicates_section() {
        let view = ResultsView::build(vec![post("a", "2024-01-01T10:00:00")]).unwrap();
        assert_eq!(view.cards().len(), 1);
        assert!(!view.show_duplicates_section());
    }

    #[test]
    fn card_fields() {
        let view = ResultsView::build(vec![post("a", "2024-03-05T08:30:00.123456")]).unwrap();
        let card = view.cards()[0].clone();
        assert_eq!(card.author_line, "Posted by u/user_a");
        assert_eq!(card.date_label, "Mar 5, 2024");
        assert_eq!(card.link, "https://reddit.com/r/pics/comments/a/");
    }

    #[test]
    fn mixed_date_formats_sort_together() {
        let view = ResultsView::build(vec![
            post("late", "2024-01-02T00:00:00+00:00"),
            post("early", "2024-01-01T23:00:00"),
        ])
        .unwrap();
        assert_eq!(view.cards()[0].post_id, "early");
    }

    #[test]
    fn unreadable_date_is_a_render_error() {
        let err = ResultsView::build(vec![post("a", "yesterday")]).unwrap_err();
        assert_eq!(
            err,
            RenderError::InvalidDate {
                id: "a".into(),
                date: "yesterday".into()
            }
        );
    }
}
