use chrono::{DateTime, Local};

use crate::avatar::{self, AvatarTag};
use crate::dedup::DedupStore;
use crate::linkify::{self, Segment};
use crate::post::Post;

/// One rendered table row.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub key: String,
    pub avatar_url: String,
    pub avatar: AvatarTag,
    pub author: String,
    pub message: Vec<Segment>,
    pub sent_at: String,
}

impl PostRow {
    fn from_post(post: &Post, key: String) -> Self {
        let sent_at: DateTime<Local> = post.sent_at().into();
        PostRow {
            key,
            avatar_url: avatar::identicon_url(&post.uid),
            avatar: avatar::terminal_tag(&post.uid),
            author: post.uid.clone(),
            message: linkify::linkify(&post.msg),
            sent_at: sent_at.format("%a %b %e %H:%M:%S %Y").to_string(),
        }
    }
}

/// Ordered list of rendered rows plus the seen-post map that keeps
/// re-ingesting an overlapping poll window idempotent.
#[derive(Debug, Default)]
pub struct FeedView {
    rows: Vec<PostRow>,
    seen: DedupStore,
    rejected: usize,
}

impl FeedView {
    pub fn new() -> Self {
        Self::with_store(DedupStore::new())
    }

    /// The store is passed in rather than ambient so ownership is explicit.
    pub fn with_store(seen: DedupStore) -> Self {
        Self {
            rows: Vec::new(),
            seen,
            rejected: 0,
        }
    }

    /// Running count of posts dropped because their reported hash id did
    /// not match their content.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn rows(&self) -> &[PostRow] {
        &self.rows
    }

    pub fn seen(&self) -> &DedupStore {
        &self.seen
    }

    /// Ingests a newest-first page, the order the server sends.
    pub fn ingest(&mut self, posts: &[Post]) -> usize {
        self.ingest_page(posts, true)
    }

    /// Walks the page oldest to newest and inserts each unseen post at the
    /// top, so the table stays newest-first and a post already shown is
    /// skipped. Returns the number of rows added.
    pub fn ingest_page(&mut self, posts: &[Post], newest_first: bool) -> usize {
        let mut added = 0;
        let ordered: Vec<&Post> = if newest_first {
            posts.iter().rev().collect()
        } else {
            posts.iter().collect()
        };
        for post in ordered {
            // the store applies the same check before accepting a post
            if !post.hashid_matches() {
                self.rejected += 1;
                continue;
            }
            let key = post.dedup_key();
            if self.seen.has(&key) {
                continue;
            }
            self.rows.insert(0, PostRow::from_post(post, key.clone()));
            self.seen.put(key, post.clone());
            added += 1;
        }
        added
    }

    /// Drops rows and the seen map. Used when a result set replaces the
    /// feed wholesale, e.g. search results.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.seen = DedupStore::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(postid: i64, msg: &str) -> Post {
        let mut post = Post {
            msg: msg.into(),
            uid: "usera".into(),
            txtime: postid as f64,
            rxtime: 0.0,
            postid,
            perms: 2,
            hashid: None,
        };
        post.hashid = Some(post.content_hash());
        post
    }

    fn key(postid: i64, msg: &str) -> String {
        post(postid, msg).dedup_key()
    }

    #[test]
    fn newest_first_page_renders_newest_on_top() {
        let mut view = FeedView::new();
        // server pages are ordered by txtime descending
        view.ingest(&[post(3, "third"), post(2, "second"), post(1, "first")]);
        let keys: Vec<String> = view.rows().iter().map(|row| row.key.clone()).collect();
        assert_eq!(
            keys,
            vec![key(3, "third"), key(2, "second"), key(1, "first")]
        );
    }

    #[test]
    fn oldest_first_page_renders_the_same() {
        let mut view = FeedView::new();
        view.ingest_page(&[post(1, "first"), post(2, "second"), post(3, "third")], false);
        assert_eq!(view.rows()[0].key, key(3, "third"));
        assert_eq!(view.rows().len(), 3);
    }

    #[test]
    fn reingest_of_seen_posts_adds_no_rows() {
        let mut view = FeedView::new();
        assert_eq!(view.ingest(&[post(2, "b"), post(1, "a")]), 2);
        assert_eq!(view.ingest(&[post(2, "b"), post(1, "a")]), 0);
        assert_eq!(view.rows().len(), 2);
    }

    #[test]
    fn overlapping_window_only_adds_new_posts() {
        let mut view = FeedView::new();
        view.ingest(&[post(2, "b"), post(1, "a")]);
        let added = view.ingest(&[post(3, "c"), post(2, "b")]);
        assert_eq!(added, 1);
        assert_eq!(view.rows()[0].key, key(3, "c"));
        assert_eq!(view.rows().len(), 3);
    }

    #[test]
    fn tampered_hashid_is_dropped_at_ingest() {
        let mut view = FeedView::new();
        let mut tampered = post(2, "changed after hashing");
        tampered.hashid = Some("0000000000000000000000000000000000000000".into());

        let added = view.ingest(&[tampered, post(1, "a")]);
        assert_eq!(added, 1);
        assert_eq!(view.rejected(), 1);
        assert_eq!(view.rows()[0].key, key(1, "a"));
    }

    #[test]
    fn posts_without_hashid_are_not_rejected() {
        let mut view = FeedView::new();
        let mut bare = post(1, "a");
        bare.hashid = None;
        assert_eq!(view.ingest(&[bare]), 1);
        assert_eq!(view.rejected(), 0);
    }

    #[test]
    fn same_text_from_different_posts_renders_twice() {
        let mut view = FeedView::new();
        view.ingest(&[post(2, "same"), post(1, "same")]);
        assert_eq!(view.rows().len(), 2);
    }

    #[test]
    fn rows_carry_linkified_message_and_avatar() {
        let mut view = FeedView::new();
        view.ingest(&[post(1, "see http://example.com now")]);
        let row = &view.rows()[0];
        assert_eq!(row.author, "usera");
        assert!(row.avatar_url.contains("gravatar.com/avatar/"));
        assert!(row
            .message
            .iter()
            .any(|segment| matches!(segment, Segment::Link { href, .. } if href == "http://example.com")));
    }

    #[test]
    fn clear_resets_rows_and_seen_map() {
        let mut view = FeedView::new();
        view.ingest(&[post(1, "a")]);
        view.clear();
        assert!(view.rows().is_empty());
        assert!(view.seen().is_empty());
        // the same post renders again after a clear
        assert_eq!(view.ingest(&[post(1, "a")]), 1);
    }
}
