use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;

use crate::api;
use crate::post::{Post, Visibility};

pub trait FeedService: Send + Sync {
    fn fetch_page(&self, limit: usize) -> Result<Vec<Post>>;
    fn search(&self, query: &str) -> Result<Vec<Post>>;
}

pub trait PublishService: Send + Sync {
    fn push(&self, msg: &str, scope: Visibility) -> Result<()>;
}

pub struct HttpFeedService {
    client: Arc<api::Client>,
}

impl HttpFeedService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for HttpFeedService {
    fn fetch_page(&self, limit: usize) -> Result<Vec<Post>> {
        self.client.get_state(limit).context("fetch feed page")
    }

    fn search(&self, query: &str) -> Result<Vec<Post>> {
        self.client.search(query).context("search posts")
    }
}

pub struct HttpPublishService {
    client: Arc<api::Client>,
}

impl HttpPublishService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl PublishService for HttpPublishService {
    fn push(&self, msg: &str, scope: Visibility) -> Result<()> {
        self.client.push(msg, scope).context("publish post")
    }
}

/// Canned feed pages, served one per fetch. Records call counts so tests
/// can assert how many fetches a poll schedule issued.
#[derive(Default)]
pub struct MockFeedService {
    pages: Mutex<Vec<Vec<Post>>>,
    fetches: Mutex<usize>,
    fail_next: Mutex<bool>,
}

impl MockFeedService {
    pub fn with_pages(pages: Vec<Vec<Post>>) -> Self {
        Self {
            pages: Mutex::new(pages),
            ..Self::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }

    pub fn fail_next_fetch(&self) {
        *self.fail_next.lock() = true;
    }
}

impl FeedService for MockFeedService {
    fn fetch_page(&self, _limit: usize) -> Result<Vec<Post>> {
        *self.fetches.lock() += 1;
        if std::mem::take(&mut *self.fail_next.lock()) {
            bail!("mock fetch failure");
        }
        let mut pages = self.pages.lock();
        if pages.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(pages.remove(0))
        }
    }

    fn search(&self, _query: &str) -> Result<Vec<Post>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct MockPublishService {
    pushed: Mutex<Vec<(String, Visibility)>>,
    fail_next: Mutex<bool>,
}

impl MockPublishService {
    pub fn pushed(&self) -> Vec<(String, Visibility)> {
        self.pushed.lock().clone()
    }

    pub fn fail_next_push(&self) {
        *self.fail_next.lock() = true;
    }
}

impl PublishService for MockPublishService {
    fn push(&self, msg: &str, scope: Visibility) -> Result<()> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            bail!("mock publish failure");
        }
        self.pushed.lock().push((msg.to_string(), scope));
        Ok(())
    }
}
