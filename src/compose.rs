use std::sync::Arc;

use crate::post::Visibility;
use crate::service::PublishService;

pub const MAX_POST_CHARS: usize = 140;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("message is longer than {MAX_POST_CHARS} characters")]
    TooLong,
    #[error(transparent)]
    Publish(#[from] anyhow::Error),
}

/// Draft buffer plus the selected visibility scope. Validation is
/// client-side only; an over-length draft never reaches the transport.
pub struct Composer {
    draft: String,
    scope: Visibility,
    publisher: Arc<dyn PublishService>,
}

impl Composer {
    pub fn new(publisher: Arc<dyn PublishService>) -> Self {
        Self {
            draft: String::new(),
            scope: Visibility::default(),
            publisher,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn push_char(&mut self, ch: char) {
        self.draft.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.draft.pop();
    }

    pub fn scope(&self) -> Visibility {
        self.scope
    }

    pub fn set_scope(&mut self, scope: Visibility) {
        self.scope = scope;
    }

    pub fn cycle_scope(&mut self) {
        self.scope = self.scope.next();
    }

    /// Remaining character budget. Negative once the draft runs over, so
    /// the counter can display the overrun.
    pub fn chars_left(&self) -> i64 {
        MAX_POST_CHARS as i64 - self.draft.chars().count() as i64
    }

    pub fn over_budget(&self) -> bool {
        self.chars_left() < 0
    }

    /// Publishes the draft under the selected scope and clears it. The
    /// caller triggers the immediate feed refresh on success.
    pub fn submit(&mut self) -> Result<(), ComposeError> {
        if self.draft.chars().count() > MAX_POST_CHARS {
            return Err(ComposeError::TooLong);
        }
        self.publisher.push(&self.draft, self.scope)?;
        self.draft.clear();
        Ok(())
    }
}
