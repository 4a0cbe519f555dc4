use tracing::warn;

use super::{ContentManager, Repository, Session};
use crate::error::StoreResult;

/// An administrative session that logs out when dropped.
pub struct AdminSession<'r> {
    inner: Box<dyn Session + 'r>,
}

impl<'r> AdminSession<'r> {
    pub fn login(repository: &'r dyn Repository) -> StoreResult<Self> {
        let inner = repository.login_administrative()?;
        Ok(Self { inner })
    }

    pub fn content_manager(&self) -> &dyn ContentManager {
        self.inner.content_manager()
    }
}

impl Drop for AdminSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.logout() {
            warn!(error = %e, "Failed to close admin session");
        }
    }
}
