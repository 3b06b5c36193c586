//! Browser launching

use crate::{Error, Result};

/// Opens URLs for the user
pub trait Browser {
    /// Open `url`
    ///
    /// # Errors
    ///
    /// Returns error if the launcher could not be started
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs in the default system browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!(url, "opening browser");
        // Detached so a slow browser start never blocks the conversation
        open::that_detached(url).map_err(|e| Error::Browser(format!("failed to open {url}: {e}")))
    }
}
