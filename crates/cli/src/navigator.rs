use crmchat_core::Navigator;
use parking_lot::Mutex;
use tracing::info;

/// Navigator for a terminal: there is no page to leave, so the target is
/// kept for the command to print.
#[derive(Debug, Default)]
pub struct ConsoleNavigator {
    last: Mutex<Option<String>>,
}

impl ConsoleNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent navigation target
    pub fn last(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &str) {
        info!(target_url = %url, "Navigation requested");
        *self.last.lock() = Some(url.to_string());
    }
}
