//! Browser-window capabilities the overlay depends on.

/// Blocking confirmation and page navigation.
pub trait Window {
    /// Asks the user to confirm; `false` means declined.
    fn confirm(&mut self, message: &str) -> bool;

    fn reload(&mut self);

    fn assign(&mut self, href: &str);
}

/// A window with no user attached: confirmations get a fixed answer and
/// navigations are recorded instead of performed.
#[derive(Debug, Default, Clone)]
pub struct HeadlessWindow {
    pub confirm_answer: bool,
    pub confirmations: Vec<String>,
    pub reloads: usize,
    pub navigations: Vec<String>,
}

impl HeadlessWindow {
    pub fn confirming(answer: bool) -> Self {
        Self {
            confirm_answer: answer,
            ..Self::default()
        }
    }
}

impl Window for HeadlessWindow {
    fn confirm(&mut self, message: &str) -> bool {
        self.confirmations.push(message.to_string());
        tracing::debug!(%message, answer = self.confirm_answer, "confirmation requested");
        self.confirm_answer
    }

    fn reload(&mut self) {
        self.reloads += 1;
        tracing::info!("page reload requested");
    }

    fn assign(&mut self, href: &str) {
        self.navigations.push(href.to_string());
        tracing::info!(%href, "navigation requested");
    }
}
