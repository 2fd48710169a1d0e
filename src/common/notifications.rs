use std::fmt::Display;

use tracing::debug;

use super::ResourceKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut e = format! {"{self:?}"};
        e.make_ascii_uppercase();
        write!(f, "{e}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub objects: Vec<ResourceKey>,
}

/// Append-only diagnostics side channel. Callers pass the source object explicitly with every message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Notifications {
    entries: Vec<Notification>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, severity: Severity, message: impl Into<String>, objects: &[ResourceKey]) {
        let message = message.into();
        debug!("{severity} {message} {objects:?}");
        self.entries.push(Notification { severity, message, objects: objects.to_vec() });
    }

    pub fn info(&mut self, message: impl Into<String>, object: &ResourceKey) {
        self.notify(Severity::Info, message, std::slice::from_ref(object));
    }

    pub fn warning(&mut self, message: impl Into<String>, object: &ResourceKey) {
        self.notify(Severity::Warning, message, std::slice::from_ref(object));
    }

    pub fn error(&mut self, message: impl Into<String>, object: &ResourceKey) {
        self.notify(Severity::Error, message, std::slice::from_ref(object));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|n| n.severity == severity).count()
    }
}

impl<'a> IntoIterator for &'a Notifications {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_notifications_are_kept_in_order() {
        let key = ResourceKey::namespaced("gw", "istio-system");
        let mut notifications = Notifications::new();
        notifications.info("ignoring field selector", &key);
        notifications.warning("skipping server", &key);
        notifications.error("unknown protocol", &key);
        notifications.info("ignoring field bind", &key);

        assert_eq!(notifications.len(), 4);
        assert_eq!(notifications.count(Severity::Info), 2);
        assert_eq!(notifications.count(Severity::Warning), 1);
        let severities: Vec<_> = notifications.iter().map(|n| n.severity).collect();
        assert_eq!(severities, vec![Severity::Info, Severity::Warning, Severity::Error, Severity::Info]);
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }
}
