//! Diff emission over a growing clean text

/// Tracks how much clean text has already been delivered and hands out only
/// the new part of each successive snapshot.
#[derive(Debug, Clone, Default)]
pub struct DiffEmitter {
    emitted: String,
    watermark: usize,
}

impl DiffEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of characters already delivered.
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Everything delivered so far.
    pub fn emitted(&self) -> &str {
        &self.emitted
    }

    /// Return the characters of `cleaned` past the watermark and advance it.
    ///
    /// `cleaned` must extend what was already delivered. A snapshot that is
    /// shorter but still a prefix yields nothing; one that contradicts
    /// delivered text yields nothing and leaves the watermark in place, since
    /// delivered characters can't be taken back.
    pub fn compute_delta(&mut self, cleaned: &str) -> Option<String> {
        if cleaned.len() <= self.emitted.len() {
            if !self.emitted.starts_with(cleaned) {
                tracing::warn!(
                    emitted = self.emitted.len(),
                    snapshot = cleaned.len(),
                    "clean text diverged from delivered prefix"
                );
            }
            return None;
        }
        let Some(delta) = cleaned.strip_prefix(self.emitted.as_str()) else {
            tracing::warn!(
                emitted = self.emitted.len(),
                snapshot = cleaned.len(),
                "clean text diverged from delivered prefix"
            );
            return None;
        };
        let delta = delta.to_string();
        self.watermark += delta.chars().count();
        self.emitted.push_str(&delta);
        Some(delta)
    }
}
