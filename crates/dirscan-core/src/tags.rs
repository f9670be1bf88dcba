//! Tags attached to every scan call.

use serde::Serialize;

use crate::error::ConfigError;

/// Maximum number of tags the scanning service accepts per call.
pub const MAX_TAGS: usize = 8;

/// Read-only set of up to [`MAX_TAGS`] tags.
///
/// Built once during startup and shared by every scan task without
/// synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Create a tag set, rejecting more than [`MAX_TAGS`] entries.
    pub fn new<I, S>(tags: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.len() > MAX_TAGS {
            return Err(ConfigError::TooManyTags { count: tags.len() });
        }
        Ok(Self(tags))
    }

    /// Parse comma-separated values, as given on the command line.
    ///
    /// Each value may hold several tags; empty segments are dropped.
    pub fn from_csv<I, S>(values: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = Vec::new();
        for value in values {
            tags.extend(
                value
                    .as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned),
            );
        }
        Self::new(tags)
    }

    /// An empty tag set.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Borrow the tags.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags joined with commas.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_to_eight_tags() {
        let tags = TagSet::new((0..MAX_TAGS).map(|i| format!("t{i}"))).unwrap();
        assert_eq!(tags.len(), MAX_TAGS);
    }

    #[test]
    fn test_nine_tags_rejected() {
        let err = TagSet::new((0..9).map(|i| format!("t{i}"))).unwrap_err();
        assert!(matches!(err, ConfigError::TooManyTags { count: 9 }));
    }

    #[test]
    fn test_from_csv_accumulates() {
        let tags = TagSet::from_csv(["prod,nightly", "eu-west"]).unwrap();
        assert_eq!(tags.as_slice(), ["prod", "nightly", "eu-west"]);
        assert_eq!(tags.joined(), "prod,nightly,eu-west");
    }

    #[test]
    fn test_from_csv_limit_spans_values() {
        assert!(TagSet::from_csv(["a,b,c,d", "e,f,g,h", "i"]).is_err());
    }
}
