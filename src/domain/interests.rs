use std::collections::BTreeSet;

/// Category tags a subscriber declared. Stored and exposed, never used to filter notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Interests(BTreeSet<String>);

impl Interests {
    /// Blank tags are dropped, the rest are trimmed and de-duplicated.
    pub fn parse(tags: Vec<String>) -> Interests {
        let tags = tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        Self(tags)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}
