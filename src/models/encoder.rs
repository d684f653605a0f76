//! Job label ↔ class index mapping.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Bidirectional mapping between job labels and class indices.
///
/// Classes are the sorted distinct labels, so index `i` always refers to the
/// `i`-th label in alphabetical (byte) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learn the class list from a set of labels.
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = labels.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn decode(&self, class: usize) -> Option<&str> {
        self.classes.get(class).map(String::as_str)
    }

    /// Encode every label; an unseen label is an error.
    pub fn transform<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> Result<Vec<usize>, AppError> {
        labels
            .into_iter()
            .map(|label| {
                self.encode(label)
                    .ok_or_else(|| AppError::new(4, format!("Unknown job label '{label}'.")))
            })
            .collect()
    }
}
