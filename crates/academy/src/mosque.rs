use chrono::{DateTime, Utc};
use serde::Serialize;

use masjedi_core::{DomainResult, MosqueId};

use crate::text;

/// Validated mosque fields (create and full update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosqueDraft {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl MosqueDraft {
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        location: Option<String>,
    ) -> DomainResult<Self> {
        Ok(Self {
            title: text::required("title", title)?,
            description: text::optional(description),
            location: text::optional(location),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MosqueReadModel {
    pub id: MosqueId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub number_of_circles: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use masjedi_core::DomainError;

    #[test]
    fn trims_fields_and_drops_blank_optionals() {
        let draft = MosqueDraft::new("  Al-Noor ", Some("   ".into()), Some(" Cairo ".into())).unwrap();
        assert_eq!(draft.title, "Al-Noor");
        assert_eq!(draft.description, None);
        assert_eq!(draft.location.as_deref(), Some("Cairo"));
    }

    #[test]
    fn rejects_blank_title() {
        let err = MosqueDraft::new(" \t", None, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
