use serde::{Deserialize, Serialize};

/// Kind of a file attached to a lesson, inferred from its extension.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pdf,
    Doc,
    Ppt,
    Xls,
    #[default]
    Other,
}

impl ResourceKind {
    pub fn from_file_name(name: &str) -> Self {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("doc" | "docx") => Self::Doc,
            Some("ppt" | "pptx") => Self::Ppt,
            Some("xls" | "xlsx") => Self::Xls,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Ppt => "ppt",
            Self::Xls => "xls",
            Self::Other => "other",
        }
    }
}

impl From<&str> for ResourceKind {
    fn from(value: &str) -> Self {
        match value {
            "pdf" => Self::Pdf,
            "doc" => Self::Doc,
            "ppt" => Self::Ppt,
            "xls" => Self::Xls,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_file_name() {
        assert_eq!(ResourceKind::from_file_name("notes.PDF"), ResourceKind::Pdf);
        assert_eq!(ResourceKind::from_file_name("plan.docx"), ResourceKind::Doc);
        assert_eq!(ResourceKind::from_file_name("deck.ppt"), ResourceKind::Ppt);
        assert_eq!(ResourceKind::from_file_name("marks.xlsx"), ResourceKind::Xls);
        assert_eq!(ResourceKind::from_file_name("image.png"), ResourceKind::Other);
        assert_eq!(ResourceKind::from_file_name("README"), ResourceKind::Other);
    }
}
