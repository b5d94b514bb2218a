//! User-facing text for the interactive surface.
//!
//! The tool was built for Vietnamese recruiters, so [`Locale::Vi`] is the
//! default. Error messages live on [`crate::error::ClassifyError::localized`];
//! everything else the UI prints is looked up here by [`Message`] key.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    Vi,
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vi" | "vn" | "vietnamese" => Ok(Locale::Vi),
            "en" | "english" => Ok(Locale::En),
            other => Err(format!("unknown locale '{other}' (expected vi or en)")),
        }
    }
}

/// Keys for fixed UI strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Title,
    Caption,
    ResultsHeading,
    ResultsLabel,
    EmptyState,
    Busy,
    ShortfallWarning,
    ResultsCleared,
    NewDocument,
    SameDocument,
    DocumentRemoved,
    KeyPrompt,
    KeySaved,
}

impl Locale {
    /// Look up the text for `msg`.
    pub fn text(self, msg: Message) -> &'static str {
        match (self, msg) {
            (Locale::Vi, Message::Title) => "Phân loại CV vào lĩnh vực phù hợp nhất",
            (Locale::En, Message::Title) => "Classify a CV into its best-matching fields",
            (Locale::Vi, Message::Caption) => {
                "Upload file PDF và hệ thống sẽ trả về đúng 3 lĩnh vực theo định dạng yêu cầu."
            }
            (Locale::En, Message::Caption) => {
                "Upload a PDF and the tool returns exactly 3 fields in the required format."
            }
            (Locale::Vi, Message::ResultsHeading) => "Kết quả",
            (Locale::En, Message::ResultsHeading) => "Results",
            (Locale::Vi, Message::ResultsLabel) => "Kết quả:",
            (Locale::En, Message::ResultsLabel) => "Result:",
            (Locale::Vi, Message::EmptyState) => {
                "Chưa có kết quả. Hãy upload file PDF và chạy lệnh classify."
            }
            (Locale::En, Message::EmptyState) => {
                "No results yet. Upload a PDF and run the classify command."
            }
            (Locale::Vi, Message::Busy) => "Đang trích xuất và phân loại…",
            (Locale::En, Message::Busy) => "Extracting and classifying…",
            (Locale::Vi, Message::ShortfallWarning) => {
                "Không trích xuất được đúng 3 mục, hiển thị nguyên văn phản hồi:"
            }
            (Locale::En, Message::ShortfallWarning) => {
                "Could not extract exactly 3 entries; showing the raw response:"
            }
            (Locale::Vi, Message::ResultsCleared) => "Đã xóa kết quả.",
            (Locale::En, Message::ResultsCleared) => "Results cleared.",
            (Locale::Vi, Message::NewDocument) => "Đã nhận file mới.",
            (Locale::En, Message::NewDocument) => "New document received.",
            (Locale::Vi, Message::SameDocument) => "File không thay đổi, giữ kết quả cũ.",
            (Locale::En, Message::SameDocument) => "Same document; keeping current results.",
            (Locale::Vi, Message::DocumentRemoved) => "Đã gỡ file.",
            (Locale::En, Message::DocumentRemoved) => "Document removed.",
            (Locale::Vi, Message::KeyPrompt) => "Nhập API key: ",
            (Locale::En, Message::KeyPrompt) => "Enter API key: ",
            (Locale::Vi, Message::KeySaved) => "Đã lưu API key cho phiên này.",
            (Locale::En, Message::KeySaved) => "API key stored for this session.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_locale() {
        assert_eq!("vi".parse::<Locale>(), Ok(Locale::Vi));
        assert_eq!(" EN ".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn default_is_vietnamese() {
        assert_eq!(Locale::default(), Locale::Vi);
        assert_eq!(Locale::default().text(Message::ResultsLabel), "Kết quả:");
    }
}
