//! Prompts and the job-field taxonomy.
//!
//! Centralising the template and the taxonomy here keeps them a single
//! source of truth: the parser, the off-taxonomy check in
//! [`crate::output`], and the tests all read the same constants.
//!
//! Callers can override the system persona via
//! [`crate::config::ClassifierConfig::system_prompt`]. The classification
//! template itself is fixed.

/// The closed, ordered list of job fields the model must choose from.
pub const TAXONOMY: [&str; 12] = [
    "Công nghệ - Thông tin",
    "Đầu tư - Tài chính",
    "Y tế - Dược phẩm",
    "Giáo dục",
    "Bất động sản - Xây dựng",
    "Năng lượng - Môi trường",
    "Thực phẩm - Nông nghiệp",
    "Dịch vụ - Du lịch",
    "Sản phẩm - Tiêu dùng",
    "Nhà hàng - Ăn uống",
    "Vận tải - Logistics",
    "Thể dục - Thể thao",
];

/// Placeholder replaced by the normalised résumé text.
pub const RESUME_PLACEHOLDER: &str = "--HERERESUME--";

/// Default system message sent ahead of the classification prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Bạn là một nhà tuyển dụng nhiệt tình và trung thực. \
Hãy luôn trả lời một cách hữu ích nhất có thể.";

/// Classification instructions. The taxonomy block must stay identical to
/// [`TAXONOMY`]; `template_lists_taxonomy_in_order` guards that.
pub const CLASSIFY_TEMPLATE: &str = r#"Bạn là một nhà tuyển dụng chuyên nghiệp, có nhiệm vụ phân tích và phân loại hồ sơ ứng viên.

Hãy đọc kỹ nội dung CV dưới đây và **chỉ trả về đúng 3 lĩnh vực phù hợp nhất** từ danh sách cho sẵn bên dưới, dựa trên kinh nghiệm, kỹ năng và định hướng nghề nghiệp của ứng viên.

**Yêu cầu quan trọng:**
- Chỉ liệt kê đúng 3 lĩnh vực phù hợp nhất.
- Không cần giải thích hay mô tả thêm.
- Chỉ trả về kết quả đúng theo định dạng sau:

**Kết quả:**
1. [Tên lĩnh vực 1]
2. [Tên lĩnh vực 2]
3. [Tên lĩnh vực 3]

**Danh sách lĩnh vực:**
1. Công nghệ - Thông tin
2. Đầu tư - Tài chính
3. Y tế - Dược phẩm
4. Giáo dục
5. Bất động sản - Xây dựng
6. Năng lượng - Môi trường
7. Thực phẩm - Nông nghiệp
8. Dịch vụ - Du lịch
9. Sản phẩm - Tiêu dùng
10. Nhà hàng - Ăn uống
11. Vận tải - Logistics
12. Thể dục - Thể thao

### Đây là nội dung CV:
--HERERESUME--"#;

/// Embed normalised résumé text into the classification template.
///
/// The text is inserted verbatim; length limits are the provider's concern.
pub fn build_prompt(normalized_text: &str) -> String {
    CLASSIFY_TEMPLATE.replacen(RESUME_PLACEHOLDER, normalized_text, 1)
}

/// Whether `field` is one of the [`TAXONOMY`] entries (exact match).
pub fn is_known_field(field: &str) -> bool {
    TAXONOMY.contains(&field)
}
