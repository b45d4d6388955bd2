//! 行内状态按钮
//!
//! 门户只通过按钮的 CSS 类表达案例的流程状态，这里把类名映射为枚举。

use phf::phf_map;
use std::fmt::Display;

/// 表示“需要操作”的蓝色标记
pub const READY_MARKER: &str = "btn-primary";

/// 验证按钮状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// 等待人工验证
    Processed,
    /// 需要上传文档
    NeedsUpload,
    /// 按钮已消失或无法识别，视为已完成
    AlreadyCompleted,
    Unknown,
    Error,
}

/// 上传按钮状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadState {
    NeedsFileUpload,
    FileAlreadyUploaded,
    Unknown,
    Error,
}

static VALIDATION_MARKERS: phf::Map<&'static str, ButtonState> = phf_map! {
    "btn-warning" => ButtonState::Processed,
    "btn-primary" => ButtonState::NeedsUpload,
    "btn-success" => ButtonState::AlreadyCompleted,
};

static UPLOAD_MARKERS: phf::Map<&'static str, UploadState> = phf_map! {
    "btn-default" => UploadState::NeedsFileUpload,
    "btn-danger" => UploadState::NeedsFileUpload,
    "btn-primary" => UploadState::FileAlreadyUploaded,
};

impl ButtonState {
    /// 由 class 属性推导状态，未识别的一律视为已完成
    pub fn from_class_attr(class_attr: &str) -> Self {
        lookup(&VALIDATION_MARKERS, class_attr).unwrap_or(ButtonState::AlreadyCompleted)
    }
}

impl UploadState {
    /// 由 class 属性推导状态，未识别时返回 Unknown
    pub fn from_class_attr(class_attr: &str) -> Self {
        lookup(&UPLOAD_MARKERS, class_attr).unwrap_or(UploadState::Unknown)
    }
}

/// class 属性中是否带有蓝色标记
pub fn is_ready_marker(class_attr: &str) -> bool {
    class_attr.split_whitespace().any(|class| class == READY_MARKER)
}

fn lookup<T: Copy>(table: &phf::Map<&'static str, T>, class_attr: &str) -> Option<T> {
    class_attr
        .split_whitespace()
        .find_map(|class| table.get(class).copied())
}

impl Display for ButtonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ButtonState::Processed => "待人工验证",
            ButtonState::NeedsUpload => "需要上传",
            ButtonState::AlreadyCompleted => "已完成",
            ButtonState::Unknown => "未知",
            ButtonState::Error => "错误",
        };
        write!(f, "{}", name)
    }
}

impl Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadState::NeedsFileUpload => "需要上传文件",
            UploadState::FileAlreadyUploaded => "文件已上传",
            UploadState::Unknown => "未知",
            UploadState::Error => "错误",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_markers_map_to_states() {
        assert_eq!(
            ButtonState::from_class_attr("btn btn-xs btn-warning btn-validacion"),
            ButtonState::Processed
        );
        assert_eq!(
            ButtonState::from_class_attr("btn btn-primary btn-validacion"),
            ButtonState::NeedsUpload
        );
        assert_eq!(
            ButtonState::from_class_attr("btn btn-success"),
            ButtonState::AlreadyCompleted
        );
    }

    #[test]
    fn unrecognized_validation_marker_counts_as_completed() {
        assert_eq!(
            ButtonState::from_class_attr("btn btn-info btn-validacion"),
            ButtonState::AlreadyCompleted
        );
        assert_eq!(ButtonState::from_class_attr(""), ButtonState::AlreadyCompleted);
    }

    #[test]
    fn unrecognized_upload_marker_is_unknown() {
        assert_eq!(
            UploadState::from_class_attr("btn btn-default btn-adjuntar"),
            UploadState::NeedsFileUpload
        );
        assert_eq!(
            UploadState::from_class_attr("btn btn-primary btn-adjuntar"),
            UploadState::FileAlreadyUploaded
        );
        assert_eq!(
            UploadState::from_class_attr("btn btn-info"),
            UploadState::Unknown
        );
    }

    #[test]
    fn ready_marker_needs_whole_class_name() {
        assert!(is_ready_marker("btn btn-primary"));
        assert!(!is_ready_marker("btn btn-primary-outline"));
        assert!(!is_ready_marker("btn btn-default"));
    }
}
