//! # 引擎错误模型
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载解码、缩放、编码链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。

/// 图片引擎统一错误类型。
///
/// 该类型会在工厂层被上转为 `FactoryError::Engine`。
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}
