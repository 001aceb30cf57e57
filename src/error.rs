//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `FactoryError` 枚举，覆盖配置校验、源文件定位、存储读写、
//! 图片引擎与优化器等所有失败来源，调用侧可按分支匹配。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `EngineError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 单个变体的渲染/优化失败不会以 `Err` 返回，而是记录到
//!   [`crate::descriptor::RenderFailure`]，这里只描述“整次调用失败”的情况。

use crate::engine::EngineError;

/// 工厂级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// 配置非法（未知驱动、步进系数越界、最小宽度为 0 等），构造阶段即失败
    #[error("配置无效: {0}")]
    InvalidConfiguration(String),

    /// 在源目录下找不到请求的图片
    #[error("源文件不存在: {0}")]
    SourceNotFound(String),

    /// 图片解码 / 缩放 / 编码错误
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 存储目录或文件不可用
    #[error("存储错误: {0}")]
    Storage(String),

    /// 优化器执行失败
    #[error("优化失败: {0}")]
    Optimize(String),

    /// 后台任务执行失败（线程 panic 或被取消）
    #[error("后台任务失败: {0}")]
    Task(String),
}
