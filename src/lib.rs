//! # 响应式图片工厂：库入口
//!
//! 从一张源图生成一组按宽度缩放的变体，写入公开输出目录，
//! 并返回可直接拼出 HTML `srcset` / `sizes` 的描述对象。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    调用方 (create / create_async)          │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓
//! ┌───────┴──────────────────────────────────────────────────┐
//! │  factory ───── ResponsiveFactory (流程编排 + 阶段耗时)     │
//! │  │                                                       │
//! │  ├─ config      FactoryConfig (一次性校验)                │
//! │  ├─ policy      SizingPolicy: width / filesize / sizes   │
//! │  ├─ cache       VariantCache (清单 + 文件名索引)          │
//! │  └─ descriptor  ResponsiveImage (srcset / sizes)         │
//! │                                                          │
//! │  协作方 (trait 接缝)                                      │
//! │  ├─ engine      ImageEngine → RasterEngine               │
//! │  ├─ storage     Storage     → FsStorage                  │
//! │  ├─ locator     Locator     → FsLocator                  │
//! │  └─ optimizer   Optimizer   → CommandOptimizer / Noop    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `FactoryError` |
//! | [`config`] | 工厂配置、驱动与滤镜白名单、JSON 读取 |
//! | [`policy`] | 三种缩放策略，纯函数无 I/O |
//! | [`cache`] | 变体缓存判断与清单读写 |
//! | [`descriptor`] | 输出描述对象与 `srcset` / `sizes` 拼装 |
//! | [`factory`] | 单次生成的完整流程，同步与异步两种入口 |
//! | [`engine`] | 解码、缩放、编码 |
//! | [`storage`] | 输出文件读写 |
//! | [`locator`] | 在源目录中定位请求的图片 |
//! | [`optimizer`] | 调用外部工具做无损压缩 |

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod factory;
pub mod locator;
pub mod optimizer;
pub mod policy;
pub mod storage;

pub use config::{Driver, FactoryConfig, ResizeFilter};
pub use descriptor::{FailureStage, RenderFailure, ResponsiveImage, SizeHint};
pub use engine::{EngineError, ImageEngine, RasterEngine, RasterEngineOptions};
pub use error::FactoryError;
pub use factory::ResponsiveFactory;
pub use policy::{PolicyKind, PolicyParameters, ScaleSet, SizingPolicy, SourceMetrics, TargetSize};
