//! # 响应式图片描述模块
//!
//! ## 设计思路
//!
//! `ResponsiveImage` 是一次 `create` 调用的输出值对象，记录规范化后的源路径、
//! 变体集合（宽度 → URL）以及 `sizes` 提示，最终用于拼出 HTML 的 `srcset` / `sizes`。
//!
//! ## 实现思路
//!
//! - 变体集合使用 `BTreeMap<u32, String>`，插入即有序，读取时倒序遍历，
//!   保证消费方始终先看到最大的图片。
//! - `sizes` 提示使用 `Vec` 保留追加顺序；相同媒体条件重复添加时原位覆盖。
//! - `srcset()` 以 `","` 连接，`sizes()` 以 `", "` 连接，两者的不对称是既有输出格式，需保持兼容。
//! - 单个变体的渲染/优化失败记录在 `failures` 中，不会静默丢失。

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// 一条 `sizes` 提示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeHint {
    /// 媒体条件，如 `min-width: 650px`；`None` 表示无条件的默认值。
    pub media: Option<String>,
    /// 布局宽度，如 `33vw`。
    pub value: String,
}

/// 失败发生的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Render,
    Optimize,
}

/// 单个变体的失败记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderFailure {
    pub width: u32,
    pub path: PathBuf,
    pub stage: FailureStage,
    pub message: String,
}

/// 响应式图片描述。
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponsiveImage {
    src: String,
    file_name: String,
    extension: String,
    url_path: String,
    srcset: BTreeMap<u32, String>,
    sizes: Vec<SizeHint>,
    failures: Vec<RenderFailure>,
}

impl ResponsiveImage {
    /// 以请求路径创建描述，路径会被规范化为以 `/` 开头的形式。
    ///
    /// # 示例
    /// ```rust
    /// use responsive_images::ResponsiveImage;
    ///
    /// assert_eq!(ResponsiveImage::new("img/image.jpeg").src(), "/img/image.jpeg");
    /// assert_eq!(ResponsiveImage::new("./img/image.jpeg").src(), "/img/image.jpeg");
    /// ```
    pub fn new(src: &str) -> Self {
        Self {
            src: canonicalize_src(src),
            ..Self::default()
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// 请求路径所在的 URL 目录（以 `/` 开头，根目录为 `/`）。
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// 由工厂在生成变体前一次性写入。
    pub(crate) fn set_source_info(&mut self, file_name: &str, extension: &str, url_path: &str) {
        self.file_name = file_name.to_string();
        self.extension = extension.to_string();
        self.url_path = url_path.to_string();
    }

    /// 添加一个变体；同一宽度重复添加时以最后一次为准。
    ///
    /// # 示例
    /// ```rust
    /// use responsive_images::ResponsiveImage;
    ///
    /// let mut image = ResponsiveImage::new("img/image.jpeg");
    /// image
    ///     .add_source("img/test-300.jpg", 300)
    ///     .add_source("/img/test.jpg", 1920);
    ///
    /// assert_eq!(image.srcset(), "/img/test.jpg 1920w,/img/test-300.jpg 300w");
    /// ```
    pub fn add_source(&mut self, url: &str, width: u32) -> &mut Self {
        self.srcset
            .insert(width, format!("/{}", url.trim_start_matches('/')));
        self
    }

    /// 批量添加变体。
    pub fn add_sources<'a, I>(&mut self, sources: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        for (url, width) in sources {
            self.add_source(url, width);
        }
        self
    }

    /// 按宽度倒序遍历变体。
    pub fn variants(&self) -> impl Iterator<Item = (u32, &str)> {
        self.srcset
            .iter()
            .rev()
            .map(|(width, url)| (*width, url.as_str()))
    }

    /// 变体宽度（倒序）。
    pub fn widths(&self) -> Vec<u32> {
        self.srcset.keys().rev().copied().collect()
    }

    pub fn url_for(&self, width: u32) -> Option<&str> {
        self.srcset.get(&width).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.srcset.is_empty()
    }

    /// `srcset` 属性值。
    pub fn srcset(&self) -> String {
        self.variants()
            .map(|(width, url)| format!("{} {}w", url, width))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// 添加带媒体条件的 `sizes` 提示。
    ///
    /// # 示例
    /// ```rust
    /// use responsive_images::ResponsiveImage;
    ///
    /// let mut image = ResponsiveImage::new("img/image.jpeg");
    /// image.add_sizes("min-width: 1000px", "50vw").add_default_size("100vw");
    ///
    /// assert_eq!(image.sizes(), "(min-width: 1000px) 50vw, 100vw");
    /// ```
    pub fn add_sizes(&mut self, media: &str, value: &str) -> &mut Self {
        match self
            .sizes
            .iter_mut()
            .find(|hint| hint.media.as_deref() == Some(media))
        {
            Some(hint) => hint.value = value.to_string(),
            None => self.sizes.push(SizeHint {
                media: Some(media.to_string()),
                value: value.to_string(),
            }),
        }
        self
    }

    /// 添加无条件的 `sizes` 提示。
    pub fn add_default_size(&mut self, value: &str) -> &mut Self {
        self.sizes.push(SizeHint {
            media: None,
            value: value.to_string(),
        });
        self
    }

    pub fn size_hints(&self) -> &[SizeHint] {
        &self.sizes
    }

    /// `sizes` 属性值。
    ///
    /// 媒体条件两侧的括号会被去掉再统一补上；纯数字条件只输出值。
    pub fn sizes(&self) -> String {
        self.sizes
            .iter()
            .map(|hint| {
                let media = hint
                    .media
                    .as_deref()
                    .map(|media| media.trim_start_matches('(').trim_end_matches(')'))
                    .filter(|media| !is_numeric(media));

                match media {
                    Some(media) => format!("({}) {}", media, hint.value),
                    None => hint.value.clone(),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn failures(&self) -> &[RenderFailure] {
        &self.failures
    }

    pub(crate) fn record_failure(&mut self, failure: RenderFailure) {
        self.failures.push(failure);
    }
}

fn canonicalize_src(src: &str) -> String {
    let trimmed = src
        .strip_prefix("./")
        .or_else(|| src.strip_prefix('/'))
        .unwrap_or(src);
    format!("/{}", trimmed)
}

fn is_numeric(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .is_ok_and(|number| number.is_finite())
}
