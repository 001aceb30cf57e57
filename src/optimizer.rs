//! 图片优化模块
//!
//! # 设计思路
//!
//! 优化是渲染之后的可选阶段：对已写入磁盘的变体调用外部无损压缩工具原地重写。
//! 工厂只依赖 [`Optimizer`] trait，单个文件优化失败不会影响其他变体。
//!
//! # 实现思路
//!
//! - [`CommandOptimizer`] 按扩展名查找命令模板，`{path}` 占位符替换为文件路径。
//! - 默认命令表使用 `once_cell::sync::Lazy` 静态初始化，配置中的 `optimizer_options` 可逐项覆盖。
//! - 没有对应命令的扩展名直接跳过（视为成功）。
//! - [`NoopOptimizer`] 用于关闭优化或测试。

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use once_cell::sync::Lazy;

use crate::error::FactoryError;

const PATH_PLACEHOLDER: &str = "{path}";

static DEFAULT_COMMANDS: Lazy<HashMap<String, Vec<String>>> = Lazy::new(|| {
    let jpeg = vec![
        "jpegoptim".to_string(),
        "--strip-all".to_string(),
        "--all-progressive".to_string(),
        PATH_PLACEHOLDER.to_string(),
    ];

    HashMap::from([
        ("jpg".to_string(), jpeg.clone()),
        ("jpeg".to_string(), jpeg),
        (
            "png".to_string(),
            vec![
                "optipng".to_string(),
                "-i0".to_string(),
                "-o2".to_string(),
                "-quiet".to_string(),
                PATH_PLACEHOLDER.to_string(),
            ],
        ),
        (
            "gif".to_string(),
            vec![
                "gifsicle".to_string(),
                "-b".to_string(),
                "-O5".to_string(),
                PATH_PLACEHOLDER.to_string(),
            ],
        ),
    ])
});

/// 优化能力。
pub trait Optimizer: Send + Sync {
    /// 原地优化文件。
    fn optimize(&self, path: &Path) -> Result<(), FactoryError>;
}

/// 什么都不做的优化器。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOptimizer;

impl Optimizer for NoopOptimizer {
    fn optimize(&self, _path: &Path) -> Result<(), FactoryError> {
        Ok(())
    }
}

/// 调用外部命令的优化器。
#[derive(Debug, Clone)]
pub struct CommandOptimizer {
    commands: HashMap<String, Vec<String>>,
}

impl CommandOptimizer {
    /// 在默认命令表上叠加自定义命令。空命令表示禁用该扩展名的优化。
    pub fn new(overrides: &HashMap<String, Vec<String>>) -> Self {
        let mut commands = DEFAULT_COMMANDS.clone();
        for (extension, command) in overrides {
            commands.insert(extension.to_lowercase(), command.clone());
        }
        Self { commands }
    }

    /// 按扩展名生成完整命令行。
    fn command_for(&self, path: &Path) -> Option<Vec<String>> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        let template = self.commands.get(&extension)?;
        if template.is_empty() {
            return None;
        }

        let path = path.to_string_lossy();
        Some(
            template
                .iter()
                .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
                .collect(),
        )
    }
}

impl Default for CommandOptimizer {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

impl Optimizer for CommandOptimizer {
    fn optimize(&self, path: &Path) -> Result<(), FactoryError> {
        let Some(command) = self.command_for(path) else {
            log::debug!("⏭️ 无可用优化命令，跳过：{}", path.display());
            return Ok(());
        };

        let (program, args) = command
            .split_first()
            .ok_or_else(|| FactoryError::Optimize("优化命令为空".to_string()))?;

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| FactoryError::Optimize(format!("无法执行 {}：{}", program, e)))?;

        if !output.status.success() {
            return Err(FactoryError::Optimize(format!(
                "{} 退出码 {:?}：{}",
                program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        log::debug!("🗜️ 优化完成：{}", path.display());
        Ok(())
    }
}
