//! 导入数据源

use std::fs;
use std::path::Path;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// 按行拆分好的导入文本
///
/// 行按 `str::lines` 规则拆分：`\n` 与 `\r\n` 都是换行，
/// 末尾的换行不会产生额外的空行。行号从 1 开始。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSource {
    lines: Vec<String>,
}

impl ImportSource {
    /// 开头的 UTF-8 BOM 会被去掉
    pub fn from_text(text: &str) -> Self {
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// 读取文件，非 UTF-8 字节按替换字符处理
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::from_text(&String::from_utf8_lossy(&bytes)))
    }

    /// 已拆分好的行，原样保留
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// (行号, 行内容)，行号从 1 开始
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
    }
}
