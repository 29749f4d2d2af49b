//! Shell Commands - 面向命令行的功能入口
//!
//! 所有命令返回 `Result<_, String>`，错误已转换为可直接展示给用户的文本。
//!
//! Modules:
//! - `lexicon`: 应用状态、查询与导入命令

pub mod lexicon;

pub use lexicon::*;
