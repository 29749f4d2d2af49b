//! Danci Lexicon - 单词译文词典
//!
//! 将 `WORD:T1,T2` 格式的文本批量导入 SQLite 词条表，并提供检索与译文查看。
//!
//! Modules:
//! - `storage`: SQLite 词条存储与迁移
//! - `import`: 行解析、译文合并与导入服务
//! - `query`: 检索与译文查看
//! - `diagnostics`: 内存诊断日志
//! - `commands`: 面向命令行的命令与错误文本
//! - `config`, `logging`: 配置加载与 tracing 初始化
//! - `shell`: 交互式命令行

pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod import;
pub mod logging;
pub mod query;
pub mod shell;
pub mod storage;
