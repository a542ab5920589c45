//! 数据结构与算法学习平台的终端客户端
//!
//! 教程阅读、按分类逐题练习、挑战模式，以及管理员的内容维护。

pub mod commands;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod utils;
