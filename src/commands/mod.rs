// 终端命令模块
// 每个命令对应一个页面，先检查路由守卫，再通过 Console 读写

pub mod admin;
pub mod auth;
pub mod challenge;
pub mod exercises;
pub mod tutorials;

use anyhow::Result;
use std::fmt::Display;
use std::io::{BufRead, Write};

use crate::config::AppConfig;
use crate::errors::{ApiError, AuthError};
use crate::services::auth::{guard, AuthContext, Route};

/// 命令运行所需的共享状态
pub struct AppContext {
    pub auth: AuthContext,
    pub config: AppConfig,
}

impl AppContext {
    pub fn new(auth: AuthContext, config: AppConfig) -> Self {
        Self { auth, config }
    }

    pub fn api(&self) -> &crate::services::api::ApiClient {
        self.auth.api()
    }

    /// 重新读取令牌后检查路由
    pub fn enter(&mut self, route: &Route) -> Result<(), Route> {
        self.auth.sync();
        let allowed = guard(route, self.auth.user());
        if let Err(redirect) = &allowed {
            log::info!("Access to {} denied, redirecting to {}", route, redirect);
        }
        allowed
    }
}

/// 命令结束后的去向
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Redirect(Route),
}

/// 401/403 时跳转登录页，其它错误原样返回
pub fn recover(ctx: &mut AppContext, result: Result<Outcome>) -> Result<Outcome> {
    match result {
        Err(e) if is_unauthorized(&e) => {
            ctx.auth.sync();
            Ok(Outcome::Redirect(Route::Login))
        }
        other => other,
    }
}

fn is_unauthorized(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        let api_error = cause.downcast_ref::<ApiError>().or_else(|| {
            match cause.downcast_ref::<AuthError>() {
                Some(AuthError::Api(e)) => Some(e),
                _ => None,
            }
        });
        api_error.is_some_and(ApiError::requires_login)
    })
}

/// 终端输入输出
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// 读取一行，输入结束时返回 None
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        self.read_line()
    }

    /// 编辑时回车保留原值
    pub fn prompt_default(&mut self, label: &str, current: &str) -> Result<String> {
        let answer = self.prompt(&format!("{} [{}]", label, current))?;
        Ok(match answer {
            Some(value) if !value.trim().is_empty() => value,
            _ => current.to_string(),
        })
    }

    pub fn confirm(&mut self, label: &str) -> Result<bool> {
        let answer = self.prompt(&format!("{} (s/n)", label))?;
        Ok(matches!(
            answer.as_deref().map(|a| a.trim().to_lowercase()).as_deref(),
            Some("s") | Some("si") | Some("sí") | Some("y")
        ))
    }

    /// 多行输入，单独一行 "." 结束
    pub fn read_block(&mut self, label: &str) -> Result<String> {
        writeln!(self.output, "{} (termina con una línea que contenga solo '.'):", label)?;
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim() == "." {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    pub fn blank(&mut self) -> Result<()> {
        writeln!(self.output)?;
        Ok(())
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// 进度条，宽度按百分比缩放到 20 格
pub fn progress_bar(width_percent: f64) -> String {
    let filled = ((width_percent.clamp(0.0, 100.0) / 100.0) * 20.0).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(20 - filled))
}


#[cfg(test)]
mod tests {
    use super::test_support::{console, output};
    use super::*;

    #[test]
    fn test_console_prompts() {
        let mut io = console("ana\n\nlinea 1\nlinea 2\n.\ns\n");
        assert_eq!(io.prompt("Usuario").unwrap().as_deref(), Some("ana"));
        assert_eq!(io.prompt_default("Título", "Pilas").unwrap(), "Pilas");
        assert_eq!(io.read_block("Contenido").unwrap(), "linea 1\nlinea 2");
        assert!(io.confirm("¿Seguro?").unwrap());
        assert_eq!(io.read_line().unwrap(), None);
        assert!(output(&io).starts_with("Usuario: Título [Pilas]: "));
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(10.0), format!("[##{}]", ".".repeat(18)));
        assert_eq!(progress_bar(100.0), format!("[{}]", "#".repeat(20)));
        assert_eq!(progress_bar(250.0), format!("[{}]", "#".repeat(20)));
    }

    #[test]
    fn test_unauthorized_detection() {
        let err: anyhow::Error = ApiError::Unauthorized.into();
        assert!(is_unauthorized(&err.context("loading progress")));
        let err: anyhow::Error = AuthError::Api(ApiError::Unauthorized).into();
        assert!(is_unauthorized(&err));
        let err: anyhow::Error = ApiError::CategoryInUse.into();
        assert!(!is_unauthorized(&err));
    }
}
