// 认证命令：登录、注册、Google 登录、退出、当前用户

use anyhow::Result;
use std::io::{BufRead, Write};

use super::{AppContext, Console, Outcome};
use crate::models::User;
use crate::services::auth::Route;

fn credentials<R: BufRead, W: Write>(
    io: &mut Console<R, W>,
    username: Option<String>,
    password: Option<String>,
) -> Result<(String, String)> {
    let username = match username {
        Some(name) => name,
        None => io.prompt("Usuario")?.unwrap_or_default(),
    };
    let password = match password {
        Some(pw) => pw,
        None => io.prompt("Contraseña")?.unwrap_or_default(),
    };
    if username.trim().is_empty() || password.is_empty() {
        anyhow::bail!("Usuario y contraseña son obligatorios");
    }
    Ok((username.trim().to_string(), password))
}

fn welcome<R: BufRead, W: Write>(io: &mut Console<R, W>, user: &User) -> Result<()> {
    io.say(format!("Bienvenido, {}", user.display_name()))?;
    if user.is_admin() {
        io.say("Tienes permisos de administrador.")?;
    }
    Ok(())
}

pub async fn login<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    username: Option<String>,
    password: Option<String>,
) -> Result<Outcome> {
    let (username, password) = credentials(io, username, password)?;
    match ctx.auth.login(&username, &password).await {
        Ok(user) => {
            let user = user.clone();
            welcome(io, &user)?;
            Ok(Outcome::Redirect(Route::Home))
        }
        Err(e) => {
            io.say(format!("Error al iniciar sesión: {}", e))?;
            Ok(Outcome::Done)
        }
    }
}

pub async fn register<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    username: Option<String>,
    password: Option<String>,
) -> Result<Outcome> {
    let (username, password) = credentials(io, username, password)?;
    match ctx.auth.register(&username, &password).await {
        Ok(user) => {
            let user = user.clone();
            welcome(io, &user)?;
            Ok(Outcome::Redirect(Route::Home))
        }
        Err(e) => {
            io.say(format!("Error al registrarse: {}", e))?;
            Ok(Outcome::Done)
        }
    }
}

/// 使用 Google 颁发的凭证登录
pub async fn google_login<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    credential: Option<String>,
) -> Result<Outcome> {
    let credential = match credential {
        Some(c) => c,
        None => io.prompt("Credencial de Google")?.unwrap_or_default(),
    };
    if credential.trim().is_empty() {
        anyhow::bail!("La credencial de Google es obligatoria");
    }

    match ctx.auth.login_with_google(credential.trim()).await {
        Ok(user) => {
            let user = user.clone();
            welcome(io, &user)?;
            Ok(Outcome::Redirect(Route::Home))
        }
        Err(e) => {
            io.say(format!("Error al iniciar sesión con Google: {}", e))?;
            Ok(Outcome::Done)
        }
    }
}

pub fn logout<R: BufRead, W: Write>(ctx: &mut AppContext, io: &mut Console<R, W>) -> Result<Outcome> {
    ctx.auth.logout()?;
    io.say("Sesión cerrada.")?;
    Ok(Outcome::Redirect(Route::Login))
}

pub fn whoami<R: BufRead, W: Write>(ctx: &mut AppContext, io: &mut Console<R, W>) -> Result<Outcome> {
    ctx.auth.sync();
    match ctx.auth.user() {
        Some(user) => {
            let role = if user.is_admin() { "admin" } else { "user" };
            io.say(format!("{} ({}, {})", user.display_name(), user.id, role))?;
            Ok(Outcome::Done)
        }
        None => {
            io.say("No has iniciado sesión.")?;
            Ok(Outcome::Redirect(Route::Login))
        }
    }
}
