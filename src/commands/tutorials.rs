// 教程命令：列表、阅读、调整顺序

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use super::{recover, AppContext, Console, Outcome};
use crate::services::auth::Route;
use crate::services::content::{self, MoveDirection};
use crate::services::markdown;

pub async fn list<R: BufRead, W: Write>(ctx: &mut AppContext, io: &mut Console<R, W>) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::Tutorials) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let tutorials = content::list_tutorials(ctx.api())
            .await
            .context("No se pudieron cargar los tutoriales")?;
        if tutorials.is_empty() {
            io.say("No hay tutoriales disponibles.")?;
        }
        for (i, tutorial) in tutorials.iter().enumerate() {
            io.say(format!("{:>3}. {}  ({})", i + 1, tutorial.title, tutorial.id))?;
        }
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

/// 阅读一篇教程，`html` 为真时输出渲染后的 HTML
pub async fn show<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    id: &str,
    html: bool,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::Tutorials) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let tutorial = ctx
            .api()
            .get_tutorial(id)
            .await
            .with_context(|| format!("No se pudo cargar el tutorial {}", id))?;

        if html {
            io.say(markdown::render_html(&tutorial.content))?;
        } else {
            io.say(&tutorial.title)?;
            io.say("=".repeat(tutorial.title.chars().count().max(3)))?;
            io.blank()?;
            io.say(markdown::render_terminal(&tutorial.content))?;
        }
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

/// 管理员上移或下移一篇教程
pub async fn move_tutorial<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    id: &str,
    direction: MoveDirection,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::EditTutorial(id.to_string())) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let mut tutorials = content::list_tutorials(ctx.api()).await?;
        let moved = content::move_tutorial(ctx.api(), &mut tutorials, id, direction)
            .await
            .context("No se pudo actualizar el orden de los tutoriales")?;

        if !moved {
            io.say("El tutorial ya está en el extremo de la lista.")?;
        }
        for (i, tutorial) in tutorials.iter().enumerate() {
            let marker = if tutorial.id == id { ">" } else { " " };
            io.say(format!("{} {:>3}. {}", marker, i + 1, tutorial.title))?;
        }
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{console, context, output};
    use crate::services::test_support::{client_for, fake_token, spawn_server};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    fn tutorials_app() -> Router {
        Router::new()
            .route(
                "/tutorials",
                get(|| async {
                    Json(json!([
                        {"_id": "t2", "title": "Colas", "content": "", "order": 1},
                        {"_id": "t1", "title": "Pilas", "content": "", "order": 0}
                    ]))
                }),
            )
            .route(
                "/tutorials/:id",
                get(|| async {
                    Json(json!({
                        "_id": "t1", "title": "Pilas",
                        "content": "## Operaciones\n\n- push\n- pop\n", "order": 0
                    }))
                })
                .patch(|| async { StatusCode::OK }),
            )
    }

    #[tokio::test]
    async fn test_list_sorted_by_order() {
        let mut ctx = context(client_for(&spawn_server(tutorials_app()).await));
        let mut io = console("");

        assert_eq!(list(&mut ctx, &mut io).await.unwrap(), Outcome::Done);
        let text = output(&io);
        let pilas = text.find("Pilas").unwrap();
        let colas = text.find("Colas").unwrap();
        assert!(pilas < colas);
    }

    #[tokio::test]
    async fn test_show_renders_markdown() {
        let mut ctx = context(client_for(&spawn_server(tutorials_app()).await));

        let mut io = console("");
        show(&mut ctx, &mut io, "t1", false).await.unwrap();
        let text = output(&io);
        assert!(text.contains("Operaciones\n-----------"));
        assert!(text.contains("• push"));

        let mut io = console("");
        show(&mut ctx, &mut io, "t1", true).await.unwrap();
        assert!(output(&io).contains("<h2>Operaciones</h2>"));
    }

    #[tokio::test]
    async fn test_move_requires_admin() {
        let api = client_for(&spawn_server(tutorials_app()).await);
        api.session().set_token(&fake_token("u1", "user", None)).unwrap();
        let mut ctx = context(api);
        let mut io = console("");

        let outcome = move_tutorial(&mut ctx, &mut io, "t2", MoveDirection::Up).await.unwrap();
        assert_eq!(outcome, Outcome::Redirect(Route::Home));
    }

    #[tokio::test]
    async fn test_move_as_admin() {
        let api = client_for(&spawn_server(tutorials_app()).await);
        api.session().set_token(&fake_token("a1", "admin", None)).unwrap();
        let mut ctx = context(api);
        let mut io = console("");

        move_tutorial(&mut ctx, &mut io, "t2", MoveDirection::Up).await.unwrap();
        let text = output(&io);
        assert!(text.contains(">   1. Colas"));
        assert!(text.contains("    2. Pilas"));

        let mut io = console("");
        move_tutorial(&mut ctx, &mut io, "t1", MoveDirection::Up).await.unwrap();
        assert!(output(&io).contains("extremo"));
    }
}
