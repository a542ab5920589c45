// 练习命令：分类与进度概览、按分类逐题练习

use anyhow::{Context, Result};
use rand::Rng;
use std::io::{BufRead, Write};

use super::{progress_bar, recover, AppContext, Console, Outcome};
use crate::models::CategoryType;
use crate::services::auth::Route;
use crate::services::content::filter_by_type;
use crate::services::markdown;
use crate::services::progression::{
    progress_overview, AttemptOutcome, ExerciseAttempt, NavButton, PracticeSession,
};

/// 练习首页：按类型列出分类，并显示已开始分类的进度
pub async fn overview<R: BufRead, W: Write>(ctx: &mut AppContext, io: &mut Console<R, W>) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::Exercises) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let api = ctx.api();
        let categories = api
            .list_categories()
            .await
            .context("No se pudieron cargar las categorías")?;
        let progress = api.user_progress().await.context("No se pudo cargar el progreso")?;
        let totals = api.exercise_totals().await.context("No se pudo cargar el total de ejercicios")?;

        for category_type in CategoryType::ALL {
            io.say(category_type)?;
            for category in filter_by_type(&categories, category_type) {
                io.say(format!("  - {}  ({})", category.name, category.id))?;
            }
            io.blank()?;
        }

        let views = progress_overview(&progress, &totals, &categories);
        if !views.is_empty() {
            io.say("Tu progreso")?;
            for view in views {
                io.say(format!(
                    "  {:<24} {} {}/{} ({:.0}%)",
                    view.name,
                    progress_bar(view.bar_width),
                    view.completed,
                    view.total,
                    view.percent
                ))?;
            }
        }
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

fn render_nav<R: BufRead, W: Write>(io: &mut Console<R, W>, buttons: &[NavButton]) -> Result<()> {
    let cells: Vec<String> = buttons
        .iter()
        .map(|b| {
            let mark = if b.current {
                ">"
            } else if b.completed {
                "✓"
            } else if b.enabled {
                " "
            } else {
                "x"
            };
            format!("[{}{}]", b.number, mark)
        })
        .collect();
    io.say(cells.join(" "))
}

fn render_attempt<R: BufRead, W: Write>(
    io: &mut Console<R, W>,
    problem: &str,
    images: &[String],
    attempt: &ExerciseAttempt,
) -> Result<()> {
    io.say(markdown::render_terminal(problem))?;
    for image in images {
        io.say(format!("[imagen: {}]", image))?;
    }
    io.blank()?;
    for (i, option) in attempt.options().iter().enumerate() {
        let state = if attempt.is_disabled(i) && !attempt.is_solved() { " (descartada)" } else { "" };
        io.say(format!("  {}) {}{}", i + 1, option.text, state))?;
    }
    Ok(())
}

/// 在某个分类里逐题练习
///
/// 输入选项编号作答；`n <编号>` 跳转到导航栏上的题目；`q` 退出。
/// 只有已完成的题和下一道未完成的题可以打开。
pub async fn practice<R, W, G>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    category_id: &str,
    start_at: Option<&str>,
    rng: &mut G,
) -> Result<Outcome>
where
    R: BufRead,
    W: Write,
    G: Rng + ?Sized,
{
    let route = match start_at {
        Some(id) => Route::ExerciseDetail(id.to_string()),
        None => Route::Exercises,
    };
    if let Err(redirect) = ctx.enter(&route) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let api = ctx.api().clone();
        let mut session = PracticeSession::load(api.clone(), category_id)
            .await
            .context("No se pudieron cargar los ejercicios")?;

        if session.navigator().total() == 0 {
            io.say("No hay ejercicios en esta categoría.")?;
            return Ok(Outcome::Done);
        }

        // 服务端给出的下一题作为默认入口，取不到时用本地计算的结果
        let server_next = match api.next_exercise(category_id).await {
            Ok(next) => next.map(|e| e.id),
            Err(e) if e.requires_login() => return Err(anyhow::Error::from(e)),
            Err(e) => {
                log::error!("Error fetching next exercise for {}: {}", category_id, e);
                None
            }
        };
        let mut current = match start_at {
            Some(id) if session.navigator().is_selectable(id) => id.to_string(),
            Some(id) => {
                io.say(format!("El ejercicio {} todavía está bloqueado.", id))?;
                default_target(&session, server_next.as_deref())
            }
            None => default_target(&session, server_next.as_deref()),
        };

        loop {
            let Some(mut attempt) = session.open(&current, rng) else {
                break;
            };
            let Some(exercise) = session.navigator().get(&current).cloned() else {
                break;
            };

            io.blank()?;
            render_nav(io, &session.navigator().buttons(Some(&current)))?;
            io.say(format!(
                "Ejercicio {} ({})",
                session.navigator().display_number(&exercise),
                exercise.level.label()
            ))?;
            render_attempt(io, &exercise.problem, &exercise.images, &attempt)?;

            let mut jump: Option<String> = None;
            while !attempt.is_solved() {
                let Some(line) = io.prompt("Respuesta")? else {
                    return Ok(Outcome::Done);
                };
                let line = line.trim();

                if line.eq_ignore_ascii_case("q") {
                    return Ok(Outcome::Done);
                }
                if let Some(number) = line.strip_prefix("n ") {
                    match find_button(&session, number.trim()) {
                        Some(id) if session.navigator().is_selectable(&id) => {
                            jump = Some(id);
                            break;
                        }
                        Some(_) => io.say("Ese ejercicio todavía está bloqueado.")?,
                        None => io.say("No existe ese ejercicio.")?,
                    }
                    continue;
                }

                let Some(index) = line.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) else {
                    io.say("Escribe el número de una opción.")?;
                    continue;
                };
                let answered = match session.answer(&mut attempt, index).await {
                    Ok(outcome) => outcome,
                    Err(e) if e.requires_login() => return Err(anyhow::Error::from(e)),
                    Err(e) => {
                        io.say(format!("No se pudo guardar el progreso: {}", e))?;
                        continue;
                    }
                };
                match answered {
                    AttemptOutcome::Correct => {
                        io.say("¡Correcto!")?;
                        if !exercise.explanation.trim().is_empty() {
                            io.say(markdown::render_terminal(&exercise.explanation))?;
                        }
                    }
                    AttemptOutcome::Incorrect => io.say("Incorrecto, prueba otra opción.")?,
                    AttemptOutcome::Ignored => io.say("Esa opción ya no está disponible.")?,
                }
            }

            current = match jump {
                Some(id) => id,
                None => match session.navigator().next_exercise_id() {
                    Some(next) => next.to_string(),
                    None => {
                        io.say("¡Has completado todos los ejercicios de esta categoría!")?;
                        break;
                    }
                },
            };
        }
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

/// 优先用服务端的下一题；全部完成时从第一题开始复习
fn default_target(session: &PracticeSession, server_next: Option<&str>) -> String {
    let navigator = session.navigator();
    server_next
        .filter(|id| navigator.is_selectable(id))
        .or_else(|| navigator.next_exercise_id())
        .or_else(|| navigator.exercises().first().map(|e| e.id.as_str()))
        .unwrap_or_default()
        .to_string()
}

fn find_button(session: &PracticeSession, number: &str) -> Option<String> {
    let number: i64 = number.parse().ok()?;
    session
        .navigator()
        .buttons(None)
        .into_iter()
        .find(|b| b.number == number)
        .map(|b| b.exercise_id)
}
