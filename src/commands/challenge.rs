// 挑战命令：作答一轮随机题目，结束后显示得分、用时和全部解析

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use std::io::{BufRead, Write};

use super::{recover, AppContext, Console, Outcome};
use crate::services::auth::Route;
use crate::services::challenge::{ChallengeMode, ChallengeOutcome, ChallengeRound};
use crate::services::markdown;

pub async fn run<R, W, G>(ctx: &mut AppContext, io: &mut Console<R, W>, rng: &mut G) -> Result<Outcome>
where
    R: BufRead,
    W: Write,
    G: Rng + ?Sized,
{
    if let Err(redirect) = ctx.enter(&Route::Challenge) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let mut mode = ChallengeMode::start(ctx.api().clone(), ctx.config.challenge_count, rng)
            .await
            .context("No se pudieron cargar los ejercicios del desafío")?;

        loop {
            if mode.round().total() == 0 {
                io.say("No hay ejercicios disponibles para el desafío.")?;
                return Ok(Outcome::Done);
            }
            if !play_round(io, mode.round_mut())? {
                return Ok(Outcome::Done);
            }
            show_results(io, mode.round())?;

            if !io.confirm("¿Intentar de nuevo?")? {
                break;
            }
            mode.restart(rng)
                .await
                .context("No se pudieron cargar nuevos ejercicios")?;
        }
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

/// 返回 false 表示用户中途退出
fn play_round<R: BufRead, W: Write>(io: &mut Console<R, W>, round: &mut ChallengeRound) -> Result<bool> {
    let total = round.total();
    io.say(format!("Desafío ({}): {} preguntas", round.difficulty().label(), total))?;

    for index in 0..total {
        let question = &round.questions()[index];
        io.blank()?;
        io.say(format!("Pregunta {}/{}", index + 1, total))?;
        io.say(markdown::render_terminal(&question.exercise.problem))?;
        for image in &question.exercise.images {
            io.say(format!("[imagen: {}]", image))?;
        }
        for (i, option) in question.options.iter().enumerate() {
            io.say(format!("  {}) {}", i + 1, option.text))?;
        }

        loop {
            let Some(line) = io.prompt("Respuesta")? else {
                return Ok(false);
            };
            let line = line.trim();
            if line.eq_ignore_ascii_case("q") {
                return Ok(false);
            }
            let Some(option) = line.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) else {
                io.say("Escribe el número de una opción.")?;
                continue;
            };

            match round.select(index, option, Utc::now()) {
                ChallengeOutcome::Correct => {
                    io.say("¡Correcto!")?;
                    break;
                }
                ChallengeOutcome::Incorrect => {
                    io.say("Incorrecto.")?;
                    break;
                }
                ChallengeOutcome::Locked => break,
                ChallengeOutcome::OutOfRange => io.say("Esa opción no existe.")?,
            }
        }
    }
    Ok(true)
}

fn show_results<R: BufRead, W: Write>(io: &mut Console<R, W>, round: &ChallengeRound) -> Result<()> {
    let Some(summary) = round.summary() else {
        return Ok(());
    };

    io.blank()?;
    io.say("Resultados")?;
    io.say(summary.message())?;
    io.say(format!(
        "Tiempo: {:02}:{:02}",
        summary.elapsed_secs / 60,
        summary.elapsed_secs % 60
    ))?;

    if round.hints_visible() {
        for (i, question) in round.questions().iter().enumerate() {
            let mark = match question.answer {
                Some(answer) if answer.is_correct => "✓",
                _ => "✗",
            };
            io.blank()?;
            io.say(format!("{} {}. {}", mark, i + 1, question.exercise.problem))?;
            io.say(format!("   Respuesta correcta: {}", question.exercise.answers.correct))?;
            if !question.exercise.explanation.trim().is_empty() {
                io.say(format!("   Pista: {}", question.exercise.explanation))?;
            }
        }
    }
    Ok(())
}
