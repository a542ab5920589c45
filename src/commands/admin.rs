// 管理员命令：分类、教程、练习的增删改，练习顺序一览，图片上传

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use super::{recover, AppContext, Console, Outcome};
use crate::errors::{ApiError, ValidationError};
use crate::models::{Category, CategoryType};
use crate::services::api::ApiClient;
use crate::services::auth::Route;
use crate::services::content::{self, ExerciseForm, TutorialForm, MAX_INCORRECT_ANSWERS};
use crate::services::markdown;

/// 分类页面上的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryAction {
    List,
    Add { name: String, category_type: CategoryType },
    Rename { id: String, name: String },
    Delete { id: String },
}

pub async fn categories<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    action: CategoryAction,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::Categories) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let api = ctx.api();
        match &action {
            CategoryAction::List => {}
            CategoryAction::Add { name, category_type } => {
                content::create_category(api, name, *category_type)
                    .await
                    .context("No se pudo crear la categoría")?;
                io.say(format!("Categoría '{}' creada.", name.trim()))?;
            }
            CategoryAction::Rename { id, name } => {
                content::rename_category(api, id, name)
                    .await
                    .context("No se pudo actualizar la categoría")?;
                io.say("Categoría actualizada.")?;
            }
            CategoryAction::Delete { id } => {
                let mut categories = api.list_categories().await?;
                match content::delete_category(api, &mut categories, id).await {
                    Ok(()) => io.say("Categoría eliminada.")?,
                    Err(ApiError::CategoryInUse) => io.say(ApiError::CategoryInUse)?,
                    Err(e) => return Err(anyhow::Error::from(e)),
                }
            }
        }

        let categories = api.list_categories().await?;
        print_categories(io, &categories)?;
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

fn print_categories<R: BufRead, W: Write>(io: &mut Console<R, W>, categories: &[Category]) -> Result<()> {
    for category_type in CategoryType::ALL {
        io.say(category_type)?;
        let group = content::filter_by_type(categories, category_type);
        if group.is_empty() {
            io.say("  (sin categorías)")?;
        }
        for category in group {
            io.say(format!("  {}  {}", category.id, category.name))?;
        }
    }
    Ok(())
}

/// 从文件读取正文，没有文件时在终端输入
fn read_content<R: BufRead, W: Write>(io: &mut Console<R, W>, file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer {}", path.display())),
        None => io.read_block("Contenido (Markdown)"),
    }
}

/// 列出正文里引用的图片
fn report_images<R: BufRead, W: Write>(io: &mut Console<R, W>, content: &str) -> Result<()> {
    let images = markdown::image_urls(content);
    if images.is_empty() {
        return Ok(());
    }
    io.say(format!("Imágenes en el contenido ({}):", images.len()))?;
    for url in images {
        io.say(format!("  {}", url))?;
    }
    Ok(())
}

pub async fn tutorial_add<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    file: Option<PathBuf>,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::AddTutorial) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let title = io.prompt("Título")?.unwrap_or_default();
        let category = io.prompt("Categoría (id, opcional)")?;
        let content = read_content(io, file.as_deref())?;
        report_images(io, &content)?;

        let form = TutorialForm {
            title,
            content,
            category,
        };
        let payload = match form.validate() {
            Ok(payload) => payload,
            Err(e) => {
                io.say(e)?;
                return Ok(Outcome::Done);
            }
        };

        ctx.api()
            .create_tutorial(&payload)
            .await
            .context("No se pudo crear el tutorial")?;
        io.say("Tutorial creado.")?;
        Ok::<_, anyhow::Error>(Outcome::Redirect(Route::Tutorials))
    }
    .await;
    recover(ctx, result)
}

pub async fn tutorial_edit<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    id: &str,
    file: Option<PathBuf>,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::EditTutorial(id.to_string())) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let tutorial = ctx.api().get_tutorial(id).await?;
        let mut form = TutorialForm::from_tutorial(&tutorial);

        form.title = io.prompt_default("Título", &form.title)?;
        let category = io.prompt_default("Categoría", form.category.as_deref().unwrap_or(""))?;
        form.category = Some(category);
        if file.is_some() || io.confirm("¿Editar el contenido?")? {
            form.content = read_content(io, file.as_deref())?;
            report_images(io, &form.content)?;
        }

        let payload = match form.validate() {
            Ok(payload) => payload,
            Err(e) => {
                io.say(e)?;
                return Ok(Outcome::Done);
            }
        };
        ctx.api()
            .update_tutorial(id, &payload)
            .await
            .context("No se pudo actualizar el tutorial")?;
        io.say("Tutorial actualizado.")?;
        Ok::<_, anyhow::Error>(Outcome::Redirect(Route::Tutorials))
    }
    .await;
    recover(ctx, result)
}

pub async fn tutorial_delete<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    id: &str,
    yes: bool,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::EditTutorial(id.to_string())) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        if !yes && !io.confirm("¿Seguro que quieres eliminar este tutorial?")? {
            return Ok(Outcome::Done);
        }
        ctx.api()
            .delete_tutorial(id)
            .await
            .context("No se pudo eliminar el tutorial")?;
        io.say("Tutorial eliminado.")?;
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

/// 输入为本地文件时先上传，返回可保存的图片地址
async fn resolve_image(api: &ApiClient, input: &str) -> Result<String> {
    let path = Path::new(input);
    if path.is_file() {
        let uploaded = api
            .upload_image(path)
            .await
            .with_context(|| format!("No se pudo subir {}", path.display()))?;
        return Ok(uploaded.image_url);
    }
    Ok(input.to_string())
}

async fn collect_images<R: BufRead, W: Write>(
    api: &ApiClient,
    io: &mut Console<R, W>,
    form: &mut ExerciseForm,
) -> Result<()> {
    loop {
        let Some(input) = io.prompt("Imagen (URL o archivo, vacío para terminar)")? else {
            return Ok(());
        };
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }
        if form.images.len() >= content::MAX_IMAGES {
            io.say(ValidationError::TooManyImages)?;
            return Ok(());
        }

        let src = resolve_image(api, input).await?;
        if let Err(e) = form.add_image(&src) {
            io.say(e)?;
        }
    }
}

fn prompt_level<R: BufRead, W: Write>(io: &mut Console<R, W>, current: Option<u8>) -> Result<Option<u8>> {
    let label = "Nivel (1 = Fácil, 2 = Difícil)";
    let answer = match current {
        Some(level) => io.prompt_default(label, &level.to_string())?,
        None => io.prompt(label)?.unwrap_or_default(),
    };
    Ok(answer.trim().parse().ok())
}

/// 分类可以输入 id，也可以输入列表里的序号
fn prompt_category<R: BufRead, W: Write>(
    io: &mut Console<R, W>,
    categories: &[Category],
    current: &str,
) -> Result<String> {
    for (i, category) in categories.iter().enumerate() {
        io.say(format!("  {}) {} [{}]", i + 1, category.name, category.category_type))?;
    }
    let answer = if current.is_empty() {
        io.prompt("Categoría")?.unwrap_or_default()
    } else {
        io.prompt_default("Categoría", current)?
    };
    let answer = answer.trim();
    let by_index = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| categories.get(i));
    Ok(by_index
        .map(|c| c.id.clone())
        .unwrap_or_else(|| answer.to_string()))
}

fn prompt_incorrect_answers<R: BufRead, W: Write>(
    io: &mut Console<R, W>,
    current: &[String],
) -> Result<Vec<String>> {
    let mut answers = Vec::new();
    for (i, existing) in current.iter().enumerate() {
        answers.push(io.prompt_default(&format!("Respuesta incorrecta {}", i + 1), existing)?);
    }
    while answers.len() < MAX_INCORRECT_ANSWERS {
        let label = format!("Respuesta incorrecta {} (vacío para terminar)", answers.len() + 1);
        match io.prompt(&label)? {
            Some(answer) if !answer.trim().is_empty() => answers.push(answer),
            _ => break,
        }
    }
    Ok(answers)
}

async fn fill_exercise_form<R: BufRead, W: Write>(
    api: &ApiClient,
    io: &mut Console<R, W>,
    form: &mut ExerciseForm,
) -> Result<()> {
    let categories = api.list_categories().await?;

    form.problem = if form.problem.is_empty() {
        io.read_block("Enunciado (Markdown)")?
    } else if io.confirm("¿Editar el enunciado?")? {
        io.read_block("Enunciado (Markdown)")?
    } else {
        form.problem.clone()
    };
    form.level = prompt_level(io, form.level)?;
    form.category = prompt_category(io, &categories, &form.category)?;
    form.correct_answer = if form.correct_answer.is_empty() {
        io.prompt("Respuesta correcta")?.unwrap_or_default()
    } else {
        io.prompt_default("Respuesta correcta", &form.correct_answer)?
    };
    form.incorrect_answers = prompt_incorrect_answers(io, &form.incorrect_answers)?;
    collect_images(api, io, form).await?;
    form.explanation = if form.explanation.is_empty() {
        io.prompt("Explicación")?.unwrap_or_default()
    } else {
        io.prompt_default("Explicación", &form.explanation)?
    };
    Ok(())
}

pub async fn exercise_add<R: BufRead, W: Write>(ctx: &mut AppContext, io: &mut Console<R, W>) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::AddExercise) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let api = ctx.api();
        let mut form = ExerciseForm::default();
        fill_exercise_form(api, io, &mut form).await?;

        let payload = match form.validate() {
            Ok(payload) => payload,
            Err(e) => {
                io.say(e)?;
                return Ok(Outcome::Done);
            }
        };
        api.create_exercise(&payload)
            .await
            .context("No se pudo crear el ejercicio")?;
        io.say("Ejercicio creado.")?;
        Ok::<_, anyhow::Error>(Outcome::Redirect(Route::Exercises))
    }
    .await;
    recover(ctx, result)
}

pub async fn exercise_edit<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    id: &str,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::EditExercise(id.to_string())) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let api = ctx.api();
        let exercise = api.get_exercise(id).await?;
        let mut form = ExerciseForm::from_exercise(&exercise);

        if !form.images.is_empty() {
            io.say(format!("Imágenes actuales: {}", form.images.join(", ")))?;
            if io.confirm("¿Quitar las imágenes actuales?")? {
                form.images.clear();
            }
        }
        fill_exercise_form(api, io, &mut form).await?;

        let payload = match form.validate() {
            Ok(payload) => payload,
            Err(e) => {
                io.say(e)?;
                return Ok(Outcome::Done);
            }
        };
        api.update_exercise(id, &payload)
            .await
            .context("No se pudo actualizar el ejercicio")?;
        io.say("Ejercicio actualizado.")?;
        Ok::<_, anyhow::Error>(Outcome::Redirect(Route::ExercisesOrder))
    }
    .await;
    recover(ctx, result)
}

pub async fn exercise_delete<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    id: &str,
    yes: bool,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::EditExercise(id.to_string())) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        if !yes && !io.confirm("¿Seguro que quieres eliminar este ejercicio?")? {
            return Ok(Outcome::Done);
        }
        ctx.api()
            .delete_exercise(id)
            .await
            .context("No se pudo eliminar el ejercicio")?;
        io.say("Ejercicio eliminado.")?;
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

pub async fn exercises_order<R: BufRead, W: Write>(ctx: &mut AppContext, io: &mut Console<R, W>) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::ExercisesOrder) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let api = ctx.api();
        let exercises = api.list_exercises().await.context("No se pudieron cargar los ejercicios")?;
        let categories = api.list_categories().await?;

        let mut last_category: Option<String> = None;
        for row in content::exercises_order(&exercises, &categories) {
            if last_category.as_deref() != Some(row.category.as_str()) {
                io.blank()?;
                io.say(&row.category)?;
                last_category = Some(row.category.clone());
            }
            let summary: String = row.problem.lines().next().unwrap_or("").chars().take(60).collect();
            io.say(format!(
                "  {:<8} {:>3}  {}  ({})",
                row.level.label(),
                row.order,
                summary,
                row.exercise_id
            ))?;
        }
        Ok::<_, anyhow::Error>(Outcome::Done)
    }
    .await;
    recover(ctx, result)
}

pub async fn upload<R: BufRead, W: Write>(
    ctx: &mut AppContext,
    io: &mut Console<R, W>,
    file: &Path,
) -> Result<Outcome> {
    if let Err(redirect) = ctx.enter(&Route::AddExercise) {
        return Ok(Outcome::Redirect(redirect));
    }

    let result = async {
        let uploaded = ctx
            .api()
            .upload_image(file)
            .await
            .with_context(|| format!("No se pudo subir {}", file.display()))?;
        io.say(uploaded.image_url)?;
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
    use axum::extract::Path as UrlPath;
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn categories_json() -> Value {
        json!([
            {"_id": "c1", "name": "Pilas", "type": "Estructura de datos"},
            {"_id": "c2", "name": "Ordenación", "type": "Algoritmo"}
        ])
    }

    async fn admin_context(app: Router) -> AppContext {
        let api = client_for(&spawn_server(app).await);
        api.session().set_token(&fake_token("a1", "admin", None)).unwrap();
        context(api)
    }

    #[tokio::test]
    async fn test_admin_routes_reject_plain_users() {
        let api = client_for(&spawn_server(Router::new()).await);
        api.session().set_token(&fake_token("u1", "user", None)).unwrap();
        let mut ctx = context(api);
        let mut io = console("");

        let outcome = categories(&mut ctx, &mut io, CategoryAction::List).await.unwrap();
        assert_eq!(outcome, Outcome::Redirect(Route::Home));
        let outcome = exercises_order(&mut ctx, &mut io).await.unwrap();
        assert_eq!(outcome, Outcome::Redirect(Route::Home));
    }

    #[tokio::test]
    async fn test_delete_category_in_use() {
        let app = Router::new()
            .route("/categories", get(|| async { Json(categories_json()) }))
            .route(
                "/categories/:id",
                delete(|| async { (StatusCode::BAD_REQUEST, "has children") }),
            );
        let mut ctx = admin_context(app).await;
        let mut io = console("");

        let action = CategoryAction::Delete { id: "c1".into() };
        assert_eq!(categories(&mut ctx, &mut io, action).await.unwrap(), Outcome::Done);
        let text = output(&io);
        assert!(text.contains(
            "No se puede eliminar la categoría porque hay tutoriales o ejercicios asociados."
        ));
        assert!(text.contains("  c1  Pilas"));
        assert!(text.contains("  c2  Ordenación"));
    }

    #[tokio::test]
    async fn test_exercise_add_posts_validated_payload() {
        let posted: Arc<Mutex<Option<Value>>> = Arc::default();
        let recorder = posted.clone();
        let app = Router::new()
            .route("/categories", get(|| async { Json(categories_json()) }))
            .route(
                "/exercises",
                post(move |Json(body): Json<Value>| {
                    let recorder = recorder.clone();
                    async move {
                        *recorder.lock().unwrap() = Some(body);
                        StatusCode::CREATED
                    }
                }),
            );
        let mut ctx = admin_context(app).await;

        let script = [
            "¿Qué estructura es LIFO?",
            ".",
            "1",
            "1",
            "Pila",
            "Cola",
            "",
            "https://cdn.example.org/pila.png",
            "",
            "Último en entrar, primero en salir",
        ]
        .join("\n")
            + "\n";
        let mut io = console(&script);

        let outcome = exercise_add(&mut ctx, &mut io).await.unwrap();
        assert_eq!(outcome, Outcome::Redirect(Route::Exercises));

        let body = posted.lock().unwrap().clone().unwrap();
        assert_eq!(body["problem"], "¿Qué estructura es LIFO?");
        assert_eq!(body["level"], 1);
        assert_eq!(body["category"], "c1");
        assert_eq!(body["correctAnswer"], "Pila");
        assert_eq!(body["incorrectAnswers"], json!(["Cola"]));
        assert_eq!(body["images"], json!(["https://cdn.example.org/pila.png"]));
    }

    #[tokio::test]
    async fn test_exercise_add_rejects_missing_incorrect_answer() {
        let posted: Arc<Mutex<bool>> = Arc::default();
        let recorder = posted.clone();
        let app = Router::new()
            .route("/categories", get(|| async { Json(categories_json()) }))
            .route(
                "/exercises",
                post(move || {
                    let recorder = recorder.clone();
                    async move {
                        *recorder.lock().unwrap() = true;
                        StatusCode::CREATED
                    }
                }),
            );
        let mut ctx = admin_context(app).await;
        let script = "Enunciado\n.\n2\nc2\nRespuesta\n\n\nExplicación\n";
        let mut io = console(script);

        assert_eq!(exercise_add(&mut ctx, &mut io).await.unwrap(), Outcome::Done);
        assert!(output(&io).contains("Debe haber al menos una respuesta incorrecta"));
        assert!(!*posted.lock().unwrap());
    }

    #[tokio::test]
    async fn test_exercises_order_groups_by_category() {
        let app = Router::new()
            .route("/categories", get(|| async { Json(categories_json()) }))
            .route(
                "/exercises",
                get(|| async {
                    Json(json!([
                        {"_id": "e2", "problem": "Segundo", "level": 2, "category": "c1",
                         "answers": {"correct": "a", "incorrect": ["b"]}, "order": 1},
                        {"_id": "e1", "problem": "Primero", "level": 1, "category": "c1",
                         "answers": {"correct": "a", "incorrect": ["b"]}, "order": 1},
                        {"_id": "e3", "problem": "Burbuja", "level": 1,
                         "category": {"_id": "c2", "name": "Ordenación", "type": "Algoritmo"},
                         "answers": {"correct": "a", "incorrect": ["b"]}, "order": 1}
                    ]))
                }),
            );
        let mut ctx = admin_context(app).await;
        let mut io = console("");

        exercises_order(&mut ctx, &mut io).await.unwrap();
        let text = output(&io);
        let ordenacion = text.find("Ordenación").unwrap();
        let pilas = text.find("Pilas").unwrap();
        let primero = text.find("Primero").unwrap();
        let segundo = text.find("Segundo").unwrap();
        assert!(ordenacion < pilas);
        assert!(pilas < primero && primero < segundo);
    }

    #[tokio::test]
    async fn test_tutorial_delete_asks_for_confirmation() {
        let deleted: Arc<Mutex<Vec<String>>> = Arc::default();
        let recorder = deleted.clone();
        let app = Router::new().route(
            "/tutorials/:id",
            delete(move |UrlPath(id): UrlPath<String>| {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(id);
                    StatusCode::OK
                }
            }),
        );
        let mut ctx = admin_context(app).await;

        let mut io = console("n\n");
        tutorial_delete(&mut ctx, &mut io, "t1", false).await.unwrap();
        assert!(deleted.lock().unwrap().is_empty());

        let mut io = console("s\n");
        tutorial_delete(&mut ctx, &mut io, "t1", false).await.unwrap();
        assert_eq!(*deleted.lock().unwrap(), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_tutorial_add_from_file() {
        let posted: Arc<Mutex<Option<Value>>> = Arc::default();
        let recorder = posted.clone();
        let app = Router::new().route(
            "/tutorials",
            post(move |Json(body): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    *recorder.lock().unwrap() = Some(body);
                    StatusCode::CREATED
                }
            }),
        );
        let mut ctx = admin_context(app).await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("grafos.md");
        std::fs::write(&file, "# Grafos\n\nBFS y DFS\n\n![bfs](https://cdn.example.org/bfs.png)").unwrap();
        let mut io = console("Grafos\n\n");

        let outcome = tutorial_add(&mut ctx, &mut io, Some(file)).await.unwrap();
        assert_eq!(outcome, Outcome::Redirect(Route::Tutorials));
        let body = posted.lock().unwrap().clone().unwrap();
        assert_eq!(body["title"], "Grafos");
        assert_eq!(body["content"], "# Grafos\n\nBFS y DFS\n\n![bfs](https://cdn.example.org/bfs.png)");
        let text = output(&io);
        assert!(text.contains("Imágenes en el contenido (1):"));
        assert!(text.contains("  https://cdn.example.org/bfs.png"));
        assert!(body.get("category").is_none());
    }

    #[tokio::test]
    async fn test_upload_prints_url() {
        let app = Router::new().route(
            "/upload",
            post(|| async { Json(json!({"imageUrl": "https://cdn.example.org/x.png"})) }),
        );
        let mut ctx = admin_context(app).await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.png");
        std::fs::write(&file, [1u8, 2, 3]).unwrap();
        let mut io = console("");

        upload(&mut ctx, &mut io, &file).await.unwrap();
        assert!(output(&io).contains("https://cdn.example.org/x.png"));
    }
}
