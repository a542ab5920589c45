use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use dsa_tutor::commands::admin::{self, CategoryAction};
use dsa_tutor::commands::{self, AppContext, Console, Outcome};
use dsa_tutor::config::{AppConfig, ConfigOverrides, API_URL_ENV};
use dsa_tutor::models::CategoryType;
use dsa_tutor::services::auth::Route;
use dsa_tutor::services::content::MoveDirection;
use dsa_tutor::services::{ApiClient, AuthContext, SessionStore};
use dsa_tutor::utils;

#[derive(Parser)]
#[command(name = "dsa-tutor")]
#[command(about = "Tutoriales, ejercicios y desafíos de estructuras de datos y algoritmos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL
    #[arg(long, env = API_URL_ENV, value_name = "URL")]
    api_url: Option<String>,

    /// Data directory (session, config, log)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Iniciar sesión
    Login {
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Crear una cuenta
    Register {
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Iniciar sesión con una credencial de Google
    GoogleLogin { credential: Option<String> },
    /// Cerrar sesión
    Logout,
    /// Usuario actual
    Whoami,
    /// Listar tutoriales
    Tutorials,
    /// Leer un tutorial
    Tutorial {
        id: String,
        /// Mostrar el HTML renderizado
        #[arg(long)]
        html: bool,
    },
    /// Mover un tutorial arriba o abajo (admin)
    TutorialMove {
        id: String,
        #[arg(value_parser = parse_direction)]
        direction: MoveDirection,
    },
    /// Categorías y progreso
    Exercises,
    /// Practicar los ejercicios de una categoría
    Practice {
        category: String,
        /// Empezar por un ejercicio concreto
        #[arg(long)]
        exercise: Option<String>,
    },
    /// Modo desafío
    Challenge,
    /// Gestionar categorías (admin)
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesCommand>,
    },
    /// Crear un tutorial (admin)
    TutorialAdd {
        /// Leer el contenido Markdown de un archivo
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Editar un tutorial (admin)
    TutorialEdit {
        id: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Eliminar un tutorial (admin)
    TutorialDelete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Crear un ejercicio (admin)
    ExerciseAdd,
    /// Editar un ejercicio (admin)
    ExerciseEdit { id: String },
    /// Eliminar un ejercicio (admin)
    ExerciseDelete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Orden de los ejercicios por categoría (admin)
    ExercisesOrder,
    /// Subir una imagen (admin)
    Upload { file: PathBuf },
}

#[derive(Subcommand)]
enum CategoriesCommand {
    List,
    Add {
        name: String,
        #[arg(value_parser = parse_category_type)]
        category_type: CategoryType,
    },
    Rename { id: String, name: String },
    Delete { id: String },
}

fn parse_direction(value: &str) -> Result<MoveDirection, String> {
    MoveDirection::parse(value).ok_or_else(|| format!("'{}' no es 'up' ni 'down'", value))
}

fn parse_category_type(value: &str) -> Result<CategoryType, String> {
    CategoryType::parse(value).ok_or_else(|| {
        format!(
            "tipo desconocido '{}' (usa '{}' o '{}')",
            value,
            CategoryType::Algorithm,
            CategoryType::DataStructure
        )
    })
}

fn setup_logging(config: &AppConfig) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(config.log_level_filter())
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("hyper_util", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Warn)
                .chain(io::stderr()),
        )
        .chain(fern::log_file(utils::get_log_path(&config.data_dir))?)
        .apply()
        .context("Failed to initialize logger")?;
    Ok(())
}

async fn dispatch(command: Commands, ctx: &mut AppContext) -> Result<Outcome> {
    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());
    let io = &mut console;
    let mut rng = StdRng::from_entropy();

    match command {
        Commands::Login { username, password } => {
            commands::auth::login(ctx, io, username, password).await
        }
        Commands::Register { username, password } => {
            commands::auth::register(ctx, io, username, password).await
        }
        Commands::GoogleLogin { credential } => commands::auth::google_login(ctx, io, credential).await,
        Commands::Logout => commands::auth::logout(ctx, io),
        Commands::Whoami => commands::auth::whoami(ctx, io),
        Commands::Tutorials => commands::tutorials::list(ctx, io).await,
        Commands::Tutorial { id, html } => commands::tutorials::show(ctx, io, &id, html).await,
        Commands::TutorialMove { id, direction } => {
            commands::tutorials::move_tutorial(ctx, io, &id, direction).await
        }
        Commands::Exercises => commands::exercises::overview(ctx, io).await,
        Commands::Practice { category, exercise } => {
            commands::exercises::practice(ctx, io, &category, exercise.as_deref(), &mut rng).await
        }
        Commands::Challenge => commands::challenge::run(ctx, io, &mut rng).await,
        Commands::Categories { action } => {
            let action = match action.unwrap_or(CategoriesCommand::List) {
                CategoriesCommand::List => CategoryAction::List,
                CategoriesCommand::Add { name, category_type } => CategoryAction::Add { name, category_type },
                CategoriesCommand::Rename { id, name } => CategoryAction::Rename { id, name },
                CategoriesCommand::Delete { id } => CategoryAction::Delete { id },
            };
            admin::categories(ctx, io, action).await
        }
        Commands::TutorialAdd { file } => admin::tutorial_add(ctx, io, file).await,
        Commands::TutorialEdit { id, file } => admin::tutorial_edit(ctx, io, &id, file).await,
        Commands::TutorialDelete { id, yes } => admin::tutorial_delete(ctx, io, &id, yes).await,
        Commands::ExerciseAdd => admin::exercise_add(ctx, io).await,
        Commands::ExerciseEdit { id } => admin::exercise_edit(ctx, io, &id).await,
        Commands::ExerciseDelete { id, yes } => admin::exercise_delete(ctx, io, &id, yes).await,
        Commands::ExercisesOrder => admin::exercises_order(ctx, io).await,
        Commands::Upload { file } => admin::upload(ctx, io, &file).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(ConfigOverrides {
        api_url: cli.api_url,
        data_dir: cli.data_dir,
        config_file: cli.config,
        verbose: cli.verbose,
    })?;

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
    setup_logging(&config)?;
    log::info!(
        "dsa-tutor {} on {} using {}",
        env!("CARGO_PKG_VERSION"),
        utils::get_platform(),
        config.api_url
    );

    let session = SessionStore::open(&utils::get_session_db_path(&config.data_dir))?;
    let api = ApiClient::new(
        &config.api_url,
        Duration::from_secs(config.request_timeout_secs),
        session,
    )?;
    let mut ctx = AppContext::new(AuthContext::restore(api), config);

    match dispatch(cli.command, &mut ctx).await? {
        Outcome::Done => {}
        Outcome::Redirect(Route::Login) => {
            println!("→ {}: inicia sesión con `dsa-tutor login`", Route::Login);
        }
        Outcome::Redirect(Route::Home) if ctx.auth.user().is_some_and(|u| !u.is_admin()) => {
            println!("→ {}: esta página es solo para administradores", Route::Home);
        }
        Outcome::Redirect(route) => println!("→ {}", route),
    }
    Ok(())
}
