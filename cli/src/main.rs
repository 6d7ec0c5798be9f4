use clap::{Parser, Subcommand, ValueEnum};
use skillab::Config;
use skillab::ids::{IdentifierSpec, current_year};
use skillab::model::entity::{
    Lesson, LessonCreate, LessonStatus, School, SchoolCreate, UserEntity, UserEntityCreateUpdate,
};
use skillab::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use skillab::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for seeding the skill lab DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage schools
    School {
        #[command(subcommand)]
        action: SchoolCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Print sample identifiers without touching the DB
    Ids {
        #[arg(long, value_enum)]
        kind: IdKind,
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Academic year for class codes, e.g. 2025-2026
        #[arg(long, default_value = "")]
        academic_year: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum IdKind {
    Skill,
    Employee,
    Parent,
    Class,
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// SUPER_ADMIN, PROGRAM_COORDINATOR, SCHOOL_ADMIN, THINKING_COACH, STUDENT or PARENT
        #[arg(long, default_value = "SCHOOL_ADMIN")]
        role: String,
        #[arg(long)]
        email: Option<String>,
    },
}

/// School management
#[derive(Subcommand, Debug)]
pub enum SchoolCommands {
    Add {
        #[arg(long)]
        name: String,
        /// UDISE code
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "CBSE")]
        board: String,
        /// Username of the school admin account
        #[arg(long)]
        admin: Option<String>,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        competency: String,
        /// Path to an HTML file with the article body
        #[arg(long)]
        article: Option<String>,
        /// Path to a JSON file with quiz questions
        #[arg(long)]
        quiz: Option<String>,
        /// Video URL, may be repeated
        #[arg(long = "video")]
        videos: Vec<String>,
        #[arg(long, default_value_t = false)]
        publish: bool,
    },
}

fn invalid_input(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, message)
}

fn print_ids(kind: IdKind, count: usize, academic_year: &str) {
    let spec = match kind {
        IdKind::Skill => IdentifierSpec::skill_lab(current_year()),
        IdKind::Employee => IdentifierSpec::employee(current_year()),
        IdKind::Parent => IdentifierSpec::parent(),
        IdKind::Class => IdentifierSpec::class_code(academic_year, "9", "A"),
    };
    for _ in 0..count {
        println!("{}", spec.generate());
    }
}

#[tokio::main]
async fn main() -> skillab::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    if let Commands::Ids {
        kind,
        count,
        academic_year,
    } = &args.command
    {
        print_ids(*kind, *count, academic_year);
        return Ok(());
    }

    let database_uri = match std::env::var("DATABASE_URL") {
        Ok(uri) => uri,
        Err(_) => Config::get_or_init(true).await.app().database_uri().to_string(),
    };
    let db_con = DbConnection::connect(&database_uri)?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                password,
                role,
                email,
            } => {
                let role = UserRole::try_from(role.as_str()).map_err(invalid_input)?;
                let password_hash =
                    skillab::auth::hash_password(&password).map_err(DatabaseError::from)?;
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        username,
                        password_hash,
                        role,
                        email,
                    },
                )
                .await?;
                println!("User created: {:?}", user);
            }
        },

        Commands::School { action } => match action {
            SchoolCommands::Add {
                name,
                code,
                board,
                admin,
            } => {
                let school_admin_id = match admin {
                    Some(username) => {
                        let user = UserEntity::find_by_username(&mm, &actor, &username)
                            .await?
                            .ok_or_else(|| invalid_input(format!("no user `{username}`")))?;
                        Some(user.id())
                    }
                    None => None,
                };

                let school = School::create(
                    &mm,
                    &actor,
                    SchoolCreate {
                        school_admin_id,
                        school_name: name,
                        school_code: code,
                        board,
                        city: String::new(),
                        state: String::new(),
                        school_email: String::new(),
                        school_phone: String::new(),
                        principal_name: String::new(),
                        is_active: None,
                    },
                )
                .await?;
                println!("School created: {:?}", school);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                title,
                competency,
                article,
                quiz,
                videos,
                publish,
            } => {
                let article_content = match article {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => String::new(),
                };
                let quiz_data = match quiz {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => String::new(),
                };
                let video_urls = if videos.is_empty() {
                    String::new()
                } else {
                    serde_json::to_string(&videos).map_err(DatabaseError::from)?
                };

                let lesson = Lesson::create(
                    &mm,
                    &actor,
                    LessonCreate {
                        title,
                        competency,
                        video_urls,
                        article_content,
                        quiz_data,
                        status: if publish {
                            LessonStatus::Published
                        } else {
                            LessonStatus::Draft
                        },
                        ..Default::default()
                    },
                )
                .await?;
                println!(
                    "Lesson created as {}: {:?}",
                    lesson.primary_content_type(),
                    lesson
                );
            }
        },

        Commands::Ids { .. } => {}
    }

    Ok(())
}
