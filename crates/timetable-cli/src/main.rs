mod config;
mod render;
mod schedule_cmds;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use timetable_db::config::DbConfig;
use timetable_db::pool;

use config::TimetableConfig;

#[derive(Parser)]
#[command(name = "timetable", about = "School timetable schedule caches")]
struct Cli {
    /// Database URL (overrides TIMETABLE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a timetable config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and apply migrations
    DbInit,
    /// Rebuild every class group and teacher cache of a school year
    Rebuild {
        #[arg(long)]
        school_year: i32,
        /// Day to resolve periods and assignments against (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Show the weekly schedule of a class group
    ClassSchedule {
        /// Class group ID
        class_group_id: String,
        /// Day to resolve periods and assignments against (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Print the cached JSON payload instead of a grid
        #[arg(long)]
        json: bool,
    },
    /// Show the weekly schedule of a teacher
    TeacherSchedule {
        /// Teacher ID
        teacher_id: String,
        /// Day to resolve periods and assignments against (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Print the cached JSON payload instead of a grid
        #[arg(long)]
        json: bool,
    },
    /// List the time slots of a school year
    Slots {
        #[arg(long)]
        school_year: i32,
    },
}

/// Execute `timetable init`: write the config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
            max_connections: None,
        },
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `timetable db-init` to create and migrate the database.");
    Ok(())
}

/// Execute `timetable db-init`: create the database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = TimetableConfig::resolve(cli_db_url);

    println!("Initializing timetable database...");
    pool::ensure_database_exists(&resolved.db_config).await?;

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;
    println!("timetable db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Rebuild { school_year, today } => {
            let resolved = TimetableConfig::resolve(cli.database_url.as_deref());
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = schedule_cmds::run_rebuild(&db_pool, school_year, today).await;
            db_pool.close().await;
            result?;
        }
        Commands::ClassSchedule {
            class_group_id,
            today,
            json,
        } => {
            let resolved = TimetableConfig::resolve(cli.database_url.as_deref());
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                schedule_cmds::run_class_schedule(&db_pool, &class_group_id, today, json).await;
            db_pool.close().await;
            result?;
        }
        Commands::TeacherSchedule {
            teacher_id,
            today,
            json,
        } => {
            let resolved = TimetableConfig::resolve(cli.database_url.as_deref());
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                schedule_cmds::run_teacher_schedule(&db_pool, &teacher_id, today, json).await;
            db_pool.close().await;
            result?;
        }
        Commands::Slots { school_year } => {
            let resolved = TimetableConfig::resolve(cli.database_url.as_deref());
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = schedule_cmds::run_slots(&db_pool, school_year).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that touch process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rebuild_parses_today() {
        let cli = Cli::try_parse_from([
            "timetable",
            "rebuild",
            "--school-year",
            "2026",
            "--today",
            "2026-03-10",
        ])
        .unwrap();
        match cli.command {
            Commands::Rebuild { school_year, today } => {
                assert_eq!(school_year, 2026);
                assert_eq!(today, NaiveDate::from_ymd_opt(2026, 3, 10));
            }
            _ => panic!("expected rebuild"),
        }
    }

    #[test]
    fn class_schedule_takes_global_database_url() {
        let cli = Cli::try_parse_from([
            "timetable",
            "class-schedule",
            "6f1c2b9e-0000-4000-8000-000000000001",
            "--json",
            "--database-url",
            "postgresql://localhost/school",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://localhost/school"));
        assert!(matches!(
            cli.command,
            Commands::ClassSchedule { json: true, today: None, .. }
        ));
    }
}
