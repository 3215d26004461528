//! Recompute every recipe and meal total
//! Usage: cargo run --bin recalculate_all -- [--user <id>]

use nutritrack::config::{self, Config};
use nutritrack::db::{migrations, Database};
use nutritrack::tools::status;

fn parse_user(args: &[String]) -> Result<Option<i64>, String> {
    match args {
        [] => Ok(None),
        [flag, id] if flag == "--user" => id
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid user id: {}", id)),
        _ => Err("Usage: recalculate_all [--user <id>]".to_string()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    config::init_logging(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let user_id = parse_user(&args)?;

    println!("Database: {}", config.database_path.display());
    let database = Database::with_pool_size(&config.database_path, 1)?;
    database.with_conn(migrations::run_migrations)?;

    let report = status::recalculate_all(&database, user_id)?;

    println!("Recipes recalculated: {}", report.recipes_recalculated.len());
    println!("Meals recalculated:   {}", report.meals_recalculated.len());
    for failure in &report.failures {
        println!("  Skipped {} {}: {}", failure.entity, failure.id, failure.error);
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_user() {
        assert_eq!(parse_user(&args(&[])).unwrap(), None);
        assert_eq!(parse_user(&args(&["--user", "7"])).unwrap(), Some(7));
        assert!(parse_user(&args(&["--user", "x"])).is_err());
        assert!(parse_user(&args(&["7"])).is_err());
    }
}
