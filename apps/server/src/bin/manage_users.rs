//! CLI tool to manage user roles.
//!
//! Usage:
//!   cargo run --bin manage-users -- list
//!   cargo run --bin manage-users -- promote --email <email>
//!   cargo run --bin manage-users -- demote --email <email>

use std::env;

use street_reports_lib::config::Config;
use street_reports_lib::db::{DbPool, users};
use street_reports_lib::models::UserRole;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    match command.as_str() {
        "list" | "ls" => list_users(&pool).await,
        "promote" => {
            let email = parse_email_arg(&args);
            set_role(&pool, &email, UserRole::Admin).await;
        }
        "demote" => {
            let email = parse_email_arg(&args);
            set_role(&pool, &email, UserRole::Citizen).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_email_arg(args: &[String]) -> String {
    let mut i = 2;
    while i < args.len() {
        if (args[i] == "--email" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
        i += 1;
    }
    eprintln!("Error: --email is required");
    std::process::exit(1);
}

async fn list_users(pool: &DbPool) {
    let all = match users::list(pool.connection()).await {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Error listing users: {}", e);
            std::process::exit(1);
        }
    };

    if all.is_empty() {
        println!("No users found.");
        return;
    }

    println!();
    println!(
        "{:<36} {:<32} {:<24} {:<8} {:<20}",
        "ID", "EMAIL", "NAME", "ROLE", "LAST LOGIN"
    );
    println!("{}", "-".repeat(124));

    for user in all {
        let name: String = if user.full_name.chars().count() > 22 {
            let short: String = user.full_name.chars().take(19).collect();
            format!("{}...", short)
        } else {
            user.full_name.clone()
        };
        let last_login = user
            .last_login_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "{:<36} {:<32} {:<24} {:<8} {:<20}",
            user.id, user.email, name, user.role, last_login
        );
    }
    println!();
}

async fn set_role(pool: &DbPool, email: &str, role: UserRole) {
    match users::set_role_by_email(pool.connection(), email, role).await {
        Ok(true) => {
            println!("User {} is now {}.", email, role);
        }
        Ok(false) => {
            eprintln!("No user with email {}. They must sign in once first.", email);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error updating role: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: manage-users <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  list, ls                  List all users");
    eprintln!("  promote --email <email>   Grant the admin role");
    eprintln!("  demote --email <email>    Revoke the admin role");
    eprintln!("  help                      Show this help");
    eprintln!();
    eprintln!("Demotion applies to status changes immediately; other session data refreshes at the next sign-in.");
    eprintln!();
}
