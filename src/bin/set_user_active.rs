use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use ledger_rs::{configure_db, deactivate_user, get_user_by_email, set_user_active};

/// A utility for activating or deactivating a registered user.
///
/// Deactivated users cannot log in, and their access and refresh tokens stop
/// working immediately.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The email of the user to update.
    #[arg(long)]
    email: String,

    /// Deactivate the user instead of activating them.
    #[arg(long, default_value_t = false)]
    deactivate: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }

    let mut connection = Connection::open(db_path)?;
    configure_db(&connection)?;

    let user = match get_user_by_email(&args.email, &connection) {
        Ok(user) => user,
        Err(error) => {
            eprintln!("Could not find user {}: {error}", args.email);
            exit(1);
        }
    };

    if args.deactivate {
        let revoked_count = deactivate_user(user.id, &mut connection)?;
        println!(
            "Deactivated {} and revoked {revoked_count} refresh tokens",
            user.email
        );
    } else {
        set_user_active(user.id, true, &connection)?;
        println!("Activated {}", user.email);
    }

    Ok(())
}
