use std::{
    error::Error,
    io::{self},
    path::Path,
    process::exit,
};

use clap::Parser;
use rusqlite::Connection;

use myfinance::{PasswordHash, ValidatedPassword, get_user_by_email, update_password};

/// A utility for changing the password of a registered user.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The email the user registered with.
    #[arg(long)]
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let connection = Connection::open(db_path)?;
    let email = args.email.trim().to_lowercase();
    let user = match get_user_by_email(&email, &connection) {
        Ok(user) => user,
        Err(error) => {
            print_error(format!("Could not find a user with the email {email}: {error}"));
            exit(1);
        }
    };
    println!("Resetting password for {} ({})", user.username, user.email);

    let Some(password_hash) = get_new_password_hash() else {
        return Ok(());
    };
    update_password(user.id, &password_hash, &connection)?;
    println!("Password updated.");

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    if db_path.extension().is_none_or(|extension| extension.is_empty()) {
        print_error("Database path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if !db_path.is_file() {
        print_error(format!("File does not exist at {db_path:#?}!"));
        exit(1);
    }
}

fn prompt(message: &str) -> Option<String> {
    match rpassword::prompt_password(message) {
        Ok(string) => Some(string),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn get_new_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = prompt("Enter a new password: ")?;

        let validated = match ValidatedPassword::new(&first_password) {
            Ok(validated) => validated,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = prompt("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(validated, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => print_error(format!("Could not hash password: {error}. Try again.")),
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string());
}
