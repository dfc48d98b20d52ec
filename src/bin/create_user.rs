use std::{
    error::Error,
    fmt::Display,
    io,
    path::{Path, PathBuf},
    process::exit,
};

use clap::Parser;
use rusqlite::Connection;

use finrec::{NewUser, PasswordHash, ValidatedPassword, create_user, initialize_db, issue_token};

/// A utility for registering a user and issuing them an API token.
///
/// The token is printed once and authenticates requests to `GET /user` via
/// the `Authorization: Bearer <token>` header.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: PathBuf,

    /// The user's display name.
    #[arg(long)]
    name: String,

    /// The user's email address.
    #[arg(long)]
    email: String,

    /// A label for the issued token, e.g. the client that will use it.
    #[arg(long, default_value = "cli")]
    token_name: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    validate_db_path(&args.db_path);

    println!("Creating user {} <{}>", args.name, args.email);

    let password_hash = match get_new_password_hash(&[args.name.as_str(), args.email.as_str()]) {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    let conn = Connection::open(&args.db_path)?;
    initialize_db(&conn)?;

    let transaction = conn.unchecked_transaction()?;

    let user = match create_user(
        NewUser {
            name: args.name,
            email: args.email,
            password_hash,
        },
        &transaction,
    ) {
        Ok(user) => user,
        Err(finrec::Error::ConstraintViolation) => {
            print_error("A user with that email address already exists.");
            exit(1);
        }
        Err(error) => return Err(error.into()),
    };

    let token = issue_token(user.id, &args.token_name, &transaction)?;
    transaction.commit()?;

    println!("Created user with ID {}.", user.id);
    println!();
    println!("API token (shown only once, store it somewhere safe):");
    println!("{}", token.plain_text);

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    if db_path.extension().is_none_or(|extension| extension.is_empty()) {
        print_error("The database path needs a file extension, e.g. 'finrec.db'.");
        exit(1);
    }
}

/// Ask for a password until the user enters a strong one twice.
///
/// Returns `None` if stdin closes or cannot be read.
fn get_new_password_hash(user_inputs: &[&str]) -> Option<PasswordHash> {
    loop {
        println!();

        let password = read_password("Enter a password: ")?;
        let validated_password = match ValidatedPassword::new(&password, user_inputs) {
            Ok(validated_password) => validated_password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        if read_password("Enter the same password again: ")? != password {
            print_error("The passwords did not match, try again.");
            continue;
        }

        match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => print_error(format!("Could not hash the password ({error}), try again.")),
        }
    }
}

fn read_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(password) => Some(password),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read the password: {error}"));
            None
        }
    }
}

/// Print `message` to stderr in bold red.
fn print_error(message: impl Display) {
    eprintln!("\x1b[31;1mError: {message}\x1b[0m");
}
