//! Personal access tokens: the bearer tokens API clients authenticate with.
//!
//! A token is shown to its owner once, as `<id>|<secret>`. Only the SHA-256
//! hash of the secret is stored.

use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, database_id::DatabaseId, user::UserID};

/// The database ID of a personal access token.
pub type TokenId = DatabaseId;

/// A freshly issued token.
///
/// `plain_text` cannot be recovered later, so it should be shown to the user
/// straight away.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    /// The token's row in the database.
    pub id: TokenId,
    /// The full token to send in the `Authorization: Bearer` header.
    pub plain_text: String,
}

/// Create the personal access token table.
///
/// Tokens are deleted along with their user.
pub fn create_personal_access_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS personal_access_token (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            last_used_at TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn hash_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// Issue a new token for `user_id`, labelled with `name`.
///
/// # Errors
/// Returns [Error::ConstraintViolation] if `user_id` does not belong to a user.
pub fn issue_token(user_id: UserID, name: &str, connection: &Connection) -> Result<IssuedToken, Error> {
    let secret = Uuid::new_v4().simple().to_string();

    connection.execute(
        "INSERT INTO personal_access_token (user_id, name, token_hash, created_at)
        VALUES (?1, ?2, ?3, ?4)",
        params![
            user_id.as_i64(),
            name,
            hash_secret(&secret),
            OffsetDateTime::now_utc()
        ],
    )?;

    let id = connection.last_insert_rowid();

    Ok(IssuedToken {
        id,
        plain_text: format!("{id}|{secret}"),
    })
}

/// Find the user that owns `token` and mark the token as used.
///
/// `token` may be the full `<id>|<secret>` form or just the secret.
///
/// # Errors
/// Returns [Error::Unauthorized] if no stored token matches.
pub fn find_token_owner(token: &str, connection: &Connection) -> Result<UserID, Error> {
    let found = match token.split_once('|') {
        Some((raw_id, secret)) => {
            let Ok(id) = raw_id.parse::<TokenId>() else {
                return Err(Error::Unauthorized);
            };

            connection
                .query_row(
                    "SELECT id, user_id FROM personal_access_token
                    WHERE id = ?1 AND token_hash = ?2",
                    params![id, hash_secret(secret)],
                    |row| Ok((row.get::<_, TokenId>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?
        }
        None => connection
            .query_row(
                "SELECT id, user_id FROM personal_access_token WHERE token_hash = ?1",
                params![hash_secret(token)],
                |row| Ok((row.get::<_, TokenId>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?,
    };

    let Some((token_id, user_id)) = found else {
        return Err(Error::Unauthorized);
    };

    connection.execute(
        "UPDATE personal_access_token SET last_used_at = ?1 WHERE id = ?2",
        params![OffsetDateTime::now_utc(), token_id],
    )?;

    Ok(UserID::new(user_id))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        Error, PasswordHash,
        auth::token::{find_token_owner, issue_token},
        initialize_db,
        user::{NewUser, User, UserID, create_user},
    };

    fn get_test_connection_and_user() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize_db(&conn).unwrap();
        let user = create_user(
            NewUser {
                name: "Alice".to_owned(),
                email: "alice@example.com".to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
            },
            &conn,
        )
        .unwrap();

        (conn, user)
    }

    #[test]
    fn issued_token_identifies_owner() {
        let (conn, user) = get_test_connection_and_user();

        let token = issue_token(user.id, "test", &conn).unwrap();

        assert_eq!(find_token_owner(&token.plain_text, &conn), Ok(user.id));
    }

    #[test]
    fn bare_secret_identifies_owner() {
        let (conn, user) = get_test_connection_and_user();
        let token = issue_token(user.id, "test", &conn).unwrap();
        let (_, secret) = token.plain_text.split_once('|').unwrap();

        assert_eq!(find_token_owner(secret, &conn), Ok(user.id));
    }

    #[test]
    fn plain_text_is_not_stored() {
        let (conn, user) = get_test_connection_and_user();
        let token = issue_token(user.id, "test", &conn).unwrap();
        let (_, secret) = token.plain_text.split_once('|').unwrap();

        let stored_hash: String = conn
            .query_row(
                "SELECT token_hash FROM personal_access_token WHERE id = ?1",
                [token.id],
                |row| row.get(0),
            )
            .unwrap();

        assert_ne!(stored_hash, secret);
        assert_eq!(stored_hash.len(), 64);
    }

    #[test]
    fn rejects_unknown_token() {
        let (conn, user) = get_test_connection_and_user();
        let token = issue_token(user.id, "test", &conn).unwrap();

        assert_eq!(find_token_owner("nope", &conn), Err(Error::Unauthorized));
        assert_eq!(
            find_token_owner(&format!("{}|wrongsecret", token.id), &conn),
            Err(Error::Unauthorized)
        );
        assert_eq!(
            find_token_owner("abc|wrongsecret", &conn),
            Err(Error::Unauthorized)
        );
    }

    #[test]
    fn secret_must_match_token_id() {
        let (conn, user) = get_test_connection_and_user();
        let first = issue_token(user.id, "first", &conn).unwrap();
        let second = issue_token(user.id, "second", &conn).unwrap();
        let (_, second_secret) = second.plain_text.split_once('|').unwrap();

        let result = find_token_owner(&format!("{}|{second_secret}", first.id), &conn);

        assert_eq!(result, Err(Error::Unauthorized));
    }

    #[test]
    fn records_last_use() {
        let (conn, user) = get_test_connection_and_user();
        let token = issue_token(user.id, "test", &conn).unwrap();

        find_token_owner(&token.plain_text, &conn).unwrap();

        let last_used_at: Option<OffsetDateTime> = conn
            .query_row(
                "SELECT last_used_at FROM personal_access_token WHERE id = ?1",
                [token.id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(last_used_at.is_some());
    }

    #[test]
    fn cannot_issue_token_for_missing_user() {
        let (conn, _) = get_test_connection_and_user();

        let result = issue_token(UserID::new(999), "test", &conn);

        assert_eq!(result, Err(Error::ConstraintViolation));
    }
}
