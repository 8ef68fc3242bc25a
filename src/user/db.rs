//! Database operations for user credentials.

use rusqlite::{Connection, OptionalExtension};

use crate::{
    Error,
    user::hashing::{hash_secret, hash_with_new_salt, verify_secret},
};

const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "123456";
const DEFAULT_SECURITY_QUESTION: &str = "系统初始安全问题（请尽快修改）";
const DEFAULT_SECURITY_ANSWER: &str = "admin";

pub(crate) fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_credential (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                password_salt TEXT NOT NULL,
                security_question TEXT NOT NULL,
                security_answer_hash TEXT NOT NULL,
                security_answer_salt TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
        (),
    )?;

    Ok(())
}

/// Insert the default user if no credential row exists for it yet.
pub(crate) fn seed_default_user(connection: &Connection) -> Result<(), Error> {
    let exists = user_exists(connection, DEFAULT_USERNAME)?;
    if exists {
        return Ok(());
    }

    let (password_hash, password_salt) = hash_with_new_salt(DEFAULT_PASSWORD)?;
    let (answer_hash, answer_salt) = hash_with_new_salt(DEFAULT_SECURITY_ANSWER)?;

    connection.execute(
        "INSERT INTO user_credential
            (username, password_hash, password_salt,
             security_question, security_answer_hash, security_answer_salt)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            DEFAULT_USERNAME,
            password_hash,
            password_salt,
            DEFAULT_SECURITY_QUESTION,
            answer_hash,
            answer_salt,
        ),
    )?;

    tracing::info!("seeded default user \"{DEFAULT_USERNAME}\"");

    Ok(())
}

/// Whether a credential row exists for `username`.
pub fn user_exists(connection: &Connection, username: &str) -> Result<bool, Error> {
    let row: Option<i64> = connection
        .query_row(
            "SELECT 1 FROM user_credential WHERE username = :username",
            &[(":username", username)],
            |row| row.get(0),
        )
        .optional()?;

    Ok(row.is_some())
}

/// The username of the first credential row, used as the fallback when an
/// operation has no session to attribute itself to.
pub fn any_username(connection: &Connection) -> Result<String, Error> {
    let username: Option<String> = connection
        .query_row("SELECT username FROM user_credential LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()))
}

/// Check `password` against the stored hash for `username`.
///
/// Unknown usernames verify as false rather than erroring, so the caller
/// cannot distinguish a missing user from a wrong password.
pub fn verify_password(
    connection: &Connection,
    username: &str,
    password: &str,
) -> Result<bool, Error> {
    let row: Option<(String, String)> = connection
        .query_row(
            "SELECT password_hash, password_salt FROM user_credential WHERE username = :username",
            &[(":username", username)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((hash, salt)) => verify_secret(&hash, &salt, password),
        None => Ok(false),
    }
}

/// Overwrite the stored password hash and salt for `username`, creating the
/// row (with the default security question) if it does not exist.
///
/// The new hash is read back and re-verified before the transaction
/// commits; a mismatch rolls the whole write back. This guards against
/// encoding corruption between what was written and what will later be
/// compared at login.
pub fn set_password(connection: &Connection, username: &str, password: &str) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    let (new_hash, new_salt) = hash_with_new_salt(password)?;

    let updated = transaction.execute(
        "UPDATE user_credential
            SET password_hash = ?1, password_salt = ?2, updated_at = CURRENT_TIMESTAMP
            WHERE username = ?3",
        (&new_hash, &new_salt, username),
    )?;

    if updated == 0 {
        let (answer_hash, answer_salt) = hash_with_new_salt(DEFAULT_SECURITY_ANSWER)?;
        transaction.execute(
            "INSERT INTO user_credential
                (username, password_hash, password_salt,
                 security_question, security_answer_hash, security_answer_salt)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                username,
                &new_hash,
                &new_salt,
                DEFAULT_SECURITY_QUESTION,
                answer_hash,
                answer_salt,
            ),
        )?;
    }

    // Read back what was actually stored and recompute before committing.
    let (stored_hash, stored_salt): (String, String) = transaction.query_row(
        "SELECT password_hash, password_salt FROM user_credential WHERE username = :username",
        &[(":username", username)],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    if hash_secret(password, &stored_salt)? != stored_hash {
        tracing::error!("password for {username} failed read-back verification, rolling back");
        return Err(Error::CredentialReadBackFailed);
    }

    transaction.commit()?;

    Ok(())
}

/// The security question for `username`, or `None` for unknown users.
pub fn security_question(connection: &Connection, username: &str) -> Result<Option<String>, Error> {
    let question = connection
        .query_row(
            "SELECT security_question FROM user_credential WHERE username = :username",
            &[(":username", username)],
            |row| row.get(0),
        )
        .optional()?;

    Ok(question)
}

/// Check `answer` against the stored security answer hash for `username`.
pub fn verify_security_answer(
    connection: &Connection,
    username: &str,
    answer: &str,
) -> Result<bool, Error> {
    let row: Option<(String, String)> = connection
        .query_row(
            "SELECT security_answer_hash, security_answer_salt
                FROM user_credential WHERE username = :username",
            &[(":username", username)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((hash, salt)) => verify_secret(&hash, &salt, answer),
        None => Ok(false),
    }
}

/// Replace the security question and answer for `username`, hashing the
/// answer with the same discipline as passwords.
pub fn set_security_question(
    connection: &Connection,
    username: &str,
    question: &str,
    answer: &str,
) -> Result<(), Error> {
    let (answer_hash, answer_salt) = hash_with_new_salt(answer)?;

    let updated = connection.execute(
        "UPDATE user_credential
            SET security_question = ?1, security_answer_hash = ?2,
                security_answer_salt = ?3, updated_at = CURRENT_TIMESTAMP
            WHERE username = ?4",
        (question, answer_hash, answer_salt, username),
    )?;

    if updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod credential_tests {
    use rusqlite::Connection;

    use super::{
        security_question, set_password, set_security_question, user_exists,
        verify_password, verify_security_answer,
    };
    use crate::{Error, db::initialize};

    fn init_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn default_user_verifies_with_default_password() {
        let conn = init_db();

        assert!(verify_password(&conn, "admin", "123456").unwrap());
        assert!(!verify_password(&conn, "admin", "wrongpw").unwrap());
    }

    #[test]
    fn unknown_user_fails_closed() {
        let conn = init_db();

        assert!(!verify_password(&conn, "nobody", "123456").unwrap());
    }

    #[test]
    fn set_password_then_verify_round_trip() {
        let conn = init_db();

        set_password(&conn, "admin", "newpw123").unwrap();

        assert!(verify_password(&conn, "admin", "newpw123").unwrap());
        assert!(!verify_password(&conn, "admin", "123456").unwrap());
        assert!(!verify_password(&conn, "admin", "wrongpw").unwrap());
    }

    #[test]
    fn set_password_creates_missing_user() {
        let conn = init_db();

        set_password(&conn, "guest", "letmein99").unwrap();

        assert!(user_exists(&conn, "guest").unwrap());
        assert!(verify_password(&conn, "guest", "letmein99").unwrap());
        assert!(
            security_question(&conn, "guest").unwrap().is_some(),
            "new users should get the default security question"
        );
    }

    #[test]
    fn set_password_regenerates_salt() {
        let conn = init_db();
        let old_salt: String = conn
            .query_row(
                "SELECT password_salt FROM user_credential WHERE username = 'admin'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        set_password(&conn, "admin", "newpw123").unwrap();

        let new_salt: String = conn
            .query_row(
                "SELECT password_salt FROM user_credential WHERE username = 'admin'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_ne!(old_salt, new_salt);
    }

    #[test]
    fn security_answer_round_trip() {
        let conn = init_db();

        set_security_question(&conn, "admin", "最喜欢的城市？", "杭州").unwrap();

        assert_eq!(
            security_question(&conn, "admin").unwrap().as_deref(),
            Some("最喜欢的城市？")
        );
        assert!(verify_security_answer(&conn, "admin", "杭州").unwrap());
        assert!(!verify_security_answer(&conn, "admin", "上海").unwrap());
    }

    #[test]
    fn set_security_question_fails_for_unknown_user() {
        let conn = init_db();

        let result = set_security_question(&conn, "nobody", "q", "a");

        assert_eq!(result, Err(Error::NotFound));
    }
}
