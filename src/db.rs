//! Database initialization for the application.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, audit, gift, ledger, owner, user};

/// Create the application tables and indexes, and seed the default category
/// taxonomy and the default user.
///
/// Safe to call on every startup; existing tables and rows are left alone.
///
/// # Errors
/// Returns an error if the schema cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    gift::db::create_table(&transaction)?;
    ledger::db::create_table(&transaction)?;
    ledger::category::create_table(&transaction)?;
    user::db::create_table(&transaction)?;
    audit::db::create_table(&transaction)?;
    owner::create_table(&transaction)?;

    // Seeding only touches empty tables, see the respective functions.
    ledger::category::seed_defaults(&transaction)?;
    user::db::seed_default_user(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let category_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM account_category", [], |row| {
                row.get(0)
            })
            .unwrap();
        // 11 expense + 3 income categories, seeded exactly once.
        assert_eq!(category_count, 14);
    }

    #[test]
    fn initialize_seeds_default_user() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();

        let user_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_credential WHERE username = 'admin'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(user_count, 1);
    }
}
