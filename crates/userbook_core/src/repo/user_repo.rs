//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide typed CRUD APIs over the `users` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate the payload before any SQL mutation.
//! - Lookups by criteria resolve to the lowest matching id.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::user::{NewUser, User, UserCriteria, UserId, UserValidationError};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const USER_SELECT_SQL: &str = "SELECT id, name, email FROM users";
const USERS_TABLE: &str = "users";
const USERS_COLUMNS: &[&str] = &["id", "name", "email"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(UserValidationError),
    Db(DbError),
    NotFound(UserId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    fn insert_user(&self, user: &NewUser) -> RepoResult<UserId>;
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn find_user(&self, criteria: &UserCriteria) -> RepoResult<Option<User>>;
    fn find_users(&self, criteria: &UserCriteria) -> RepoResult<Vec<User>>;
    fn update_user(&self, user: &User) -> RepoResult<()>;
    fn delete_user(&self, user: &User) -> RepoResult<()>;
    fn count_users(&self) -> RepoResult<u64>;
}

/// SQLite-backed user repository borrowing an opened connection.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Wraps a connection after checking it carries the current schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   was tampered with.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_version(conn)?;
        if actual_version < expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let columns = table_columns(conn, USERS_TABLE)?;
        if columns.is_empty() {
            return Err(RepoError::MissingRequiredTable(USERS_TABLE));
        }
        if let Some(column) = USERS_COLUMNS
            .iter()
            .copied()
            .find(|required| !columns.iter().any(|name| name == *required))
        {
            return Err(RepoError::MissingRequiredColumn {
                table: USERS_TABLE,
                column,
            });
        }

        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert_user(&self, user: &NewUser) -> RepoResult<UserId> {
        user.validate()?;

        self.conn.execute(
            "INSERT OR REPLACE INTO users (name, email) VALUES (?1, ?2);",
            params![user.name.as_str(), user.email.as_str()],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();

        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }

    fn find_user(&self, criteria: &UserCriteria) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL} WHERE {} = ?1 ORDER BY id ASC LIMIT 1;",
            criteria.field().column()
        ))?;

        let mut rows = stmt.query([criteria_value(criteria)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }

        Ok(None)
    }

    fn find_users(&self, criteria: &UserCriteria) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL} WHERE {} = ?1 ORDER BY id ASC;",
            criteria.field().column()
        ))?;

        let mut rows = stmt.query([criteria_value(criteria)])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        Ok(users)
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        let changed = self.conn.execute(
            "UPDATE users SET name = ?1, email = ?2 WHERE id = ?3;",
            params![user.name.as_str(), user.email.as_str(), user.id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(user.id));
        }

        Ok(())
    }

    fn delete_user(&self, user: &User) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [user.id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(user.id));
        }

        Ok(())
    }

    fn count_users(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

fn criteria_value(criteria: &UserCriteria) -> Value {
    match criteria {
        UserCriteria::Id(id) => Value::Integer(*id),
        UserCriteria::Name(name) => Value::Text(name.clone()),
        UserCriteria::Email(email) => Value::Text(email.clone()),
    }
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: UserId = row.get("id")?;
    let name: Option<String> = row.get("name")?;
    let email: Option<String> = row.get("email")?;

    let (Some(name), Some(email)) = (name, email) else {
        return Err(RepoError::InvalidData(format!(
            "null name or email in users row {id}"
        )));
    };

    let user = User { id, name, email };
    user.validate()
        .map_err(|err| RepoError::InvalidData(format!("users row {id}: {err}")))?;
    Ok(user)
}
