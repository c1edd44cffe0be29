//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the user CRUD surface to Dart via FRB.
//! - Resolve UI labels (`ID|Name|Email`) into typed criteria at the boundary.
//! - Flatten every outcome into a response envelope with a UI message.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Store-touching functions are non-`sync`, so FRB runs them on its worker
//!   pool instead of the UI isolate thread.
//! - Exactly one store is open at a time; the host opens it at startup and
//!   closes it on shutdown.

use log::warn;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use userbook_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    RepoResult, SqliteUserService, User, UserChange, UserCriteria, UserField, UserStore,
};

const MSG_FILL_BOTH_FIELDS: &str = "Please fill in both fields.";
const MSG_FILL_UPDATE_FIELDS: &str = "Please fill in all fields for update.";
const MSG_MISSING_CRITERIA_VALUE: &str = "Please provide a value for criteria.";
const MSG_NOT_FOUND: &str = "No user found with the provided criteria.";

static ACTIVE_STORE: Mutex<Option<Arc<UserStore>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Idempotent for the same `level + log_dir`; conflicting calls fail.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One user row as rendered by the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<User> for UserItem {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Envelope for add/update/delete calls.
///
/// `ok` reports whether the call completed without error. A criteria miss is
/// `ok = true` with `user_id = None` and a not-found message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserActionResponse {
    pub ok: bool,
    /// Id of the row that was inserted, updated or removed.
    pub user_id: Option<i64>,
    pub message: String,
}

impl UserActionResponse {
    fn success(message: impl Into<String>, user_id: i64) -> Self {
        Self {
            ok: true,
            user_id: Some(user_id),
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self {
            ok: true,
            user_id: None,
            message: MSG_NOT_FOUND.to_string(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            user_id: None,
            message: message.into(),
        }
    }
}

/// Envelope for the full list refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListResponse {
    pub ok: bool,
    /// Rows in ascending id order.
    pub items: Vec<UserItem>,
    pub message: String,
}

/// Envelope for single-user lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLookupResponse {
    pub ok: bool,
    /// `None` with `ok = true` means nothing matched.
    pub user: Option<UserItem>,
    pub message: String,
}

impl UserLookupResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            user: None,
            message: message.into(),
        }
    }
}

/// Opens the process-wide user store at `db_path`.
///
/// # FFI contract
/// - Async call (file I/O and migrations).
/// - Idempotent for the path that is already open.
/// - Rejects a different path until `store_close` is called.
/// - Returns empty string on success and error message on failure.
pub fn store_open(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);

    let Ok(mut active) = ACTIVE_STORE.lock() else {
        return "store registry lock is poisoned".to_string();
    };

    if let Some(store) = active.as_ref() {
        if store.path() == Some(requested.as_path()) && store.is_open() {
            return String::new();
        }
        let current = store
            .path()
            .map_or_else(|| "<memory>".to_string(), |path| path.display().to_string());
        return format!(
            "user store already open at `{current}`; refusing to switch to `{}`",
            requested.display()
        );
    }

    match UserStore::open(&requested) {
        Ok(store) => {
            *active = Some(Arc::new(store));
            String::new()
        }
        Err(err) => {
            warn!("event=store_open module=ffi status=error error={err}");
            format!("store_open failed: {err}")
        }
    }
}

/// Closes the process-wide user store.
///
/// # FFI contract
/// - Async call.
/// - Closing when no store is open is a no-op.
/// - Returns empty string on success and error message on failure; on
///   failure the store stays registered and usable.
pub fn store_close() -> String {
    let Ok(mut active) = ACTIVE_STORE.lock() else {
        return "store registry lock is poisoned".to_string();
    };
    let Some(store) = active.take() else {
        return String::new();
    };

    match store.close() {
        Ok(()) => String::new(),
        Err(err) => {
            *active = Some(store);
            format!("store_close failed: {err}")
        }
    }
}

/// Adds a user from the two form fields.
///
/// # FFI contract
/// - Async call, DB-backed execution.
/// - Blank fields are rejected before the store is touched.
/// - Returns the generated id on success.
pub fn users_add(name: String, email: String) -> UserActionResponse {
    if name.trim().is_empty() || email.trim().is_empty() {
        return UserActionResponse::failure(MSG_FILL_BOTH_FIELDS);
    }

    match with_user_service("users_add", |service| service.add_user(&name, &email)) {
        Ok(id) => UserActionResponse::success("User added.", id),
        Err(err) => UserActionResponse::failure(format!("users_add failed: {err}")),
    }
}

/// Lists all users for the list view.
pub fn users_list() -> UserListResponse {
    match with_user_service("users_list", |service| service.list_users()) {
        Ok(users) => {
            let items = users.into_iter().map(UserItem::from).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No users.".to_string()
            } else {
                format!("{} user(s).", items.len())
            };
            UserListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => UserListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("users_list failed: {err}"),
        },
    }
}

/// Looks up one user by `criteria` label (`ID|Name|Email`) and raw `value`.
///
/// Duplicate matches resolve to the lowest id.
pub fn users_find(criteria: String, value: String) -> UserLookupResponse {
    let criteria = match resolve_criteria(&criteria, &value) {
        Ok(criteria) => criteria,
        Err(message) => return UserLookupResponse::failure(message),
    };

    match with_user_service("users_find", |service| service.find_user(&criteria)) {
        Ok(Some(user)) => UserLookupResponse {
            ok: true,
            user: Some(user.into()),
            message: "User found.".to_string(),
        },
        Ok(None) => UserLookupResponse {
            ok: true,
            user: None,
            message: MSG_NOT_FOUND.to_string(),
        },
        Err(err) => UserLookupResponse::failure(format!("users_find failed: {err}")),
    }
}

/// Replaces `field` (`Name|Email`) of the user located by `criteria`/`value`.
pub fn users_update(
    criteria: String,
    value: String,
    field: String,
    new_value: String,
) -> UserActionResponse {
    if new_value.trim().is_empty() {
        return UserActionResponse::failure(MSG_FILL_UPDATE_FIELDS);
    }
    let criteria = match resolve_criteria(&criteria, &value) {
        Ok(criteria) => criteria,
        Err(message) => return UserActionResponse::failure(message),
    };
    let Some(target) = UserField::parse_label(&field) else {
        return UserActionResponse::failure(format!("unknown update field `{}`", field.trim()));
    };
    let Some(change) = UserChange::for_field(target, new_value.trim()) else {
        return UserActionResponse::failure("User id cannot be updated.");
    };

    match with_user_service("users_update", |service| {
        service.update_where(&criteria, &change)
    }) {
        Ok(Some(user)) => UserActionResponse::success("User updated.", user.id),
        Ok(None) => UserActionResponse::not_found(),
        Err(err) => UserActionResponse::failure(format!("users_update failed: {err}")),
    }
}

/// Deletes the user located by `criteria`/`value`.
pub fn users_delete(criteria: String, value: String) -> UserActionResponse {
    let criteria = match resolve_criteria(&criteria, &value) {
        Ok(criteria) => criteria,
        Err(message) => return UserActionResponse::failure(message),
    };

    match with_user_service("users_delete", |service| service.delete_where(&criteria)) {
        Ok(Some(user)) => UserActionResponse::success("User deleted.", user.id),
        Ok(None) => UserActionResponse::not_found(),
        Err(err) => UserActionResponse::failure(format!("users_delete failed: {err}")),
    }
}

fn resolve_criteria(label: &str, value: &str) -> Result<UserCriteria, String> {
    let field = UserField::parse_label(label)
        .ok_or_else(|| format!("unknown criteria `{}`", label.trim()))?;
    if value.trim().is_empty() {
        return Err(MSG_MISSING_CRITERIA_VALUE.to_string());
    }
    UserCriteria::from_field(field, value).map_err(|err| err.to_string())
}

fn active_store() -> Result<Arc<UserStore>, String> {
    let active = ACTIVE_STORE
        .lock()
        .map_err(|_| "store registry lock is poisoned".to_string())?;
    active
        .as_ref()
        .map(Arc::clone)
        .ok_or_else(|| "user store is not open; call store_open first".to_string())
}

fn with_user_service<T>(
    op: &'static str,
    f: impl FnOnce(&SqliteUserService<'_>) -> RepoResult<T>,
) -> Result<T, String> {
    let store = active_store()?;
    store.with_service(f).map_err(|err| {
        warn!("event=ffi_call module=ffi op={op} status=error error={err}");
        err.to_string()
    })
}
