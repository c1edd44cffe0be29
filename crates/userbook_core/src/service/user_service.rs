//! User use-case service.
//!
//! # Responsibility
//! - Provide the CRUD entry points the presentation layer consumes.
//! - Resolve criteria-based update/delete into lookup + id-keyed write.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - A criteria miss is a no-op (`Ok(None)`), never an error.
//! - Log lines carry ids and counts only, never names or emails.

use crate::model::user::{NewUser, User, UserChange, UserCriteria, UserField, UserId};
use crate::repo::user_repo::{RepoResult, UserRepository};
use log::{info, warn};

/// Use-case service wrapper for user CRUD operations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a user from raw form input.
    ///
    /// Input is trimmed; blank fields are rejected before the store is
    /// touched.
    pub fn add_user(&self, name: &str, email: &str) -> RepoResult<UserId> {
        let user = NewUser::new(name.trim(), email.trim());
        let id = self.repo.insert_user(&user).inspect_err(|err| {
            warn!("event=user_add module=service status=error error={err}");
        })?;
        info!("event=user_add module=service status=ok user_id={id}");
        Ok(id)
    }

    pub fn list_users(&self) -> RepoResult<Vec<User>> {
        let users = self.repo.list_users()?;
        info!(
            "event=user_list module=service status=ok count={}",
            users.len()
        );
        Ok(users)
    }

    /// Returns the lowest-id user matching `criteria`.
    pub fn find_user(&self, criteria: &UserCriteria) -> RepoResult<Option<User>> {
        let found = self.repo.find_user(criteria)?;
        log_lookup("user_find", criteria.field(), found.as_ref());
        Ok(found)
    }

    /// Returns every user matching `criteria`, lowest id first.
    pub fn find_users(&self, criteria: &UserCriteria) -> RepoResult<Vec<User>> {
        self.repo.find_users(criteria)
    }

    /// Replaces the stored row with the same id.
    pub fn update_user(&self, user: &User) -> RepoResult<()> {
        self.repo.update_user(user)?;
        info!(
            "event=user_update module=service status=ok user_id={}",
            user.id
        );
        Ok(())
    }

    /// Removes the stored row with the same id.
    pub fn delete_user(&self, user: &User) -> RepoResult<()> {
        self.repo.delete_user(user)?;
        info!(
            "event=user_delete module=service status=ok user_id={}",
            user.id
        );
        Ok(())
    }

    /// Applies `change` to the lowest-id user matching `criteria`.
    ///
    /// Returns the updated row, or `None` when nothing matched.
    pub fn update_where(
        &self,
        criteria: &UserCriteria,
        change: &UserChange,
    ) -> RepoResult<Option<User>> {
        let Some(current) = self.repo.find_user(criteria)? else {
            log_lookup("user_update", criteria.field(), None);
            return Ok(None);
        };

        let updated = current.apply(change);
        self.update_user(&updated)?;
        Ok(Some(updated))
    }

    /// Deletes the lowest-id user matching `criteria`.
    ///
    /// Returns the removed row, or `None` when nothing matched.
    pub fn delete_where(&self, criteria: &UserCriteria) -> RepoResult<Option<User>> {
        let Some(current) = self.repo.find_user(criteria)? else {
            log_lookup("user_delete", criteria.field(), None);
            return Ok(None);
        };

        self.delete_user(&current)?;
        Ok(Some(current))
    }

    pub fn count_users(&self) -> RepoResult<u64> {
        self.repo.count_users()
    }
}

fn log_lookup(event: &str, field: UserField, found: Option<&User>) {
    match found {
        Some(user) => info!(
            "event={event} module=service status=ok criteria={} user_id={}",
            field.column(),
            user.id
        ),
        None => info!(
            "event={event} module=service status=not_found criteria={}",
            field.column()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::UserService;
    use crate::model::user::{NewUser, User, UserCriteria, UserId};
    use crate::repo::user_repo::{RepoError, RepoResult, UserRepository};
    use std::cell::RefCell;

    /// In-memory double that records the ids written through it.
    #[derive(Default)]
    struct MemoryRepo {
        rows: RefCell<Vec<User>>,
    }

    impl UserRepository for MemoryRepo {
        fn insert_user(&self, user: &NewUser) -> RepoResult<UserId> {
            user.validate()?;
            let mut rows = self.rows.borrow_mut();
            let id = rows.last().map_or(1, |last| last.id + 1);
            rows.push(user.clone().into_user(id));
            Ok(id)
        }

        fn list_users(&self) -> RepoResult<Vec<User>> {
            Ok(self.rows.borrow().clone())
        }

        fn find_user(&self, criteria: &UserCriteria) -> RepoResult<Option<User>> {
            Ok(self.find_users(criteria)?.into_iter().next())
        }

        fn find_users(&self, criteria: &UserCriteria) -> RepoResult<Vec<User>> {
            Ok(self
                .rows
                .borrow()
                .iter()
                .filter(|user| match criteria {
                    UserCriteria::Id(id) => user.id == *id,
                    UserCriteria::Name(name) => &user.name == name,
                    UserCriteria::Email(email) => &user.email == email,
                })
                .cloned()
                .collect())
        }

        fn update_user(&self, user: &User) -> RepoResult<()> {
            let mut rows = self.rows.borrow_mut();
            let row = rows
                .iter_mut()
                .find(|row| row.id == user.id)
                .ok_or(RepoError::NotFound(user.id))?;
            *row = user.clone();
            Ok(())
        }

        fn delete_user(&self, user: &User) -> RepoResult<()> {
            let mut rows = self.rows.borrow_mut();
            let before = rows.len();
            rows.retain(|row| row.id != user.id);
            if rows.len() == before {
                return Err(RepoError::NotFound(user.id));
            }
            Ok(())
        }

        fn count_users(&self) -> RepoResult<u64> {
            Ok(self.rows.borrow().len() as u64)
        }
    }

    #[test]
    fn add_user_trims_input() {
        let service = UserService::new(MemoryRepo::default());
        let id = service.add_user("  Alice ", " alice@x.com").unwrap();

        let user = service.find_user(&UserCriteria::Id(id)).unwrap().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@x.com");
    }

    #[test]
    fn add_user_rejects_blank_input_without_writing() {
        let service = UserService::new(MemoryRepo::default());
        let err = service.add_user("   ", "alice@x.com").unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert_eq!(service.count_users().unwrap(), 0);
    }

    #[test]
    fn criteria_miss_is_a_no_op() {
        let service = UserService::new(MemoryRepo::default());
        service.add_user("Alice", "alice@x.com").unwrap();

        let missing = UserCriteria::Name("Bob".to_string());
        assert_eq!(service.delete_where(&missing).unwrap(), None);
        assert_eq!(service.count_users().unwrap(), 1);
    }
}
