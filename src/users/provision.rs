use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::model::{NewUser, Role, User, UserPatch};
use crate::{
    auth::password::hash_password,
    store::{RecordStore, StoreError},
    upsert::{upsert, Upserted},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("invalid email `{0}`")]
    InvalidEmail(String),
    #[error("a password is required to create `{0}`")]
    MissingPassword(String),
    #[error("a role is required to create `{0}`")]
    MissingRole(String),
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Desired state of an account.
///
/// `password` is only consumed when the account does not exist yet; reruns
/// against an existing account never rotate it. `role` is required to create
/// an account and left untouched on reruns that omit it.
#[derive(Debug, Clone)]
pub struct ProvisionUser {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
    pub verified: bool,
}

#[instrument(skip(store, req), fields(email = %req.email, role = ?req.role))]
pub async fn provision_user<S>(store: &S, req: ProvisionUser) -> Result<Upserted<User>, ProvisionError>
where
    S: RecordStore<User> + ?Sized,
{
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(ProvisionError::InvalidEmail(email));
    }

    let patch = UserPatch {
        name: None,
        role: req.role,
        mark_verified: req.verified,
    };

    let ProvisionUser {
        name,
        role,
        password,
        verified,
        ..
    } = req;
    let create_email = email.clone();
    let create = move || -> Result<NewUser, ProvisionError> {
        let role = role.ok_or_else(|| ProvisionError::MissingRole(create_email.clone()))?;
        let password = password.ok_or_else(|| ProvisionError::MissingPassword(create_email.clone()))?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ProvisionError::WeakPassword);
        }
        let password_hash =
            hash_password(&password).map_err(|e| ProvisionError::Hash(e.to_string()))?;
        Ok(NewUser {
            email: create_email,
            name,
            password_hash,
            role,
            email_verified: verified.then(OffsetDateTime::now_utc),
        })
    };

    let out = upsert::<User, _, _, _>(store, &email, &patch, create).await?;
    info!(
        user_id = %out.record.id,
        disposition = %out.disposition,
        "user provisioned"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::verify_password, store::MemoryStore, upsert::Disposition};

    fn request(email: &str, role: Role) -> ProvisionUser {
        ProvisionUser {
            email: email.into(),
            name: Some("Admin".into()),
            role: Some(role),
            password: Some("correct-horse-battery".into()),
            verified: false,
        }
    }

    #[tokio::test]
    async fn absent_account_is_created_with_admin_role() {
        let store = MemoryStore::<User>::new();
        let out = provision_user(&store, request("admin@example.org", Role::Admin))
            .await
            .expect("provision");

        assert_eq!(out.disposition, Disposition::Created);
        assert_eq!(store.len().await, 1);
        let stored = store.get(&"admin@example.org".to_string()).await.unwrap();
        assert_eq!(stored.role, Role::Admin);
        assert_eq!(stored.name.as_deref(), Some("Admin"));
    }

    #[tokio::test]
    async fn rerun_takes_update_branch_and_keeps_one_record() {
        let store = MemoryStore::<User>::new();
        provision_user(&store, request("admin@example.org", Role::Admin))
            .await
            .unwrap();
        let again = provision_user(&store, request("admin@example.org", Role::Admin))
            .await
            .unwrap();

        assert_eq!(again.disposition, Disposition::Updated);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn stored_hash_is_salted_and_verifies() {
        let store = MemoryStore::<User>::new();
        let a = provision_user(&store, request("a@example.org", Role::User))
            .await
            .unwrap()
            .record;
        let b = provision_user(&store, request("b@example.org", Role::User))
            .await
            .unwrap()
            .record;

        assert_ne!(a.password_hash, "correct-horse-battery");
        assert_ne!(a.password_hash, b.password_hash);
        assert!(verify_password("correct-horse-battery", &a.password_hash).unwrap());
    }

    #[tokio::test]
    async fn update_changes_only_patched_fields() {
        let store = MemoryStore::<User>::new();
        let before = provision_user(&store, request("ed@example.org", Role::User))
            .await
            .unwrap()
            .record;

        let mut req = request("ed@example.org", Role::Editor);
        req.name = Some("Renamed".into());
        req.password = Some("another-password".into());
        let after = provision_user(&store, req).await.unwrap().record;

        assert_eq!(after.role, Role::Editor);
        assert_eq!(after.id, before.id);
        assert_eq!(after.email, before.email);
        assert_eq!(after.name, before.name);
        assert_eq!(after.password_hash, before.password_hash);
        assert_eq!(after.email_verified, before.email_verified);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn verified_flag_stamps_existing_account() {
        let store = MemoryStore::<User>::new();
        provision_user(&store, request("v@example.org", Role::User))
            .await
            .unwrap();
        let mut req = request("v@example.org", Role::User);
        req.verified = true;
        let out = provision_user(&store, req).await.unwrap();
        assert!(out.record.email_verified.is_some());
    }

    #[tokio::test]
    async fn email_is_normalized_before_lookup() {
        let store = MemoryStore::<User>::new();
        provision_user(&store, request("  Admin@Example.ORG ", Role::Admin))
            .await
            .unwrap();
        let out = provision_user(&store, request("admin@example.org", Role::Admin))
            .await
            .unwrap();
        assert_eq!(out.disposition, Disposition::Updated);
    }

    #[tokio::test]
    async fn rerun_without_role_keeps_existing_role() {
        let store = MemoryStore::<User>::new();
        provision_user(&store, request("admin@example.org", Role::Admin))
            .await
            .unwrap();

        let mut req = request("admin@example.org", Role::User);
        req.role = None;
        req.verified = true;
        let out = provision_user(&store, req).await.unwrap();

        assert_eq!(out.disposition, Disposition::Updated);
        assert_eq!(out.record.role, Role::Admin);
        assert!(out.record.email_verified.is_some());
    }

    #[tokio::test]
    async fn creation_without_role_is_rejected() {
        let store = MemoryStore::<User>::new();
        let mut req = request("norole@example.org", Role::User);
        req.role = None;
        let err = provision_user(&store, req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::MissingRole(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn creation_without_password_is_rejected() {
        let store = MemoryStore::<User>::new();
        let mut req = request("nopass@example.org", Role::User);
        req.password = None;
        let err = provision_user(&store, req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::MissingPassword(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let store = MemoryStore::<User>::new();
        let mut req = request("short@example.org", Role::User);
        req.password = Some("short".into());
        let err = provision_user(&store, req).await.unwrap_err();
        assert!(matches!(err, ProvisionError::WeakPassword));
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_storage() {
        let store = MemoryStore::<User>::new();
        store.set_unavailable(true);
        let err = provision_user(&store, request("not-an-email", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn unavailable_storage_is_distinct_from_missing_record() {
        let store = MemoryStore::<User>::new();
        store.set_unavailable(true);
        let err = provision_user(&store, request("admin@example.org", Role::Admin))
            .await
            .unwrap_err();
        match err {
            ProvisionError::Store(e) => assert!(e.is_unavailable()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
