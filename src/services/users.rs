//! User provisioning and listing.
//!
//! Users are created on first successful sign-in and never updated or
//! deleted through the API. The listing exposes subject ids only.

use serde::Serialize;

use crate::error::ApiError;
use crate::identity::VerifiedIdentity;
use crate::store::docs::UserDoc;
use crate::store::{Datastore, Kind, Predicate};

#[derive(Debug, Serialize)]
pub struct UserEntry {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserEntry>,
}

pub async fn list_users(store: &Datastore) -> Result<UserList, ApiError> {
    let users = store.list_all::<UserDoc>(Kind::User).await?;
    let users = users
        .into_iter()
        .map(|user| UserEntry { user_id: user.doc.user_id })
        .collect();
    Ok(UserList { users })
}

/// Looks up the account for a verified subject, creating it on first
/// sign-in. Returns the stored account (existing name wins over the
/// token's display name).
pub async fn ensure_user(
    store: &Datastore,
    identity: &VerifiedIdentity,
) -> Result<UserDoc, ApiError> {
    let predicate = Predicate::eq(&["user_id"], identity.sub.as_str());
    if let Some(existing) = store.find_one::<UserDoc>(Kind::User, &predicate).await? {
        return Ok(existing.doc);
    }

    let doc = UserDoc {
        name: identity.name.clone().unwrap_or_else(|| identity.sub.clone()),
        user_id: identity.sub.clone(),
    };
    store.insert(Kind::User, &doc).await?;
    tracing::info!(subject = %doc.user_id, "provisioned new user account");
    Ok(doc)
}
