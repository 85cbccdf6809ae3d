use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    banned::is_permitted,
    dto::{CreateUserRequest, PageFilter, Pagination, PublicUser, UpdateUserRequest},
    repo::{UserStore, UserTx},
    repo_types::{NewUser, User},
};
use crate::{
    auth::{
        claims::Caller,
        password::hash_password,
        policy::{authorize, Action, Decision},
        role::Role,
    },
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("user {id} not found"))
}

/// Run the policy for `action` and, when it asks for one, the ban check.
async fn gate(
    tx: &mut dyn UserTx,
    caller: Caller,
    action: Action,
    target_id: i64,
) -> Result<(), AppError> {
    match authorize(caller.role, caller.id, action, target_id) {
        Decision::Allow => Ok(()),
        Decision::RequiresBanCheck => {
            if is_permitted(tx, caller.id, target_id).await? {
                Ok(())
            } else {
                warn!(caller = caller.id, target = target_id, ?action, "blocked by ban");
                Err(AppError::Authorization("you are banned by this user".into()))
            }
        }
        Decision::Deny(reason) => {
            warn!(caller = caller.id, target = target_id, ?action, reason, "denied");
            Err(AppError::Authorization(reason.into()))
        }
    }
}

fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

async fn create(
    store: &dyn UserStore,
    mut req: CreateUserRequest,
    role: Role,
) -> Result<User, AppError> {
    required("login", &req.login)?;
    required("email", &req.email)?;
    required("password", &req.password)?;
    required("secret_word", &req.secret_word)?;

    req.login = req.login.trim().to_string();
    req.email = req.email.trim().to_lowercase();
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("invalid email".into()));
    }

    let new_user = NewUser {
        login: req.login,
        email: req.email,
        password_hash: hash_password(&req.password)?,
        secret_word_hash: hash_password(&req.secret_word)?,
        role,
    };

    let mut tx = store.begin().await?;
    let user = tx.insert_user(new_user).await?;
    tx.commit().await?;

    info!(user_id = user.id, login = %user.login, role = ?user.role, "user created");
    Ok(user)
}

/// Self-service signup; always the lowest-privilege role.
pub async fn sign_up(store: &dyn UserStore, req: CreateUserRequest) -> Result<User, AppError> {
    create(store, req, Role::User).await
}

/// Admin endpoint creation with an explicit role.
pub async fn create_with_role(
    store: &dyn UserStore,
    caller: Caller,
    req: CreateUserRequest,
    role: Role,
) -> Result<User, AppError> {
    match authorize(caller.role, caller.id, Action::CreateWithRole(role), 0) {
        Decision::Allow => create(store, req, role).await,
        Decision::Deny(reason) => Err(AppError::Authorization(reason.into())),
        Decision::RequiresBanCheck => Err(AppError::Authorization("insufficient rights".into())),
    }
}

pub async fn read(store: &dyn UserStore, caller: Caller, id: i64) -> Result<User, AppError> {
    let mut tx = store.begin().await?;
    gate(&mut *tx, caller, Action::Read, id).await?;
    let user = tx.find_active(id).await?.ok_or_else(|| not_found(id))?;
    tx.commit().await?;
    Ok(user)
}

/// Only the visibility flags are writable here.
pub async fn update(
    store: &dyn UserStore,
    caller: Caller,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    let mut tx = store.begin().await?;
    tx.find_active(req.id).await?.ok_or_else(|| not_found(req.id))?;
    gate(&mut *tx, caller, Action::Update, req.id).await?;
    let user = tx
        .update_flags(req.id, req.find_vision, req.add_friend)
        .await?
        .ok_or_else(|| not_found(req.id))?;
    tx.commit().await?;

    info!(user_id = user.id, by = caller.id, "user updated");
    Ok(user)
}

pub async fn delete(store: &dyn UserStore, caller: Caller, id: i64) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    tx.find_active(id).await?.ok_or_else(|| not_found(id))?;
    gate(&mut *tx, caller, Action::Delete, id).await?;
    if !tx.soft_delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await?;

    info!(user_id = id, by = caller.id, "user deleted");
    Ok(())
}

/// Privileged callers see every active match; others only discoverable ones.
pub async fn find_by_login(
    store: &dyn UserStore,
    caller: Caller,
    fragment: &str,
) -> Result<Vec<User>, AppError> {
    let fragment = fragment.trim();
    required("login", fragment)?;

    let mut tx = store.begin().await?;
    let users = tx
        .search_login(fragment, !caller.role.is_privileged())
        .await?;
    tx.commit().await?;
    Ok(users)
}

/// Records the edge caller -> friend. Repeating it is a no-op.
pub async fn add_friend(
    store: &dyn UserStore,
    caller: Caller,
    friend_id: i64,
) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    gate(&mut *tx, caller, Action::AddFriend, friend_id).await?;
    let friend = tx
        .find_active(friend_id)
        .await?
        .ok_or_else(|| not_found(friend_id))?;
    if !friend.add_friend {
        return Err(AppError::Authorization("forbidden to add".into()));
    }
    tx.add_friend(caller.id, friend_id).await?;
    tx.commit().await?;

    info!(user_id = caller.id, friend_id, "friend added");
    Ok(())
}

pub async fn delete_friend(
    store: &dyn UserStore,
    caller: Caller,
    friend_id: i64,
) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    tx.remove_friend(caller.id, friend_id).await?;
    tx.commit().await?;

    info!(user_id = caller.id, friend_id, "friend removed");
    Ok(())
}

pub async fn list(
    store: &dyn UserStore,
    caller: Caller,
    filter: PageFilter,
) -> Result<Pagination, AppError> {
    if let Decision::Deny(reason) = authorize(caller.role, caller.id, Action::List, caller.id) {
        return Err(AppError::Authorization(reason.into()));
    }
    if filter.page_id < 1 || filter.page_size < 1 {
        return Err(AppError::Validation(
            "page_id and page_size must be at least 1".into(),
        ));
    }
    let offset = (filter.page_id - 1)
        .checked_mul(filter.page_size)
        .ok_or_else(|| AppError::Validation("page out of range".into()))?;

    let mut tx = store.begin().await?;
    let total_records = tx.count_active().await?;
    let rows = tx.list_active(filter.page_size, offset).await?;
    tx.commit().await?;

    Ok(Pagination {
        page_id: filter.page_id,
        page_size: filter.page_size,
        total_records,
        total_count: page_count(total_records, filter.page_size),
        records: rows.into_iter().map(PublicUser::from).collect(),
    })
}

fn page_count(total_records: i64, page_size: i64) -> i64 {
    if total_records <= 0 {
        return 0;
    }
    (total_records - 1) / page_size + 1
}

/// `caller` blocks `banned_id` from viewing or befriending them.
pub async fn ban(store: &dyn UserStore, caller: Caller, banned_id: i64) -> Result<(), AppError> {
    if banned_id == caller.id {
        return Err(AppError::Validation("cannot ban yourself".into()));
    }
    let mut tx = store.begin().await?;
    tx.find_active(banned_id)
        .await?
        .ok_or_else(|| not_found(banned_id))?;
    tx.upsert_ban(caller.id, banned_id).await?;
    tx.commit().await?;

    info!(user_id = caller.id, banned_id, "user banned");
    Ok(())
}

pub async fn unban(store: &dyn UserStore, caller: Caller, banned_id: i64) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    tx.lift_ban(caller.id, banned_id).await?;
    tx.commit().await?;

    info!(user_id = caller.id, banned_id, "user unbanned");
    Ok(())
}
