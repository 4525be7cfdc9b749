use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest, UpdateProfileRequest},
        repo_types::{NewUser, ProfileChanges, PublicUser},
    },
    error::AppError,
    state::AppState,
};

const USERNAME_BASE_MAX_LEN: usize = 20;
const FALLBACK_USERNAME: &str = "user";
const SEQUENTIAL_SUFFIX_PROBES: u32 = 50;
const RANDOM_SUFFIX_PROBES: u32 = 10;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value, or `None` when missing or blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid_credentials() -> AppError {
    AppError::Auth("Invalid email or password".into())
}

/// Lowercase, keep `[a-z0-9_]`. `None` if nothing survives.
pub fn normalize_username(raw: &str) -> Option<String> {
    let normalized: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    (!normalized.is_empty()).then_some(normalized)
}

/// Base candidate for a name-derived username: lowercase `[a-z0-9]`, at most
/// 20 characters, `"user"` when nothing is left.
pub fn username_base(name: &str) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(USERNAME_BASE_MAX_LEN)
        .collect();
    if base.is_empty() {
        FALLBACK_USERNAME.to_string()
    } else {
        base
    }
}

/// How `PUT /user` decides the username. An explicit username always wins;
/// otherwise a given name regenerates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernamePlan {
    Explicit(String),
    DeriveFromName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePlan {
    pub name: Option<String>,
    pub username: UsernamePlan,
}

impl ProfilePlan {
    pub fn decide(name: Option<String>, username: Option<String>) -> Result<Self, AppError> {
        let name = non_blank(name);
        let username = non_blank(username);

        let plan = match (username, name) {
            (Some(raw), name) => {
                let normalized = normalize_username(&raw)
                    .ok_or_else(|| AppError::Validation("Invalid username".into()))?;
                ProfilePlan {
                    name,
                    username: UsernamePlan::Explicit(normalized),
                }
            }
            (None, Some(name)) => ProfilePlan {
                username: UsernamePlan::DeriveFromName(name.clone()),
                name: Some(name),
            },
            (None, None) => {
                return Err(AppError::Validation(
                    "At least one of name or username is required".into(),
                ))
            }
        };
        Ok(plan)
    }
}

async fn hash_password(st: &AppState, password: String) -> Result<String, AppError> {
    let passwords = st.passwords.clone();
    let hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;
    Ok(hash)
}

async fn verify_password(st: &AppState, password: String, hash: String) -> Result<bool, AppError> {
    let passwords = st.passwords.clone();
    let ok = tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;
    Ok(ok)
}

pub async fn register(st: &AppState, req: RegisterRequest) -> Result<PublicUser, AppError> {
    let (Some(email), Some(password)) = (non_blank(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::Validation("Email and password are required".into()));
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("User with this email already exists".into()));
    }

    let username = match non_blank(req.username) {
        Some(raw) => {
            let username = normalize_username(&raw)
                .ok_or_else(|| AppError::Validation("Invalid username".into()))?;
            if st.users.find_by_username(&username).await?.is_some() {
                warn!(username = %username, "username already taken");
                return Err(AppError::Conflict("Username is already taken".into()));
            }
            Some(username)
        }
        None => None,
    };

    let password_hash = hash_password(st, password).await?;

    let user = st
        .users
        .create(NewUser {
            id: Uuid::new_v4(),
            email,
            username,
            name: non_blank(req.name),
            password_hash,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.into())
}

/// Returns the session token and the public view of the user.
pub async fn login(st: &AppState, req: LoginRequest) -> Result<(String, PublicUser), AppError> {
    let (Some(email), Some(password)) = (non_blank(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::Validation("Email and password are required".into()));
    };

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(st, password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let token = st
        .jwt
        .sign(user.id, &user.email)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(user_id = %user.id, "user logged in");
    Ok((token, user.into()))
}

pub async fn resolve_identity(st: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    match st.users.find_by_id(user_id).await? {
        Some(user) => Ok(user.into()),
        None => {
            warn!(user_id = %user_id, "token subject no longer exists");
            Err(AppError::NotFound("User not found".into()))
        }
    }
}

/// Free username derived from `name`. A candidate already held by `owner`
/// counts as free, so re-saving the same name keeps the current username.
pub async fn derive_username(
    st: &AppState,
    name: &str,
    owner: Option<Uuid>,
) -> Result<String, AppError> {
    let base = username_base(name);

    if username_is_free(st, &base, owner).await? {
        return Ok(base);
    }
    for suffix in 1..=SEQUENTIAL_SUFFIX_PROBES {
        let candidate = format!("{base}{suffix}");
        if username_is_free(st, &candidate, owner).await? {
            return Ok(candidate);
        }
    }

    warn!(base = %base, "sequential username suffixes exhausted, trying random ones");
    for _ in 0..RANDOM_SUFFIX_PROBES {
        let suffix: u32 = rand::thread_rng().gen_range(1_000..1_000_000);
        let candidate = format!("{base}{suffix}");
        if username_is_free(st, &candidate, owner).await? {
            return Ok(candidate);
        }
    }

    Err(AppError::Conflict("Could not find a free username".into()))
}

/// Best-effort probe; the unique constraint settles races at write time.
async fn username_is_free(
    st: &AppState,
    candidate: &str,
    owner: Option<Uuid>,
) -> Result<bool, AppError> {
    let free = match st.users.find_by_username(candidate).await? {
        None => true,
        Some(user) => Some(user.id) == owner,
    };
    Ok(free)
}

pub async fn update_profile(
    st: &AppState,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<PublicUser, AppError> {
    let plan = ProfilePlan::decide(req.name, req.username)?;

    let username = match plan.username {
        UsernamePlan::Explicit(username) => {
            if let Some(owner) = st.users.find_by_username(&username).await? {
                if owner.id != user_id {
                    warn!(user_id = %user_id, username = %username, "username already taken");
                    return Err(AppError::Conflict("Username is already taken".into()));
                }
            }
            username
        }
        UsernamePlan::DeriveFromName(name) => derive_username(st, &name, Some(user_id)).await?,
    };
    debug!(user_id = %user_id, username = %username, "profile update planned");

    let changes = ProfileChanges {
        name: plan.name,
        username: Some(username),
        updated_at: OffsetDateTime::now_utc(),
    };
    let user = st
        .users
        .update_profile(user_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "profile updated");
    Ok(user.into())
}
