use anyhow::Context;
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use furever_db::Database;
use furever_types::api::{
    MessageResponse, ProfileUpdate, RegisterRequest, UserDetails, UserResponse, UserSummary,
};

use crate::error::ApiError;
use crate::password;

/// Keys that identify the document and may not be rewritten by a profile update.
const KEY_FIELDS: &[&str] = &["username", "id", "_id"];

const MIN_PASSWORD_LEN: usize = 8;

pub fn register(db: &Database, req: RegisterRequest) -> Result<UserResponse, ApiError> {
    req.validate()?;

    let digest = password::hash(&req.password)?;
    let mut doc = serde_json::to_value(&req).context("Failed to encode user document")?;
    doc["password"] = Value::String(digest);

    let id = Uuid::new_v4();
    if !db.create_user(&id.to_string(), &req.username, &doc)? {
        warn!("Registration rejected, username '{}' is taken", req.username);
        return Err(ApiError::bad_request("Username already exists"));
    }

    info!("Registered user {}", req.username);
    Ok(req.into_response(id))
}

/// True only when the user exists and the password matches its digest.
pub fn login(db: &Database, username: &str, plain: &str) -> Result<bool, ApiError> {
    let Some(user) = db.get_user_by_username(username)? else {
        return Ok(false);
    };

    Ok(user
        .password_hash()
        .is_some_and(|digest| password::verify(plain, digest)))
}

pub fn get_user_summary(db: &Database, username: &str) -> Result<UserSummary, ApiError> {
    let user = db
        .get_user_by_username(username)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(UserSummary {
        bdate: user.field("birthday"),
        email: user.field("email"),
        address: user.field("address"),
    })
}

pub fn get_user_details(db: &Database, username: &str) -> Result<UserDetails, ApiError> {
    let user = db
        .get_user_by_username(username)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(UserDetails {
        birthday: user.field("birthday"),
        firstname: user.field("firstname"),
        lastname: user.field("lastname"),
        email: user.field("email"),
        mobilenum: user.field("mobilenum"),
        address: user.field("address"),
        pet_knowledge: user.field("pet_knowledge"),
        stable_living: user.field("stable_living"),
        flex_time_sched: user.field("flex_time_sched"),
        environment: user.field("environment"),
        profile_photo: user.field("profile_photo"),
    })
}

/// Merge `fields` into the user's document. Registration fields are checked
/// with the registration rules; unknown fields are stored as-is.
/// Succeeds only when the store reports exactly one modified document.
pub fn update_user_details(
    db: &Database,
    username: &str,
    mut fields: Map<String, Value>,
) -> Result<MessageResponse, ApiError> {
    if let Some(key) = KEY_FIELDS.iter().find(|k| fields.contains_key(**k)) {
        return Err(ApiError::bad_request(format!("Field '{}' cannot be updated", key)));
    }
    validate_profile_fields(&fields)?;

    if let Some(new_password) = fields.get("password") {
        let plain = new_password
            .as_str()
            .filter(|p| p.chars().count() >= MIN_PASSWORD_LEN)
            .ok_or_else(|| {
                ApiError::bad_request(format!(
                    "password must be a string of at least {} characters",
                    MIN_PASSWORD_LEN
                ))
            })?;
        let digest = password::hash(plain)?;
        fields.insert("password".into(), Value::String(digest));
    }

    match db.update_user_fields(username, &fields)? {
        1 => {
            info!("Updated profile of {} ({} fields)", username, fields.len());
            Ok(MessageResponse::new("User details updated successfully"))
        }
        _ => Err(ApiError::bad_request("Failed to update user details")),
    }
}

fn validate_profile_fields(fields: &Map<String, Value>) -> Result<(), ApiError> {
    if let Some(key) = ProfileUpdate::REQUIRED
        .iter()
        .find(|k| fields.get(**k).is_some_and(Value::is_null))
    {
        return Err(ApiError::bad_request(format!("Field '{}' cannot be null", key)));
    }

    let update: ProfileUpdate = serde_json::from_value(Value::Object(fields.clone()))
        .map_err(|e| ApiError::bad_request(format!("Invalid profile field: {}", e)))?;
    update.validate()?;
    Ok(())
}
