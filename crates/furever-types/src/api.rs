use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub use crate::models::{ApplicationDetails as AdoptionRequest, PetDetails as AddPetRequest};

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub firstname: String,
    #[validate(length(max = 100))]
    pub middlename: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub lastname: String,
    #[validate(custom(function = "validate_in_past", message = "birthday must be in the past"))]
    pub birthday: DateTime<Utc>,
    #[validate(custom(function = "validate_mobile_number"))]
    pub mobilenum: String,
    #[validate(length(max = 250))]
    pub address: String,
    #[validate(range(max = 5))]
    pub pet_knowledge: u8,
    #[validate(range(max = 5))]
    pub stable_living: u8,
    #[validate(range(max = 5))]
    pub flex_time_sched: u8,
    #[validate(range(max = 5))]
    pub environment: u8,
    #[serde(with = "crate::b64")]
    #[validate(length(min = 1, message = "Profile photo must be provided"))]
    pub profile_photo: Vec<u8>,
}

impl RegisterRequest {
    /// Consume the request into the public view of the created account.
    /// The plaintext password is dropped here and never leaves the server.
    pub fn into_response(self, id: Uuid) -> UserResponse {
        UserResponse {
            id,
            username: self.username,
            email: self.email,
            firstname: self.firstname,
            middlename: self.middlename,
            lastname: self.lastname,
            birthday: self.birthday,
            mobilenum: self.mobilenum,
            address: self.address,
            pet_knowledge: self.pet_knowledge,
            stable_living: self.stable_living,
            flex_time_sched: self.flex_time_sched,
            environment: self.environment,
            profile_photo: self.profile_photo,
        }
    }
}

fn validate_in_past(value: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *value >= Utc::now() {
        return Err(ValidationError::new("birthday_in_future"));
    }
    Ok(())
}

/// Local mobile format: `09` followed by nine digits.
fn validate_mobile_number(value: &str) -> Result<(), ValidationError> {
    let valid = value.len() == 11
        && value.starts_with("09")
        && value.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(ValidationError::new("mobile_number"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub middlename: Option<String>,
    pub lastname: String,
    pub birthday: DateTime<Utc>,
    pub mobilenum: String,
    pub address: String,
    pub pet_knowledge: u8,
    pub stable_living: u8,
    pub flex_time_sched: u8,
    pub environment: u8,
    #[serde(with = "crate::b64")]
    pub profile_photo: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

// -- Profiles --

// User documents accept arbitrary fields through profile updates, so reads
// project loosely-typed values instead of assuming the registration schema.

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub bdate: Value,
    pub email: Value,
    pub address: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    pub birthday: Value,
    pub firstname: Value,
    pub lastname: Value,
    pub email: Value,
    pub mobilenum: Value,
    pub address: Value,
    pub pet_knowledge: Value,
    pub stable_living: Value,
    pub flex_time_sched: Value,
    pub environment: Value,
    pub profile_photo: Value,
}

/// The registration fields a profile update may rewrite, checked with the
/// same rules as `RegisterRequest`. Keys outside this set are ignored here
/// and stored untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub firstname: Option<String>,
    #[validate(length(max = 100))]
    pub middlename: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub lastname: Option<String>,
    #[validate(custom(function = "validate_in_past", message = "birthday must be in the past"))]
    pub birthday: Option<DateTime<Utc>>,
    #[validate(custom(function = "validate_mobile_number"))]
    pub mobilenum: Option<String>,
    #[validate(length(max = 250))]
    pub address: Option<String>,
    #[validate(range(max = 5))]
    pub pet_knowledge: Option<u8>,
    #[validate(range(max = 5))]
    pub stable_living: Option<u8>,
    #[validate(range(max = 5))]
    pub flex_time_sched: Option<u8>,
    #[validate(range(max = 5))]
    pub environment: Option<u8>,
    #[validate(custom(function = "validate_photo"))]
    pub profile_photo: Option<String>,
}

impl ProfileUpdate {
    /// Fields that registration requires, so an update may not clear them.
    pub const REQUIRED: &'static [&'static str] = &[
        "email",
        "firstname",
        "lastname",
        "birthday",
        "mobilenum",
        "address",
        "pet_knowledge",
        "stable_living",
        "flex_time_sched",
        "environment",
        "profile_photo",
    ];
}

fn validate_photo(value: &str) -> Result<(), ValidationError> {
    match crate::b64::decode(value) {
        Ok(bytes) if !bytes.is_empty() => Ok(()),
        _ => Err(ValidationError::new("profile_photo")),
    }
}

// -- Posts --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    #[validate(length(min = 1))]
    pub sharedpost: String,
    pub date_posted: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub post_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PostsResponse<T> {
    pub posts: Vec<T>,
}
