use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Female => f.write_str("Female"),
            Sex::Male => f.write_str("Male"),
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Female" => Ok(Sex::Female),
            "Male" => Ok(Sex::Male),
            other => Err(format!("unknown sex '{}'", other)),
        }
    }
}

// -- Pets --

/// Body of a pet document, exactly as the owner submitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PetDetails {
    #[validate(length(min = 1, max = 100))]
    pub pet_name: String,
    #[validate(range(min = 1))]
    pub pet_age: Option<u32>,
    pub sex: Option<Sex>,
    #[validate(length(min = 1, max = 100))]
    pub location: String,
    pub description: Option<String>,
    #[serde(with = "crate::b64")]
    #[validate(length(min = 1, message = "Pet photo must be provided"))]
    pub pet_photo: Vec<u8>,
    #[validate(length(min = 1))]
    pub username: String,
}

/// Full pet record as returned by single-pet and per-owner lookups.
#[derive(Debug, Clone, Serialize)]
pub struct Pet {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: PetDetails,
    pub created_at: DateTime<Utc>,
}

/// Listing projection: the only fields the browse view receives.
#[derive(Debug, Clone, Serialize)]
pub struct PetListing {
    pub id: Uuid,
    pub pet_name: String,
    pub pet_age: Option<u32>,
    pub sex: Option<Sex>,
    pub location: String,
    pub description: Option<String>,
    pub username: String,
    #[serde(with = "crate::b64")]
    pub pet_photo: Vec<u8>,
}

// -- Adoption --

/// Body of an adoption application document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ApplicationDetails {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub address: Option<String>,
    pub occupation: Option<String>,
    pub responsible_for_pet_care: Option<String>,
    pub plan_to_care_for_pet: Option<String>,
    pub clinic_name: Option<String>,
    pub reason_for_adopting: Option<String>,
    #[serde(with = "crate::b64")]
    #[validate(length(min = 1, message = "Proof of identity photo must be provided"))]
    pub proof_of_identity_photo: Vec<u8>,
}

/// A recorded intent to adopt. There is no approval state.
#[derive(Debug, Clone, Serialize)]
pub struct AdoptionApplication {
    pub id: Uuid,
    pub pet_id: Uuid,
    #[serde(flatten)]
    pub details: ApplicationDetails,
    pub created_at: DateTime<Utc>,
}

// -- Posts --

/// Community feed entry, joined with the author's profile photo.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    pub username: String,
    pub post_id: Uuid,
    pub post_content: String,
    pub date_posted: DateTime<Utc>,
    #[serde(with = "crate::b64")]
    pub profile_photo: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPost {
    pub post_id: Uuid,
    pub post_content: String,
    pub date_posted: DateTime<Utc>,
}
