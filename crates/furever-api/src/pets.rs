use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use furever_db::Database;
use furever_db::models::AdoptionOutcome;
use furever_types::api::{AddPetRequest, AdoptionRequest, MessageResponse};
use furever_types::models::{AdoptionApplication, Pet, PetListing};

use crate::error::ApiError;

/// Store a pet for an existing owner and echo it back as submitted.
pub fn add_pet(db: &Database, pet: AddPetRequest) -> Result<AddPetRequest, ApiError> {
    pet.validate()?;

    let id = Uuid::new_v4();
    if !db.insert_pet(&id.to_string(), &pet)? {
        return Err(ApiError::not_found("Username does not exist"));
    }

    info!("Pet {} ({}) listed by {}", pet.pet_name, id, pet.username);
    Ok(pet)
}

pub fn get_pet(db: &Database, pet_id: &str) -> Result<Pet, ApiError> {
    db.get_pet(pet_id)?
        .ok_or_else(|| ApiError::not_found("Pet not found"))
}

pub fn get_pets(db: &Database, username: &str) -> Result<Vec<Pet>, ApiError> {
    let pets = db.get_pets_by_username(username)?;
    if pets.is_empty() {
        return Err(ApiError::not_found("No pets found for this user"));
    }
    Ok(pets)
}

pub fn get_all_pets(db: &Database) -> Result<Vec<PetListing>, ApiError> {
    let pets = db.get_pet_listings()?;
    if pets.is_empty() {
        return Err(ApiError::not_found("No pets found"));
    }
    Ok(pets)
}

pub fn adopt_pet(
    db: &Database,
    pet_id: &str,
    application: AdoptionRequest,
) -> Result<MessageResponse, ApiError> {
    application.validate()?;

    let id = Uuid::new_v4();
    match db.submit_adoption(&id.to_string(), pet_id, &application)? {
        AdoptionOutcome::Submitted { pet_name } => {
            info!("Adoption application {} for pet {} from {}", id, pet_id, application.username);
            Ok(MessageResponse::new(format!(
                "Adoption application for {} submitted successfully",
                pet_name
            )))
        }
        AdoptionOutcome::UnknownApplicant => Err(ApiError::not_found("Username does not exist")),
        AdoptionOutcome::UnknownPet => Err(ApiError::not_found("Pet not found")),
        AdoptionOutcome::OwnPet => {
            warn!("{} tried to adopt their own pet {}", application.username, pet_id);
            Err(ApiError::bad_request("You cannot adopt your own pet"))
        }
    }
}

pub fn list_applications(db: &Database, pet_id: &str) -> Result<Vec<AdoptionApplication>, ApiError> {
    if db.get_pet(pet_id)?.is_none() {
        return Err(ApiError::not_found("Pet not found"));
    }
    Ok(db.get_applications_for_pet(pet_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use furever_types::models::Sex;
    use serde_json::json;

    fn db_with_users(usernames: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for username in usernames {
            let doc = json!({ "username": username, "profile_photo": "AQ==" });
            db.create_user(&Uuid::new_v4().to_string(), username, &doc).unwrap();
        }
        db
    }

    fn pet(owner: &str) -> AddPetRequest {
        AddPetRequest {
            pet_name: "Bantay".into(),
            pet_age: Some(3),
            sex: Some(Sex::Male),
            location: "Cebu".into(),
            description: None,
            pet_photo: vec![4, 2],
            username: owner.into(),
        }
    }

    fn application(applicant: &str) -> AdoptionRequest {
        AdoptionRequest {
            username: applicant.into(),
            name: "Maria Clara".into(),
            address: Some("Manila".into()),
            occupation: None,
            responsible_for_pet_care: Some("Me".into()),
            plan_to_care_for_pet: None,
            clinic_name: None,
            reason_for_adopting: None,
            proof_of_identity_photo: vec![1],
        }
    }

    fn only_pet_id(db: &Database, owner: &str) -> String {
        db.get_pets_by_username(owner).unwrap()[0].id.to_string()
    }

    #[test]
    fn add_pet_for_unknown_user_creates_nothing() {
        let db = db_with_users(&[]);
        let err = add_pet(&db, pet("ghost")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "Username does not exist");
        assert!(db.get_pet_listings().unwrap().is_empty());
    }

    #[test]
    fn add_pet_echoes_submission() {
        let db = db_with_users(&["owner"]);
        let echoed = add_pet(&db, pet("owner")).unwrap();
        assert_eq!(echoed, pet("owner"));
        assert_eq!(get_pets(&db, "owner").unwrap().len(), 1);
    }

    #[test]
    fn lookups_report_missing_pets() {
        let db = db_with_users(&["owner"]);
        assert_eq!(get_pet(&db, "missing").unwrap_err().to_string(), "Pet not found");
        assert_eq!(
            get_pets(&db, "owner").unwrap_err().to_string(),
            "No pets found for this user"
        );
        assert_eq!(get_all_pets(&db).unwrap_err().to_string(), "No pets found");
    }

    #[test]
    fn adoption_of_own_pet_is_refused() {
        let db = db_with_users(&["owner"]);
        add_pet(&db, pet("owner")).unwrap();
        let pet_id = only_pet_id(&db, "owner");

        let err = adopt_pet(&db, &pet_id, application("owner")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(list_applications(&db, &pet_id).unwrap().is_empty());
    }

    #[test]
    fn adoption_requires_known_applicant_and_pet() {
        let db = db_with_users(&["owner", "adopter"]);
        add_pet(&db, pet("owner")).unwrap();
        let pet_id = only_pet_id(&db, "owner");

        let err = adopt_pet(&db, &pet_id, application("stranger")).unwrap_err();
        assert_eq!(err.to_string(), "Username does not exist");

        let err = adopt_pet(&db, "missing", application("adopter")).unwrap_err();
        assert_eq!(err.to_string(), "Pet not found");
    }

    #[test]
    fn adoption_is_recorded() {
        let db = db_with_users(&["owner", "adopter"]);
        add_pet(&db, pet("owner")).unwrap();
        let pet_id = only_pet_id(&db, "owner");

        let msg = adopt_pet(&db, &pet_id, application("adopter")).unwrap();
        assert_eq!(msg.message, "Adoption application for Bantay submitted successfully");

        let apps = list_applications(&db, &pet_id).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].details.username, "adopter");
    }

    #[test]
    fn invalid_application_is_rejected_before_the_store() {
        let db = db_with_users(&["owner", "adopter"]);
        add_pet(&db, pet("owner")).unwrap();
        let pet_id = only_pet_id(&db, "owner");

        let mut app = application("adopter");
        app.proof_of_identity_photo.clear();
        assert!(matches!(adopt_pet(&db, &pet_id, app), Err(ApiError::Validation(_))));
    }
}
