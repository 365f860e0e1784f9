use crate::Database;
use crate::models::{AdoptionOutcome, UserRow};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use furever_types::b64;
use furever_types::models::{
    AdoptionApplication, ApplicationDetails, FeedPost, Pet, PetDetails, PetListing, Sex, UserPost,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, TransactionBehavior};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

impl Database {
    // -- Users --

    /// Insert a user document. Returns false when the username is taken.
    pub fn create_user(&self, id: &str, username: &str, doc: &Value) -> Result<bool> {
        let doc = serde_json::to_string(doc)?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, doc, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(username) DO NOTHING",
                rusqlite::params![id, username, doc, now()],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                [username],
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    /// `$set`-style partial update. Returns the number of documents modified:
    /// 0 when the user is missing or every field already held the given value.
    pub fn update_user_fields(&self, username: &str, fields: &Map<String, Value>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(mut user) = query_user_by_username(&tx, username)? else {
                return Ok(0);
            };

            let mut changed = false;
            for (key, value) in fields {
                if user.doc.get(key) != Some(value) {
                    user.doc.insert(key.clone(), value.clone());
                    changed = true;
                }
            }
            if !changed {
                return Ok(0);
            }

            let doc = serde_json::to_string(&user.doc)?;
            let modified = tx.execute("UPDATE users SET doc = ?1 WHERE id = ?2", (&doc, &user.id))?;
            tx.commit()?;
            Ok(modified)
        })
    }

    // -- Pets --

    /// Insert a pet only if its owner exists, in a single conditional write.
    /// Returns false (and writes nothing) for an unknown owner.
    pub fn insert_pet(&self, id: &str, pet: &PetDetails) -> Result<bool> {
        let doc = serde_json::to_string(pet)?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO pets (id, username, doc, created_at)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE EXISTS (SELECT 1 FROM users WHERE username = ?2)",
                rusqlite::params![id, pet.username, doc, now()],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_pet(&self, id: &str) -> Result<Option<Pet>> {
        self.with_conn(|conn| query_pet(conn, id))
    }

    pub fn get_pets_by_username(&self, username: &str) -> Result<Vec<Pet>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, doc, created_at FROM pets WHERE username = ?1 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([username], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<(String, String, String)>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, doc, created_at)| decode_pet(&id, &doc, &created_at))
            .collect()
    }

    /// Listing projection of every pet. Fields are extracted in SQL so the
    /// rest of each document never leaves the store.
    pub fn get_pet_listings(&self) -> Result<Vec<PetListing>> {
        type ListingRow = (
            String,
            Option<String>,
            Option<i64>,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            Option<String>,
        );

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id,
                        json_extract(doc, '$.pet_name'),
                        json_extract(doc, '$.pet_age'),
                        json_extract(doc, '$.sex'),
                        json_extract(doc, '$.location'),
                        json_extract(doc, '$.description'),
                        username,
                        json_extract(doc, '$.pet_photo')
                 FROM pets
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<ListingRow>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, pet_name, pet_age, sex, location, description, username, photo)| -> Result<PetListing> {
                Ok(PetListing {
                    id: parse_id(&id)?,
                    pet_name: pet_name.unwrap_or_default(),
                    pet_age: pet_age.map(u32::try_from).transpose()?,
                    sex: sex.map(|s| s.parse::<Sex>()).transpose().map_err(|e| anyhow!(e))?,
                    location: location.unwrap_or_default(),
                    description,
                    username,
                    pet_photo: b64::decode(photo.as_deref().unwrap_or_default())
                        .with_context(|| format!("Corrupt pet_photo on pet '{}'", id))?,
                })
            })
            .collect()
    }

    // -- Adoption --

    /// Record an adoption application. The applicant, pet and ownership
    /// checks run in the same immediate transaction as the insert, so they
    /// still hold when the row is written.
    pub fn submit_adoption(
        &self,
        id: &str,
        pet_id: &str,
        application: &ApplicationDetails,
    ) -> Result<AdoptionOutcome> {
        let doc = serde_json::to_string(application)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let applicant_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                [&application.username],
                |row| row.get(0),
            )?;
            if !applicant_exists {
                return Ok(AdoptionOutcome::UnknownApplicant);
            }

            let Some(pet) = query_pet(&tx, pet_id)? else {
                return Ok(AdoptionOutcome::UnknownPet);
            };
            if pet.details.username == application.username {
                return Ok(AdoptionOutcome::OwnPet);
            }

            tx.execute(
                "INSERT INTO adoption_applications (id, pet_id, username, doc, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, pet_id, application.username, doc, now()],
            )?;
            tx.commit()?;

            Ok(AdoptionOutcome::Submitted {
                pet_name: pet.details.pet_name,
            })
        })
    }

    /// Applications filed for a pet, newest first.
    pub fn get_applications_for_pet(&self, pet_id: &str) -> Result<Vec<AdoptionApplication>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pet_id, doc, created_at FROM adoption_applications
                 WHERE pet_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([pet_id], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<std::result::Result<Vec<(String, String, String, String)>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, pet_id, doc, created_at)| -> Result<AdoptionApplication> {
                Ok(AdoptionApplication {
                    id: parse_id(&id)?,
                    pet_id: parse_id(&pet_id)?,
                    details: serde_json::from_str(&doc)
                        .with_context(|| format!("Corrupt application document '{}'", id))?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    // -- Posts --

    /// Insert a post only if its author exists. Returns false otherwise.
    pub fn insert_post(
        &self,
        id: &str,
        username: &str,
        content: &str,
        date_posted: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO posts (id, username, post_content, date_posted, created_at)
                 SELECT ?1, ?2, ?3, ?4, ?5
                 WHERE EXISTS (SELECT 1 FROM users WHERE username = ?2)",
                rusqlite::params![id, username, content, format_timestamp(date_posted), now()],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Every post joined with its author's profile photo in one query.
    /// Posts whose author no longer exists are left out.
    pub fn get_feed_posts(&self) -> Result<Vec<FeedPost>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.username, p.post_content, p.date_posted,
                        json_extract(u.doc, '$.profile_photo')
                 FROM posts p
                 JOIN users u ON u.username = p.username
                 ORDER BY p.date_posted DESC, p.rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<std::result::Result<Vec<(String, String, String, String, SqlValue)>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, username, post_content, date_posted, photo)| -> Result<FeedPost> {
                // Documents are schema-free, so the photo may hold any JSON type.
                let profile_photo = match photo {
                    SqlValue::Text(text) => b64::decode(&text).unwrap_or_else(|e| {
                        warn!("Corrupt profile_photo for '{}': {}", username, e);
                        Vec::new()
                    }),
                    SqlValue::Null => Vec::new(),
                    other => {
                        warn!(
                            "Non-text profile_photo for '{}': {:?}",
                            username,
                            other.data_type()
                        );
                        Vec::new()
                    }
                };
                Ok(FeedPost {
                    post_id: parse_id(&id)?,
                    username,
                    post_content,
                    date_posted: parse_timestamp(&date_posted)?,
                    profile_photo,
                })
            })
            .collect()
    }

    pub fn get_posts_by_username(&self, username: &str) -> Result<Vec<UserPost>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_content, date_posted FROM posts
                 WHERE username = ?1
                 ORDER BY date_posted DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([username], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<(String, String, String)>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, post_content, date_posted)| -> Result<UserPost> {
                Ok(UserPost {
                    post_id: parse_id(&id)?,
                    post_content,
                    date_posted: parse_timestamp(&date_posted)?,
                })
            })
            .collect()
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, doc, created_at FROM users WHERE username = ?1")?;

    let row: Option<(String, String, String, String)> = stmt
        .query_row([username], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .optional()?;

    row.map(|(id, username, doc, created_at)| -> Result<UserRow> {
        let doc = serde_json::from_str(&doc)
            .with_context(|| format!("Corrupt user document '{}'", id))?;
        Ok(UserRow {
            id,
            username,
            doc,
            created_at,
        })
    })
    .transpose()
}

fn query_pet(conn: &Connection, id: &str) -> Result<Option<Pet>> {
    let mut stmt = conn.prepare("SELECT id, doc, created_at FROM pets WHERE id = ?1")?;

    let row: Option<(String, String, String)> = stmt
        .query_row([id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .optional()?;

    row.map(|(id, doc, created_at)| decode_pet(&id, &doc, &created_at))
        .transpose()
}

fn decode_pet(id: &str, doc: &str, created_at: &str) -> Result<Pet> {
    Ok(Pet {
        id: parse_id(id)?,
        details: serde_json::from_str(doc)
            .with_context(|| format!("Corrupt pet document '{}'", id))?,
        created_at: parse_timestamp(created_at)?,
    })
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Corrupt document id '{}'", id))
}

// Fixed-width UTC so that lexical ORDER BY matches chronological order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now() -> String {
    format_timestamp(Utc::now())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db_with_user(username: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        add_user(&db, username);
        db
    }

    fn add_user(db: &Database, username: &str) {
        let doc = json!({
            "username": username,
            "password": "$argon2id$stub",
            "profile_photo": "AQID",
        });
        assert!(db.create_user(&Uuid::new_v4().to_string(), username, &doc).unwrap());
    }

    fn pet(owner: &str) -> PetDetails {
        PetDetails {
            pet_name: "Mochi".into(),
            pet_age: Some(2),
            sex: Some(Sex::Female),
            location: "Quezon City".into(),
            description: Some("Loves naps".into()),
            pet_photo: vec![9, 9, 9],
            username: owner.into(),
        }
    }

    fn application(applicant: &str) -> ApplicationDetails {
        ApplicationDetails {
            username: applicant.into(),
            name: "Juan Dela Cruz".into(),
            address: None,
            occupation: Some("Nurse".into()),
            responsible_for_pet_care: None,
            plan_to_care_for_pet: None,
            clinic_name: None,
            reason_for_adopting: Some("Companionship".into()),
            proof_of_identity_photo: vec![7],
        }
    }

    #[test]
    fn duplicate_username_is_not_inserted() {
        let db = db_with_user("ashley");
        let created = db
            .create_user(&Uuid::new_v4().to_string(), "ashley", &json!({}))
            .unwrap();
        assert!(!created);
    }

    #[test]
    fn update_reports_modified_count() {
        let db = db_with_user("ashley");

        let mut fields = Map::new();
        fields.insert("favourite_treat".into(), json!("liver"));
        assert_eq!(db.update_user_fields("ashley", &fields).unwrap(), 1);

        // Same value again modifies nothing
        assert_eq!(db.update_user_fields("ashley", &fields).unwrap(), 0);

        assert_eq!(db.update_user_fields("nobody", &fields).unwrap(), 0);

        let user = db.get_user_by_username("ashley").unwrap().unwrap();
        assert_eq!(user.field("favourite_treat"), json!("liver"));
        assert_eq!(user.field("missing"), Value::Null);
    }

    #[test]
    fn pet_insert_requires_existing_owner() {
        let db = db_with_user("ashley");

        assert!(!db.insert_pet(&Uuid::new_v4().to_string(), &pet("ghost")).unwrap());
        assert!(db.get_pet_listings().unwrap().is_empty());

        let id = Uuid::new_v4();
        assert!(db.insert_pet(&id.to_string(), &pet("ashley")).unwrap());

        let stored = db.get_pet(&id.to_string()).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.details, pet("ashley"));
        assert_eq!(db.get_pets_by_username("ashley").unwrap().len(), 1);
        assert!(db.get_pets_by_username("someone").unwrap().is_empty());
    }

    #[test]
    fn listing_is_projected_from_documents() {
        let db = db_with_user("ashley");
        let id = Uuid::new_v4();
        db.insert_pet(&id.to_string(), &pet("ashley")).unwrap();

        let listings = db.get_pet_listings().unwrap();
        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.id, id);
        assert_eq!(listing.pet_name, "Mochi");
        assert_eq!(listing.pet_age, Some(2));
        assert_eq!(listing.sex, Some(Sex::Female));
        assert_eq!(listing.pet_photo, vec![9, 9, 9]);
    }

    #[test]
    fn adoption_checks_and_insert() {
        let db = db_with_user("owner");
        add_user(&db, "adopter");
        let pet_id = Uuid::new_v4().to_string();
        db.insert_pet(&pet_id, &pet("owner")).unwrap();

        let outcome = db
            .submit_adoption(&Uuid::new_v4().to_string(), &pet_id, &application("stranger"))
            .unwrap();
        assert_eq!(outcome, AdoptionOutcome::UnknownApplicant);

        let outcome = db
            .submit_adoption(&Uuid::new_v4().to_string(), "no-such-pet", &application("adopter"))
            .unwrap();
        assert_eq!(outcome, AdoptionOutcome::UnknownPet);

        let outcome = db
            .submit_adoption(&Uuid::new_v4().to_string(), &pet_id, &application("owner"))
            .unwrap();
        assert_eq!(outcome, AdoptionOutcome::OwnPet);
        assert!(db.get_applications_for_pet(&pet_id).unwrap().is_empty());

        let outcome = db
            .submit_adoption(&Uuid::new_v4().to_string(), &pet_id, &application("adopter"))
            .unwrap();
        assert_eq!(
            outcome,
            AdoptionOutcome::Submitted {
                pet_name: "Mochi".into()
            }
        );

        let apps = db.get_applications_for_pet(&pet_id).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].details, application("adopter"));
        assert_eq!(apps[0].pet_id.to_string(), pet_id);
    }

    #[test]
    fn posts_join_author_photo() {
        let db = db_with_user("ashley");

        let orphan = db
            .insert_post(&Uuid::new_v4().to_string(), "ghost", "boo", Utc::now())
            .unwrap();
        assert!(!orphan);

        let older = Utc::now() - chrono::Duration::hours(1);
        db.insert_post(&Uuid::new_v4().to_string(), "ashley", "first", older)
            .unwrap();
        db.insert_post(&Uuid::new_v4().to_string(), "ashley", "second", Utc::now())
            .unwrap();

        let feed = db.get_feed_posts().unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].post_content, "second");
        assert_eq!(feed[0].profile_photo, vec![1, 2, 3]);

        let mine = db.get_posts_by_username("ashley").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(db.get_posts_by_username("ghost").unwrap().is_empty());
    }

    #[test]
    fn feed_tolerates_non_text_author_photo() {
        let db = db_with_user("ashley");
        add_user(&db, "juan");
        for name in ["ashley", "juan"] {
            db.insert_post(&Uuid::new_v4().to_string(), name, "hello", Utc::now())
                .unwrap();
        }

        let mut fields = Map::new();
        fields.insert("profile_photo".into(), json!(123));
        assert_eq!(db.update_user_fields("juan", &fields).unwrap(), 1);

        let feed = db.get_feed_posts().unwrap();
        assert_eq!(feed.len(), 2);
        let photo_of = |name: &str| {
            feed.iter().find(|p| p.username == name).unwrap().profile_photo.clone()
        };
        assert!(photo_of("juan").is_empty());
        assert_eq!(photo_of("ashley"), vec![1, 2, 3]);

        fields.insert("profile_photo".into(), json!({ "nested": true }));
        db.update_user_fields("juan", &fields).unwrap();
        assert_eq!(db.get_feed_posts().unwrap().len(), 2);
    }
}
