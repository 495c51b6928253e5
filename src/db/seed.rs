use anyhow::{Context, Result};

use super::{DBType, DB};
use crate::{
    auth,
    config::Config,
    models::{NewAnnouncement, NewDocument, NewSetting, NewSubject, NewUser, Role, Subject},
};

const SUBJECTS: [(&str, &str); 7] = [
    ("Mathématiques", "blue"),
    ("Physique-Chimie", "red"),
    ("SVT", "green"),
    ("Français", "yellow"),
    ("Philosophie", "purple"),
    ("Histoire-Géo", "orange"),
    ("Anglais", "indigo"),
];

fn default_settings() -> Vec<(&'static str, String)> {
    let quick_links = serde_json::json!([
        { "name": "Accueil", "href": "/" },
        { "name": "Documents", "href": "/" },
        { "name": "À propos", "href": "/" },
        { "name": "Contact", "href": "/" },
    ]);

    vec![
        ("footer_email", "contact@bachub-tchad.com".to_string()),
        ("footer_phone", "+235 XX XX XX XX".to_string()),
        ("footer_address", "N'Djamena, Tchad".to_string()),
        ("social_facebook", "https://facebook.com".to_string()),
        ("social_twitter", "https://twitter.com".to_string()),
        ("social_instagram", "https://instagram.com".to_string()),
        (
            "footer_description",
            "Votre plateforme de ressources éducatives pour réussir votre baccalauréat."
                .to_string(),
        ),
        (
            "footer_copyright",
            "© {year} Bac-Hub Tchad. Tous droits réservés.".to_string(),
        ),
        ("footer_quick_links", quick_links.to_string()),
    ]
}

/// Adds the footer settings that are missing, then fills an empty store with
/// the initial accounts, subjects, sample documents and announcement.
pub async fn seed(db: &DBType, config: &Config) -> Result<()> {
    seed_settings(db).await?;

    if !db.list_users().await?.is_empty() {
        log::debug!("store already initialized, skipping initial data");
        return Ok(());
    }

    let admin_password = match &config.admin_password {
        Some(password) => password.clone(),
        None => {
            log::warn!("no admin_password configured, skipping initial data");
            return Ok(());
        }
    };

    seed_initial_data(db, config, admin_password).await
}

async fn seed_settings(db: &DBType) -> Result<()> {
    let mut added = 0;
    for (key, value) in default_settings() {
        if db.get_setting(key).await?.is_some() {
            continue;
        }

        db.create_setting(NewSetting {
            key: key.to_string(),
            value,
        })
        .await
        .with_context(|| format!("failed to create setting '{}'", key))?;
        added += 1;
    }

    if added > 0 {
        log::info!("added {} default settings", added);
    }
    Ok(())
}

async fn seed_initial_data(db: &DBType, config: &Config, admin_password: String) -> Result<()> {
    let cost = config.bcrypt_cost();

    let admin = db
        .create_user(NewUser {
            username: "admin".to_string(),
            password: auth::hash_password(admin_password, cost).await?,
            email: "admin@douleinnova.com".to_string(),
            full_name: "Admin Doule Innova".to_string(),
            role: Role::Admin,
        })
        .await
        .context("failed to create admin user")?;
    log::info!("created admin user '{}'", admin.username);

    if let Some(password) = &config.student_password {
        let student = db
            .create_user(NewUser {
                username: "eleve".to_string(),
                password: auth::hash_password(password.clone(), cost).await?,
                email: "eleve@douleinnova.com".to_string(),
                full_name: "Élève Test".to_string(),
                role: Role::User,
            })
            .await
            .context("failed to create student user")?;
        log::info!("created student user '{}'", student.username);
    }

    let mut subjects: Vec<Subject> = Vec::with_capacity(SUBJECTS.len());
    for (name, color) in SUBJECTS {
        let subject = match db.get_subject_by_name(name).await? {
            Some(subject) => subject,
            None => {
                db.create_subject(NewSubject {
                    name: name.to_string(),
                    color: color.to_string(),
                })
                .await?
            }
        };
        subjects.push(subject);
    }
    let subject_id = |name: &str| {
        subjects
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .unwrap_or_default()
    };

    let samples = [
        (
            "Bac D - Épreuve de Mathématiques",
            "Sujet complet avec corrigé détaillé de l'épreuve de mathématiques du Baccalauréat série D.",
            2023,
            subject_id("Mathématiques"),
            "math_bac_d_2023.pdf",
            1_200_000,
        ),
        (
            "Bac A - Sciences de la Vie et de la Terre",
            "Épreuve complète de SVT avec schémas et corrigés pour le Baccalauréat série A.",
            2022,
            subject_id("SVT"),
            "svt_bac_a_2022.pdf",
            2_400_000,
        ),
        (
            "Bac A, C, D - Philosophie",
            "Sujets et corrigés de l'épreuve de Philosophie avec méthodologie de dissertation et commentaire.",
            2023,
            subject_id("Philosophie"),
            "philo_bac_acd_2023.pdf",
            1_800_000,
        ),
    ];
    for (title, description, year, subject_id, file_name, file_size) in samples {
        db.create_document(NewDocument {
            title: title.to_string(),
            description: description.to_string(),
            year,
            subject_id,
            file_name: file_name.to_string(),
            file_size,
            uploaded_by: admin.id,
        })
        .await?;
    }

    db.create_announcement(NewAnnouncement {
        title: "Nouveaux sujets disponibles".to_string(),
        content: "Nouveaux sujets de Mathématiques et Sciences Physiques disponibles pour le Bac 2023!"
            .to_string(),
        active: true,
        created_by: admin.id,
    })
    .await?;

    log::info!("store initialization complete");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{db::map::MapDB, models::DocumentFilter};

    fn config(admin_password: Option<&str>) -> Config {
        Config {
            bcrypt_cost: Some(4),
            admin_password: admin_password.map(String::from),
            student_password: Some("elevepass".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_seed_initial_data() {
        let db = DBType::MapDB(MapDB::new());
        seed(&db, &config(Some("adminpass"))).await.unwrap();

        let users = db.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().any(|u| u.username == "admin" && u.is_admin()));
        assert_eq!(db.list_subjects().await.unwrap().len(), 7);
        assert_eq!(
            db.list_documents(&DocumentFilter::default())
                .await
                .unwrap()
                .len(),
            3
        );
        assert_eq!(db.list_announcements(true).await.unwrap().len(), 1);
        assert_eq!(db.list_settings(&[]).await.unwrap().len(), 9);

        let admin = db.get_user_by_username("admin").await.unwrap().unwrap();
        assert!(auth::verify_password("adminpass".into(), admin.password)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = DBType::MapDB(MapDB::new());
        let config = config(Some("adminpass"));
        seed(&db, &config).await.unwrap();

        db.upsert_setting("footer_phone", "+235 00 00 00 00".into())
            .await
            .unwrap();
        seed(&db, &config).await.unwrap();

        assert_eq!(db.list_users().await.unwrap().len(), 2);
        assert_eq!(db.list_subjects().await.unwrap().len(), 7);
        assert_eq!(db.list_settings(&[]).await.unwrap().len(), 9);
        let phone = db.get_setting("footer_phone").await.unwrap().unwrap();
        assert_eq!(phone.value, "+235 00 00 00 00");
    }

    #[tokio::test]
    async fn test_seed_without_admin_password() {
        let db = DBType::MapDB(MapDB::new());
        seed(&db, &config(None)).await.unwrap();

        assert!(db.list_users().await.unwrap().is_empty());
        assert!(db.list_subjects().await.unwrap().is_empty());

        let links = db.get_setting("footer_quick_links").await.unwrap().unwrap();
        let links: serde_json::Value = serde_json::from_str(&links.value).unwrap();
        assert_eq!(links.as_array().unwrap().len(), 4);
    }
}
