use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bachub::{
    app::router,
    auth,
    config::{AppState, Config},
    db::{
        map::MapDB,
        sqlite::{SqlDB, MEMORY},
        DBType, DB,
    },
    models::{NewDocument, NewSubject, NewUser, Role, User},
};

const PASSWORD: &str = "password123";

struct TestApp {
    app: Router,
    state: Arc<AppState>,
}

impl TestApp {
    fn new(db: DBType) -> Self {
        let config = Config {
            host: "localhost".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            jwt_expire_hours: 1,
            bcrypt_cost: Some(4),
            ..Default::default()
        };
        let state = Arc::new(AppState {
            db: Arc::new(db),
            config,
        });

        Self {
            app: router(state.clone()),
            state,
        }
    }

    async fn add_user(&self, username: &str, role: Role) -> User {
        self.state
            .db
            .create_user(NewUser {
                username: username.into(),
                password: auth::hash_password(PASSWORD.into(), 4).await.unwrap(),
                email: format!("{}@example.com", username),
                full_name: username.to_uppercase(),
                role,
            })
            .await
            .unwrap()
    }

    async fn add_document(&self, subject: &str, color: &str, title: &str, year: i32) -> i64 {
        let subject = match self.state.db.get_subject_by_name(subject).await.unwrap() {
            Some(subject) => subject,
            None => self
                .state
                .db
                .create_subject(NewSubject {
                    name: subject.into(),
                    color: color.into(),
                })
                .await
                .unwrap(),
        };

        self.state
            .db
            .create_document(NewDocument {
                title: title.into(),
                description: "Sujet complet avec corrigé".into(),
                year,
                subject_id: subject.id,
                file_name: "bac.pdf".into(),
                file_size: 1_200_000,
                uploaded_by: 1,
            })
            .await
            .unwrap()
            .id
    }

    async fn login(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(json!({"username": username, "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["accessToken"].as_str().unwrap().to_string()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, body)
    }
}

/// One app per storage backend, every scenario runs against both.
async fn apps() -> Vec<(&'static str, TestApp)> {
    vec![
        ("map", TestApp::new(DBType::MapDB(MapDB::new()))),
        (
            "sqlite",
            TestApp::new(DBType::SqlDB(SqlDB::new(MEMORY).await.unwrap())),
        ),
    ]
}

#[tokio::test]
async fn test_health_check() {
    for (_, app) in apps().await {
        let (status, body) = app.send(Method::GET, "/api", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }
}

#[tokio::test]
async fn test_listing_enriches_documents() {
    for (_, app) in apps().await {
        app.add_document("Mathématiques", "blue", "Bac D", 2023).await;

        let (status, body) = app.send(Method::GET, "/api/documents", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let documents = body.as_array().unwrap();
        assert_eq!(documents.len(), 1);
        let document = &documents[0];
        assert_eq!(document["title"], "Bac D");
        assert_eq!(document["subject"], "Mathématiques");
        assert_eq!(document["subjectColor"], "blue");
        assert_eq!(document["averageRating"], 0.0);
        assert_eq!(document["ratingCount"], 0);
        assert_eq!(document["commentCount"], 0);
        assert_eq!(document["downloads"], 0);
    }
}

#[tokio::test]
async fn test_listing_filters() {
    for (name, app) in apps().await {
        app.add_document("Mathématiques", "blue", "Bac D - Maths", 2023).await;
        app.add_document("Philosophie", "purple", "Bac A - Philo", 2022).await;

        let (_, body) = app
            .send(Method::GET, "/api/documents?year=2022", None, None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["subject"], "Philosophie");

        let (_, body) = app
            .send(Method::GET, "/api/documents?search=MATHS&subjectId=", None, None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "Bac D - Maths");

        let (_, body) = app
            .send(Method::GET, "/api/documents?subjectId=99", None, None)
            .await;
        assert!(body.as_array().unwrap().is_empty());

        app.add_document("Économie", "amber", "Économie - Bac G", 2021).await;
        for search in ["%C3%89conomie", "%C3%A9conomie", "%C3%89CONOMIE"] {
            let (_, body) = app
                .send(Method::GET, &format!("/api/documents?search={}", search), None, None)
                .await;
            assert_eq!(body.as_array().unwrap().len(), 1, "{} {}", name, search);
            assert_eq!(body[0]["subject"], "Économie");
        }
    }
}

#[tokio::test]
async fn test_ratings_average_over_users() {
    for (_, app) in apps().await {
        let id = app.add_document("Mathématiques", "blue", "Bac D", 2023).await;
        app.add_user("alice", Role::User).await;
        app.add_user("bob", Role::User).await;
        let alice = app.login("alice").await;
        let bob = app.login("bob").await;

        let uri = format!("/api/documents/{}/ratings", id);
        let (status, _) = app
            .send(Method::POST, &uri, Some(&alice), Some(json!({"rating": 5})))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        // rating again replaces the first value
        let (_, body) = app
            .send(Method::POST, &uri, Some(&alice), Some(json!({"rating": 4})))
            .await;
        assert_eq!(body["rating"]["rating"], 4);
        assert_eq!(body["ratingCount"], 1);

        let (_, body) = app
            .send(Method::POST, &uri, Some(&bob), Some(json!({"rating": 2})))
            .await;
        assert_eq!(body["averageRating"], 3.0);
        assert_eq!(body["ratingCount"], 2);

        let (status, body) = app
            .send(Method::GET, &format!("/api/documents/{}", id), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["averageRating"], 3.0);
        assert_eq!(body["ratingCount"], 2);
        assert_eq!(body["userRating"], 2);
        assert_eq!(body["isFavorite"], false);
    }
}

#[tokio::test]
async fn test_rating_validation() {
    for (_, app) in apps().await {
        let id = app.add_document("SVT", "green", "Bac A", 2022).await;
        app.add_user("alice", Role::User).await;
        let token = app.login("alice").await;

        let uri = format!("/api/documents/{}/ratings", id);
        let (status, body) = app
            .send(Method::POST, &uri, Some(&token), Some(json!({"rating": 7})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0]["field"], "rating");

        let (status, _) = app
            .send(Method::POST, &uri, Some(&token), Some(json!({"stars": 3})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/documents/999/ratings",
                Some(&token),
                Some(json!({"rating": 3})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_favorites() {
    for (_, app) in apps().await {
        let id = app.add_document("Mathématiques", "blue", "Bac D", 2023).await;
        app.add_user("alice", Role::User).await;
        let token = app.login("alice").await;
        let uri = format!("/api/documents/{}/favorites", id);

        let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["documentId"], id);

        let (status, body) = app.send(Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Document already favorited");

        let (status, body) = app
            .send(Method::GET, "/api/favorites", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["document"]["subject"], "Mathématiques");

        let (_, body) = app
            .send(Method::GET, &format!("/api/documents/{}", id), Some(&token), None)
            .await;
        assert_eq!(body["isFavorite"], true);

        let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_download_counter() {
    for (_, app) in apps().await {
        let id = app.add_document("Mathématiques", "blue", "Bac D", 2023).await;
        app.add_user("alice", Role::User).await;
        let token = app.login("alice").await;
        let uri = format!("/api/documents/{}/download", id);

        let (status, _) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        for _ in 0..3 {
            let (status, body) = app.send(Method::GET, &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "Download started");
            assert_eq!(body["document"]["fileName"], "bac.pdf");
        }

        let document = app.state.db.get_document(id).await.unwrap().unwrap();
        assert_eq!(document.downloads, 3);
    }
}

#[tokio::test]
async fn test_comments() {
    for (_, app) in apps().await {
        let id = app.add_document("Mathématiques", "blue", "Bac D", 2023).await;
        app.add_user("admin", Role::Admin).await;
        app.add_user("alice", Role::User).await;
        let admin = app.login("admin").await;
        let alice = app.login("alice").await;
        let uri = format!("/api/documents/{}/comments", id);

        let (status, _) = app
            .send(Method::POST, &uri, None, Some(json!({"content": "Merci"})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send(Method::POST, &uri, Some(&alice), Some(json!({"content": "Merci !"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["isAdminResponse"], false);
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("password").is_none());

        let (_, body) = app
            .send(Method::POST, &uri, Some(&admin), Some(json!({"content": "Avec plaisir"})))
            .await;
        assert_eq!(body["isAdminResponse"], true);

        let (status, _) = app
            .send(Method::POST, &uri, Some(&alice), Some(json!({"content": "   "})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        let comments = body.as_array().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["content"], "Avec plaisir");
        assert_eq!(comments[0]["user"]["role"], "admin");

        let (_, body) = app.send(Method::GET, "/api/documents", None, None).await;
        assert_eq!(body[0]["commentCount"], 2);
    }
}

#[tokio::test]
async fn test_register_login_and_session_cookie() {
    for (_, app) in apps().await {
        let register = json!({
            "username": "eleve",
            "password": "secret1",
            "email": "eleve@example.com",
            "fullName": "Élève Test",
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(register.to_string()))
            .unwrap();
        let response = app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("bachub_session="));

        let session = cookie.split(';').next().unwrap().to_string();
        let request = Request::builder()
            .uri("/api/user")
            .header(header::COOKIE, session)
            .body(Body::empty())
            .unwrap();
        let response = app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let user: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(user["username"], "eleve");
        assert_eq!(user["role"], "user");
        assert!(user.get("password").is_none());

        let (status, body) = app
            .send(Method::POST, "/api/register", None, Some(register))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username already exists");

        let (status, body) = app
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(json!({"username": "x", "password": "1", "email": "nope", "fullName": "X"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"].as_array().unwrap().len(), 3);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(json!({"username": "eleve", "password": "wrong-password"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // usernames are trimmed on both register and login
        let (status, body) = app
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(json!({"username": "  eleve ", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "eleve");

        let (status, _) = app.send(Method::GET, "/api/user", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app
            .send(Method::GET, "/api/user", Some("forged.token.value"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_admin_access() {
    for (_, app) in apps().await {
        let admin_user = app.add_user("admin", Role::Admin).await;
        let alice_user = app.add_user("alice", Role::User).await;
        let admin = app.login("admin").await;
        let alice = app.login("alice").await;

        let (status, _) = app.send(Method::GET, "/api/admin/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app
            .send(Method::GET, "/api/admin/users", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .send(Method::GET, "/api/admin/users", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert!(body[0].get("password").is_none());

        let (status, body) = app
            .send(
                Method::DELETE,
                &format!("/api/admin/users/{}", admin_user.id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot delete your own account");

        let (status, body) = app
            .send(
                Method::PUT,
                &format!("/api/admin/users/{}", alice_user.id),
                Some(&admin),
                Some(json!({"fullName": "Alice B", "role": "admin"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fullName"], "Alice B");
        assert_eq!(body["role"], "admin");

        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/api/admin/users/{}", alice_user.id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/api/admin/users/{}", alice_user.id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        // the deleted user's token no longer authenticates
        let (status, _) = app.send(Method::GET, "/api/user", Some(&alice), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_admin_content_management() {
    for (name, app) in apps().await {
        let admin_user = app.add_user("admin", Role::Admin).await;
        let admin = app.login("admin").await;

        let (status, subject) = app
            .send(
                Method::POST,
                "/api/admin/subjects",
                Some(&admin),
                Some(json!({"name": "Anglais", "color": "indigo"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = app
            .send(
                Method::POST,
                "/api/admin/subjects",
                Some(&admin),
                Some(json!({"name": "Anglais", "color": "red"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Subject already exists");

        let (status, document) = app
            .send(
                Method::POST,
                "/api/admin/documents",
                Some(&admin),
                Some(json!({
                    "title": "Bac A - Anglais",
                    "description": "Sujet et corrigé",
                    "year": 2023,
                    "subjectId": subject["id"],
                    "fileName": "anglais.pdf",
                    "fileSize": 2048,
                    "uploadedBy": 999,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(document["uploadedBy"], admin_user.id);

        let doc_uri = format!("/api/admin/documents/{}", document["id"]);
        let (status, body) = app
            .send(Method::PUT, &doc_uri, Some(&admin), Some(json!({"year": 2024})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["year"], 2024);
        assert_eq!(body["title"], "Bac A - Anglais");

        let (status, _) = app
            .send(Method::PUT, &doc_uri, Some(&admin), Some(json!({"subjectId": 999})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                Method::POST,
                "/api/admin/announcements",
                Some(&admin),
                Some(json!({"title": "Bac 2024", "content": "Nouveaux sujets"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, announcement) = app
            .send(
                Method::POST,
                "/api/admin/announcements",
                Some(&admin),
                Some(json!({"title": "Ancien", "content": "Archivé", "active": false})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(announcement["createdBy"], admin_user.id);

        let (_, body) = app
            .send(Method::GET, "/api/announcements?activeOnly=true", None, None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let (_, body) = app.send(Method::GET, "/api/announcements", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, setting) = app
            .send(
                Method::POST,
                "/api/admin/settings",
                Some(&admin),
                Some(json!({"key": "footer_email", "value": "contact@example.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, updated) = app
            .send(
                Method::POST,
                "/api/admin/settings",
                Some(&admin),
                Some(json!({"key": "footer_email", "value": "bac@example.com"})),
            )
            .await;
        assert_eq!(updated["id"], setting["id"]);

        let (_, body) = app
            .send(Method::GET, "/api/settings?keys=footer_email,footer_phone", None, None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["value"], "bac@example.com");

        // deleting twice succeeds, for every admin resource
        let targets = [
            doc_uri,
            format!("/api/admin/subjects/{}", subject["id"]),
            format!("/api/admin/announcements/{}", announcement["id"]),
            format!("/api/admin/settings/{}", setting["id"]),
            "/api/admin/comments/4242".to_string(),
        ];
        for uri in &targets {
            for _ in 0..2 {
                let (status, body) = app.send(Method::DELETE, uri, Some(&admin), None).await;
                assert_eq!(status, StatusCode::OK, "{} {}", name, uri);
                assert!(body["message"].as_str().unwrap().ends_with("deleted successfully"));
            }
        }
        let (_, body) = app.send(Method::GET, "/api/subjects", None, None).await;
        assert!(body.as_array().unwrap().is_empty(), "{}", name);
    }
}

#[tokio::test]
async fn test_admin_stats() {
    for (_, app) in apps().await {
        app.add_user("admin", Role::Admin).await;
        let admin = app.login("admin").await;
        let first = app.add_document("Mathématiques", "blue", "Bac D", 2023).await;
        app.add_document("SVT", "green", "Bac A", 2022).await;
        app.state.db.increment_download_count(first).await.unwrap();
        app.state.db.increment_download_count(first).await.unwrap();

        let (status, body) = app
            .send(Method::GET, "/api/admin/stats", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalUsers"], 1);
        assert_eq!(body["totalDocuments"], 2);
        assert_eq!(body["totalDownloads"], 2);
        assert_eq!(body["totalRatings"], 0);
        assert_eq!(body["popularDocuments"][0]["id"], first);
        assert_eq!(body["popularDocuments"][0]["subject"], "Mathématiques");
        assert_eq!(body["recentDocuments"].as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_missing_resources() {
    for (_, app) in apps().await {

        let (status, body) = app.send(Method::GET, "/api/documents/42", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Document not found");

        let (status, _) = app.send(Method::GET, "/api/subjects/42", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.send(Method::GET, "/api/subjects", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }
}
