use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use masjedi_api::app::services::AppServices;
use masjedi_auth::{HmacJwtValidator, JwtClaims, RealmAccess, Role};
use reqwest::StatusCode;
use serde_json::{json, Value};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let jwt = Arc::new(HmacJwtValidator::new(SECRET.as_bytes(), None));
        let app = masjedi_api::app::build_app(AppServices::in_memory(), jwt);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    /// POST expecting 201; returns the created body.
    async fn create(&self, token: &str, path: &str, body: Value) -> Value {
        let res = self.post(token, path, body).await;
        assert_eq!(res.status(), StatusCode::CREATED, "POST {path}");
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(username: Option<&str>, roles: &[&'static str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: format!("kc-{}", username.unwrap_or("anonymous")),
        preferred_username: username.map(str::to_string),
        realm_access: RealmAccess {
            roles: roles.iter().map(|r| Role::new(*r)).collect(),
        },
        iat: (now - ChronoDuration::seconds(10)).timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
        iss: None,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin() -> String {
    mint_jwt(Some("admin"), &["ADMIN"])
}

fn id_of(body: &Value) -> i64 {
    body["id"].as_i64().expect("id")
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/api/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.get("not-a-jwt", "/api/mosques").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let now = Utc::now();
    let claims = JwtClaims {
        sub: "kc-1".into(),
        preferred_username: Some("admin".into()),
        realm_access: RealmAccess { roles: vec![Role::new("ADMIN")] },
        iat: (now - ChronoDuration::hours(2)).timestamp(),
        exp: (now - ChronoDuration::hours(1)).timestamp(),
        iss: None,
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let res = srv.get(&token, "/api/whoami").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(Some("amina"), &["teacher", "offline_access"]);

    let res = srv.get(&token, "/api/whoami").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "amina");
    assert_eq!(body["roles"], json!(["TEACHER"]));
}

#[tokio::test]
async fn mosque_lifecycle_create_update_delete() {
    let srv = TestServer::spawn().await;
    let token = admin();

    let created = srv
        .create(
            &token,
            "/api/mosques",
            json!({ "title": "  Al-Noor ", "location": "Cairo" }),
        )
        .await;
    let id = id_of(&created);
    assert_eq!(created["title"], "Al-Noor");
    assert_eq!(created["number_of_circles"], 0);

    let update = json!({ "title": "Al-Noor Centre", "description": "Evening classes", "location": "Giza" });
    let first: Value = srv.put(&token, &format!("/api/mosques/{id}"), update.clone()).await.json().await.unwrap();
    let second: Value = srv.put(&token, &format!("/api/mosques/{id}"), update).await.json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second["location"], "Giza");

    let res = srv.get(&token, "/api/mosques/search/location?location=giz").await;
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total_elements"], 1);
    assert_eq!(page["content"][0]["id"], id);

    let res = srv.get(&token, &format!("/api/mosques/{id}/circles/count")).await;
    assert_eq!(res.json::<Value>().await.unwrap(), json!(0));

    let res = srv.delete(&token, &format!("/api/mosques/{id}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get(&token, &format!("/api/mosques/{id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn role_guards_follow_the_access_matrix() {
    let srv = TestServer::spawn().await;
    let student = mint_jwt(Some("s1"), &["STUDENT"]);
    let teacher = mint_jwt(Some("t1"), &["TEACHER"]);

    let res = srv.post(&student, "/api/mosques", json!({ "title": "X" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let res = srv.post(&teacher, "/api/courses", json!({ "title": "Tajweed" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.get(&teacher, "/api/circles/with-students").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Any authenticated caller may read.
    let res = srv.get(&student, "/api/mosques").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let token = admin();

    let res = srv.get(&token, "/api/mosques/abc").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "invalid_id");

    let res = srv.post(&token, "/api/mosques", json!({ "title": "   " })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "validation_error");

    let res = srv.post(&token, "/api/courses", json!({ "description": "no title" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "validation_error");

    let res = srv
        .get(&token, "/api/logbook/student/1/course/1/date-range?start_date=2024-05-02&end_date=2024-05-01")
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lessons_are_placed_by_order() {
    let srv = TestServer::spawn().await;
    let token = admin();

    let course = srv.create(&token, "/api/courses", json!({ "title": "Quran reading" })).await;
    let course_id = id_of(&course);

    let res = srv.get(&token, &format!("/api/lessons/course/{course_id}/max-order")).await;
    assert_eq!(res.json::<Value>().await.unwrap(), Value::Null);

    let a = srv
        .create(&token, "/api/lessons", json!({ "title": "A", "course_id": course_id }))
        .await;
    let b = srv
        .create(&token, "/api/lessons", json!({ "title": "B", "course_id": course_id }))
        .await;
    assert_eq!(a["order"], 1);
    assert_eq!(b["order"], 2);

    let c = srv
        .create(&token, "/api/lessons", json!({ "title": "C", "order": 1, "course_id": course_id }))
        .await;
    assert_eq!(c["order"], 1);

    let res = srv.get(&token, &format!("/api/lessons/course/{course_id}/ordered")).await;
    let lessons: Vec<Value> = res.json().await.unwrap();
    let titles: Vec<&str> = lessons.iter().map(|l| l["title"].as_str().unwrap()).collect();
    let orders: Vec<i64> = lessons.iter().map(|l| l["order"].as_i64().unwrap()).collect();
    assert_eq!(titles, vec!["C", "A", "B"]);
    assert_eq!(orders, vec![1, 2, 3]);

    let res = srv
        .get(&token, &format!("/api/lessons/course/{course_id}/lesson/{}/exists", id_of(&a)))
        .await;
    assert_eq!(res.json::<Value>().await.unwrap(), json!(true));
}

#[tokio::test]
async fn users_are_created_with_query_role_and_unique_names() {
    let srv = TestServer::spawn().await;
    let token = admin();

    let res = srv
        .post(
            &token,
            "/api/users?role=teacher",
            json!({ "username": "yusuf", "password": "secret1", "role": "STUDENT" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["role"], "TEACHER");
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    let res = srv
        .post(&token, "/api/users?role=STUDENT", json!({ "username": "yusuf", "password": "secret2" }))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "conflict");

    let res = srv
        .post(&token, "/api/users", json!({ "username": "norole", "password": "secret2" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post(&token, "/api/users?role=STUDENT", json!({ "username": "short", "password": "123" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn current_user_requires_a_local_user() {
    let srv = TestServer::spawn().await;
    let ghost = mint_jwt(Some("ghost"), &["STUDENT"]);

    let res = srv.get(&ghost, "/api/users/current").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "unauthorized");

    srv.create(
        &admin(),
        "/api/users?role=STUDENT",
        json!({ "username": "ghost", "password": "secret1" }),
    )
    .await;

    let res = srv.get(&ghost, "/api/users/current").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap()["username"], "ghost");
}

#[tokio::test]
async fn users_may_read_themselves_but_not_others() {
    let srv = TestServer::spawn().await;
    let token = admin();
    let me = srv
        .create(&token, "/api/users?role=STUDENT", json!({ "username": "s1", "password": "secret1" }))
        .await;
    let other = srv
        .create(&token, "/api/users?role=STUDENT", json!({ "username": "s2", "password": "secret1" }))
        .await;
    let s1 = mint_jwt(Some("s1"), &["STUDENT"]);

    let res = srv.get(&s1, &format!("/api/users/{}", id_of(&me))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv.get(&s1, &format!("/api/users/{}", id_of(&other))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Self-update may not escalate the role.
    let res = srv
        .put(&s1, &format!("/api/users/{}", id_of(&me)), json!({ "role": "ADMIN" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn change_password_verifies_the_current_one() {
    let srv = TestServer::spawn().await;
    srv.create(
        &admin(),
        "/api/users?role=STUDENT",
        json!({ "username": "hafsa", "password": "secret1" }),
    )
    .await;
    let token = mint_jwt(Some("hafsa"), &["STUDENT"]);

    let res = srv
        .put(
            &token,
            "/api/users/change-password",
            json!({ "current_password": "wrong-one", "new_password": "secret2" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .put(
            &token,
            "/api/users/change-password",
            json!({ "current_password": "secret1", "new_password": "secret2" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .put(
            &token,
            "/api/users/change-password",
            json!({ "current_password": "secret1", "new_password": "secret3" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

/// Mosque with one circle taught by `t1`, one student `s1` in it, and a
/// second teacher `t2` without circles. Returns (circle_id, student_id, course_id).
async fn seed_circle(srv: &TestServer) -> (i64, i64, i64) {
    let token = admin();
    let mosque = srv.create(&token, "/api/mosques", json!({ "title": "Al-Huda" })).await;
    let mosque_id = id_of(&mosque);
    let t1 = srv
        .create(
            &token,
            "/api/users?role=TEACHER",
            json!({ "username": "t1", "password": "secret1", "mosque_id": mosque_id }),
        )
        .await;
    srv.create(&token, "/api/users?role=TEACHER", json!({ "username": "t2", "password": "secret1" }))
        .await;
    let circle = srv
        .create(
            &token,
            "/api/circles",
            json!({ "title": "Juz Amma", "mosque_id": mosque_id, "teacher_id": id_of(&t1) }),
        )
        .await;
    let circle_id = id_of(&circle);
    let student = srv
        .create(
            &token,
            "/api/users?role=STUDENT",
            json!({ "username": "s1", "password": "secret1", "circle_id": circle_id, "mosque_id": mosque_id }),
        )
        .await;
    let course = srv.create(&token, "/api/courses", json!({ "title": "Tajweed" })).await;
    let course_id = id_of(&course);
    let res = srv
        .post(&token, &format!("/api/circles/{circle_id}/add-course/{course_id}"), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    (circle_id, id_of(&student), course_id)
}

#[tokio::test]
async fn circle_read_model_counts_students_and_courses() {
    let srv = TestServer::spawn().await;
    let (circle_id, _, _) = seed_circle(&srv).await;

    let res = srv.get(&admin(), &format!("/api/circles/{circle_id}")).await;
    let circle: Value = res.json().await.unwrap();
    assert_eq!(circle["teacher_name"], "t1");
    assert_eq!(circle["mosque_title"], "Al-Huda");
    assert_eq!(circle["number_of_students"], 1);
    assert_eq!(circle["number_of_courses"], 1);

    let res = srv.get(&admin(), &format!("/api/users/circle/{circle_id}/teacher")).await;
    assert_eq!(res.json::<Value>().await.unwrap()["username"], "t1");
}

#[tokio::test]
async fn teachers_only_reach_their_own_circles() {
    let srv = TestServer::spawn().await;
    let (circle_id, student_id, course_id) = seed_circle(&srv).await;
    let t1 = mint_jwt(Some("t1"), &["TEACHER"]);
    let t2 = mint_jwt(Some("t2"), &["TEACHER"]);

    let res = srv.get(&t1, &format!("/api/teacher/circles/{circle_id}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv.get(&t2, &format!("/api/teacher/circles/{circle_id}")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv.get(&t2, &format!("/api/teacher/students/{student_id}/courses")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.get(&t1, &format!("/api/teacher/circles/{circle_id}/students")).await;
    let students: Vec<Value> = res.json().await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["username"], "s1");

    let res = srv.get(&t1, "/api/teacher/circles").await;
    let circles: Vec<Value> = res.json().await.unwrap();
    assert_eq!(circles.len(), 1);

    let entry = srv
        .create(
            &t1,
            "/api/teacher/daily-progress",
            json!({ "student_id": student_id, "course_id": course_id, "text": "Read Al-Fatiha", "day": "2024-05-01" }),
        )
        .await;
    assert_eq!(entry["course_title"], "Tajweed");

    let res = srv.delete(&t2, &format!("/api/teacher/daily-progress/{}", id_of(&entry))).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .get(
            &t1,
            &format!("/api/teacher/students/{student_id}/courses/{course_id}/daily-progress?date=2024-05-01"),
        )
        .await;
    let entries: Vec<Value> = res.json().await.unwrap();
    assert_eq!(entries.len(), 1);

    // Admins are not teachers for the workspace.
    let res = srv.get(&admin(), "/api/teacher/circles").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn notes_are_owned_by_their_author() {
    let srv = TestServer::spawn().await;
    let (_, student_id, _) = seed_circle(&srv).await;
    let t1 = mint_jwt(Some("t1"), &["TEACHER"]);
    let t2 = mint_jwt(Some("t2"), &["TEACHER"]);

    let note = srv
        .create(&t1, "/api/notes", json!({ "text": "Excellent recitation", "student_id": student_id }))
        .await;
    assert_eq!(note["author_name"], "t1");
    assert_eq!(note["student_name"], "s1");
    let note_id = id_of(&note);

    let res = srv
        .put(&t2, &format!("/api/notes/{note_id}"), json!({ "text": "edited", "student_id": student_id }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .put(&t1, &format!("/api/notes/{note_id}"), json!({ "text": "edited", "student_id": student_id }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // The student sees notes about themselves through the workspace.
    let s1 = mint_jwt(Some("s1"), &["STUDENT"]);
    let res = srv.get(&s1, "/api/student/notes").await;
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total_elements"], 1);
    assert_eq!(page["content"][0]["text"], "edited");

    let res = srv.delete(&admin(), &format!("/api/notes/{note_id}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn students_see_their_own_progress() {
    let srv = TestServer::spawn().await;
    let (_, student_id, course_id) = seed_circle(&srv).await;
    let token = admin();
    let lesson = srv
        .create(&token, "/api/lessons", json!({ "title": "Makharij", "course_id": course_id }))
        .await;
    let t1 = mint_jwt(Some("t1"), &["TEACHER"]);
    let progress = srv
        .create(
            &t1,
            "/api/teacher/progress",
            json!({ "student_id": student_id, "lesson_id": id_of(&lesson), "is_completed": true }),
        )
        .await;
    assert_eq!(progress["is_completed"], true);
    assert_eq!(progress["course_id"], course_id);

    let s1 = mint_jwt(Some("s1"), &["STUDENT"]);
    let res = srv.get(&s1, &format!("/api/student/progress/{course_id}/completed/count")).await;
    assert_eq!(res.json::<Value>().await.unwrap(), json!(1));

    let res = srv.get(&s1, "/api/student/courses").await;
    let courses: Vec<Value> = res.json().await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["title"], "Tajweed");

    let res = srv.get(&s1, &format!("/api/student-progress/{}", id_of(&progress))).await;
    assert_eq!(res.status(), StatusCode::OK);

    // Another student may not read it, and cannot tell it apart from a missing record.
    srv.create(&token, "/api/users?role=STUDENT", json!({ "username": "s9", "password": "secret1" }))
        .await;
    let s9 = mint_jwt(Some("s9"), &["STUDENT"]);
    let res = srv.get(&s9, &format!("/api/student-progress/{}", id_of(&progress))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let foreign: Value = res.json().await.unwrap();
    let res = srv.get(&s9, "/api/student-progress/999999").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await.unwrap(), foreign);
}

#[tokio::test]
async fn logbook_entries_are_read_updated_and_deleted_by_id() {
    let srv = TestServer::spawn().await;
    let (_, student_id, course_id) = seed_circle(&srv).await;
    let token = admin();

    let entry = srv
        .create(
            &token,
            "/api/logbook",
            json!({ "student_id": student_id, "course_id": course_id, "text": "Surah Al-Mulk", "day": "2024-05-01" }),
        )
        .await;
    let path = format!("/api/logbook/{}", id_of(&entry));

    let res = srv.get(&token, &path).await;
    assert_eq!(res.status(), StatusCode::OK);
    let mut read: Value = res.json().await.unwrap();
    assert_eq!(read["day"], "2024-05-01");

    // The read model can be edited and sent straight back.
    read["text"] = json!("Surah Al-Mulk, verses 1-10");
    read["day"] = json!("2024-05-02");
    let res = srv.put(&token, &path, read).await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["text"], "Surah Al-Mulk, verses 1-10");
    assert_eq!(updated["day"], "2024-05-02");

    let s1 = mint_jwt(Some("s1"), &["STUDENT"]);
    let res = srv.get(&s1, &path).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv.put(&s1, &path, updated).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.delete(&token, &path).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.get(&token, &path).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn demoting_a_teacher_releases_their_circle() {
    let srv = TestServer::spawn().await;
    let (circle_id, _, _) = seed_circle(&srv).await;
    let token = admin();

    let res = srv.get(&token, "/api/users/username/t1").await;
    let t1_id = id_of(&res.json::<Value>().await.unwrap());

    let res = srv.put(&token, &format!("/api/users/{t1_id}"), json!({ "role": "STUDENT" })).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap()["role"], "STUDENT");

    let res = srv.get(&token, &format!("/api/circles/{circle_id}")).await;
    let circle: Value = res.json().await.unwrap();
    assert_eq!(circle["teacher_id"], Value::Null);
    assert_eq!(circle["teacher_name"], Value::Null);

    let t1 = mint_jwt(Some("t1"), &["TEACHER"]);
    let res = srv.get(&t1, &format!("/api/teacher/circles/{circle_id}")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
