//! Postgres-backed academy store.
//!
//! Queries are built at runtime with `QueryBuilder`; derived read-model fields
//! (titles, counts) come from joins and correlated sub-selects. Delete rules
//! are expressed as foreign keys in `migrations/0001_schema.sql`.
//!
//! ## Error Mapping
//!
//! | PostgreSQL error code | StoreError |
//! |---|---|
//! | `23505` unique violation | `Conflict` |
//! | `23503` foreign key violation | `NotFound` |
//! | `23514` check violation | `InvalidReference` |
//! | anything else | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use masjedi_academy::{
    CircleDraft, CircleReadModel, CourseDraft, CourseReadModel, LessonDraft, LessonReadModel, LogbookDraft,
    LogbookReadModel, MosqueDraft, MosqueReadModel, NewUser, NoteDraft, NoteReadModel, ProgressDraft,
    ProgressReadModel, UserChanges, UserReadModel, next_order,
};
use masjedi_core::{
    CircleId, CourseId, DomainError, LessonId, LogbookId, MosqueId, NoteId, Page, PageRequest, ProgressId, UserId,
    UserRole,
};

use super::{
    CircleFilter, CircleRepository, CourseFilter, CourseRepository, LessonOrder, LessonRepository, LogbookFilter,
    LogbookRepository, MosqueFilter, MosqueRepository, NoteRepository, ProgressRepository, StoreError, StoreResult,
    UserFilter, UserRepository,
};

const SCHEMA: &str = include_str!("../../migrations/0001_schema.sql");

const MOSQUE_SELECT: &str = r#"
    SELECT m.id, m.title, m.description, m.location, m.created_at,
           (SELECT COUNT(*) FROM circles c WHERE c.mosque_id = m.id) AS number_of_circles
    FROM mosques m
"#;

const CIRCLE_SELECT: &str = r#"
    SELECT c.id, c.title, c.mosque_id, m.title AS mosque_title, c.teacher_id, t.username AS teacher_name,
           (SELECT COUNT(*) FROM users s WHERE s.circle_id = c.id AND s.role = 'STUDENT') AS number_of_students,
           (SELECT COUNT(*) FROM circle_courses cc WHERE cc.circle_id = c.id) AS number_of_courses,
           c.created_at
    FROM circles c
    JOIN mosques m ON m.id = c.mosque_id
    LEFT JOIN users t ON t.id = c.teacher_id
"#;

const COURSE_SELECT: &str = r#"
    SELECT co.id, co.title, co.description, co.created_at,
           (SELECT COUNT(*) FROM lessons l WHERE l.course_id = co.id) AS number_of_lessons
    FROM courses co
"#;

const LESSON_SELECT: &str = r#"
    SELECT l.id, l.title, l.description, l.position, l.course_id, l.created_at
    FROM lessons l
"#;

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.role, u.circle_id, c.title AS circle_title,
           u.mosque_id, m.title AS mosque_title, u.created_at, u.updated_at
    FROM users u
    LEFT JOIN circles c ON c.id = u.circle_id
    LEFT JOIN mosques m ON m.id = u.mosque_id
"#;

const PROGRESS_SELECT: &str = r#"
    SELECT p.id, p.student_id, p.lesson_id, l.title AS lesson_title, l.course_id,
           p.completed, p.notes, p.created_at, p.updated_at
    FROM student_progress p
    JOIN lessons l ON l.id = p.lesson_id
"#;

const LOGBOOK_SELECT: &str = r#"
    SELECT lb.id, lb.student_id, lb.course_id, co.title AS course_title, lb.text, lb.day,
           lb.created_at, lb.updated_at
    FROM logbook lb
    JOIN courses co ON co.id = lb.course_id
"#;

const NOTE_SELECT: &str = r#"
    SELECT n.id, n.text, n.student_id, s.username AS student_name, n.author_id, a.username AS author_name,
           n.created_at, n.updated_at
    FROM notes n
    JOIN users s ON s.id = n.student_id
    LEFT JOIN users a ON a.id = n.author_id
"#;

type Builder = QueryBuilder<'static, Postgres>;

/// Postgres-backed [`super::AcademyStore`].
///
/// `PgPool` is internally reference counted; clones share one pool.
#[derive(Debug, Clone)]
pub struct PostgresAcademyStore {
    pool: PgPool,
}

impl PostgresAcademyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn ensure_exists(&self, table: &'static str, id: i64, entity: &'static str) -> StoreResult<()> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
        let found: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_exists", e))?;
        if found { Ok(()) } else { Err(StoreError::NotFound(entity)) }
    }

    async fn ensure_teacher(&self, id: UserId) -> StoreResult<()> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_teacher", e))?;
        match role.as_deref() {
            None => Err(StoreError::NotFound("user")),
            Some(r) if r == UserRole::Teacher.as_str() => Ok(()),
            Some(_) => Err(StoreError::InvalidReference(format!("user {id} is not a teacher"))),
        }
    }

    async fn fetch_by_id<R, T>(
        &self,
        operation: &'static str,
        select: &str,
        id_column: &str,
        id: i64,
        entity: &'static str,
    ) -> StoreResult<T>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        T: From<R>,
    {
        let mut query = Builder::new(select);
        query.push(" WHERE ").push(id_column).push(" = ").push_bind(id);
        let row: Option<R> = query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(T::from).ok_or(StoreError::NotFound(entity))
    }

    async fn fetch_list<R, T>(
        &self,
        operation: &'static str,
        select: &str,
        push_filter: impl Fn(&mut Builder) + Send + Sync,
        order_by: &str,
    ) -> StoreResult<Vec<T>>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        T: From<R>,
    {
        let mut query = Builder::new(select);
        query.push(" WHERE TRUE");
        push_filter(&mut query);
        query.push(" ORDER BY ").push(order_by);
        let rows: Vec<R> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(rows.into_iter().map(T::from).collect())
    }

    async fn fetch_page<R, T>(
        &self,
        operation: &'static str,
        select: &str,
        push_filter: impl Fn(&mut Builder) + Send + Sync,
        order_by: &str,
        page: PageRequest,
    ) -> StoreResult<Page<T>>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        T: From<R>,
    {
        let mut count = Builder::new("SELECT COUNT(*) FROM (");
        count.push(select).push(" WHERE TRUE");
        push_filter(&mut count);
        count.push(") AS filtered");
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let mut query = Builder::new(select);
        query.push(" WHERE TRUE");
        push_filter(&mut query);
        query
            .push(" ORDER BY ")
            .push(order_by)
            .push(" LIMIT ")
            .push_bind(to_i64(page.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(page.offset()));
        let rows: Vec<R> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        Ok(Page::new(rows.into_iter().map(T::from).collect(), page, count_of(total)))
    }

    async fn delete_by_id(&self, operation: &'static str, table: &'static str, id: i64, entity: &'static str) -> StoreResult<()> {
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(entity));
        }
        tracing::debug!(table, id, "row deleted");
        Ok(())
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count_of(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(db_err.message().to_string()),
                Some("23503") => StoreError::NotFound("referenced record"),
                Some("23514") => StoreError::InvalidReference(msg),
                _ => StoreError::Backend {
                    operation,
                    message: msg,
                },
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound("record"),
        other => {
            tracing::error!(operation, error = %other, "sqlx failure");
            StoreError::Backend {
                operation,
                message: other.to_string(),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

struct MosqueRow {
    id: i64,
    title: String,
    description: Option<String>,
    location: Option<String>,
    number_of_circles: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MosqueRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MosqueRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            number_of_circles: row.try_get("number_of_circles")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<MosqueRow> for MosqueReadModel {
    fn from(row: MosqueRow) -> Self {
        MosqueReadModel {
            id: MosqueId::new(row.id),
            title: row.title,
            description: row.description,
            location: row.location,
            number_of_circles: count_of(row.number_of_circles),
            created_at: row.created_at,
        }
    }
}

struct CircleRow {
    id: i64,
    title: String,
    mosque_id: i64,
    mosque_title: String,
    teacher_id: Option<i64>,
    teacher_name: Option<String>,
    number_of_students: i64,
    number_of_courses: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CircleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CircleRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            mosque_id: row.try_get("mosque_id")?,
            mosque_title: row.try_get("mosque_title")?,
            teacher_id: row.try_get("teacher_id")?,
            teacher_name: row.try_get("teacher_name")?,
            number_of_students: row.try_get("number_of_students")?,
            number_of_courses: row.try_get("number_of_courses")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CircleRow> for CircleReadModel {
    fn from(row: CircleRow) -> Self {
        CircleReadModel {
            id: CircleId::new(row.id),
            title: row.title,
            mosque_id: MosqueId::new(row.mosque_id),
            mosque_title: row.mosque_title,
            teacher_id: row.teacher_id.map(UserId::new),
            teacher_name: row.teacher_name,
            number_of_students: count_of(row.number_of_students),
            number_of_courses: count_of(row.number_of_courses),
            created_at: row.created_at,
        }
    }
}

struct CourseRow {
    id: i64,
    title: String,
    description: Option<String>,
    number_of_lessons: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CourseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CourseRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            number_of_lessons: row.try_get("number_of_lessons")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CourseRow> for CourseReadModel {
    fn from(row: CourseRow) -> Self {
        CourseReadModel {
            id: CourseId::new(row.id),
            title: row.title,
            description: row.description,
            number_of_lessons: count_of(row.number_of_lessons),
            created_at: row.created_at,
        }
    }
}

struct LessonRow {
    id: i64,
    title: String,
    description: Option<String>,
    position: i32,
    course_id: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for LessonRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LessonRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            position: row.try_get("position")?,
            course_id: row.try_get("course_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<LessonRow> for LessonReadModel {
    fn from(row: LessonRow) -> Self {
        LessonReadModel {
            id: LessonId::new(row.id),
            title: row.title,
            description: row.description,
            order: row.position,
            course_id: CourseId::new(row.course_id),
            created_at: row.created_at,
        }
    }
}

struct UserRow {
    id: i64,
    username: String,
    role: UserRole,
    circle_id: Option<i64>,
    circle_title: Option<String>,
    mosque_id: Option<i64>,
    mosque_title: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role
            .parse::<UserRole>()
            .map_err(|e: DomainError| sqlx::Error::Decode(Box::new(e)))?;
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            role,
            circle_id: row.try_get("circle_id")?,
            circle_title: row.try_get("circle_title")?,
            mosque_id: row.try_get("mosque_id")?,
            mosque_title: row.try_get("mosque_title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for UserReadModel {
    fn from(row: UserRow) -> Self {
        UserReadModel {
            id: UserId::new(row.id),
            username: row.username,
            role: row.role,
            circle_id: row.circle_id.map(CircleId::new),
            circle_title: row.circle_title,
            mosque_id: row.mosque_id.map(MosqueId::new),
            mosque_title: row.mosque_title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

struct ProgressRow {
    id: i64,
    student_id: i64,
    lesson_id: i64,
    lesson_title: String,
    course_id: i64,
    completed: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProgressRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProgressRow {
            id: row.try_get("id")?,
            student_id: row.try_get("student_id")?,
            lesson_id: row.try_get("lesson_id")?,
            lesson_title: row.try_get("lesson_title")?,
            course_id: row.try_get("course_id")?,
            completed: row.try_get("completed")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ProgressRow> for ProgressReadModel {
    fn from(row: ProgressRow) -> Self {
        ProgressReadModel {
            id: ProgressId::new(row.id),
            student_id: UserId::new(row.student_id),
            lesson_id: LessonId::new(row.lesson_id),
            lesson_title: row.lesson_title,
            course_id: CourseId::new(row.course_id),
            completed: row.completed,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

struct LogbookRow {
    id: i64,
    student_id: i64,
    course_id: i64,
    course_title: String,
    text: String,
    day: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for LogbookRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LogbookRow {
            id: row.try_get("id")?,
            student_id: row.try_get("student_id")?,
            course_id: row.try_get("course_id")?,
            course_title: row.try_get("course_title")?,
            text: row.try_get("text")?,
            day: row.try_get("day")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<LogbookRow> for LogbookReadModel {
    fn from(row: LogbookRow) -> Self {
        LogbookReadModel {
            id: LogbookId::new(row.id),
            student_id: UserId::new(row.student_id),
            course_id: CourseId::new(row.course_id),
            course_title: row.course_title,
            text: row.text,
            day: row.day,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

struct NoteRow {
    id: i64,
    text: String,
    student_id: i64,
    student_name: String,
    author_id: Option<i64>,
    author_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for NoteRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(NoteRow {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            student_id: row.try_get("student_id")?,
            student_name: row.try_get("student_name")?,
            author_id: row.try_get("author_id")?,
            author_name: row.try_get("author_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<NoteRow> for NoteReadModel {
    fn from(row: NoteRow) -> Self {
        NoteReadModel {
            id: NoteId::new(row.id),
            text: row.text,
            student_id: UserId::new(row.student_id),
            student_name: row.student_name,
            author_id: row.author_id.map(UserId::new),
            author_name: row.author_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repositories
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl MosqueRepository for PostgresAcademyStore {
    #[instrument(skip(self, draft), err)]
    async fn create_mosque(&self, draft: &MosqueDraft) -> StoreResult<MosqueReadModel> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO mosques (title, description, location)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_mosque", e))?;
        self.get_mosque(MosqueId::new(id)).await
    }

    async fn get_mosque(&self, id: MosqueId) -> StoreResult<MosqueReadModel> {
        self.fetch_by_id::<MosqueRow, _>("get_mosque", MOSQUE_SELECT, "m.id", id.get(), "mosque")
            .await
    }

    async fn list_mosques(&self, filter: &MosqueFilter, page: PageRequest) -> StoreResult<Page<MosqueReadModel>> {
        self.fetch_page::<MosqueRow, _>(
            "list_mosques",
            MOSQUE_SELECT,
            |q| match filter {
                MosqueFilter::All => {}
                MosqueFilter::TitleContains(needle) => {
                    q.push(" AND m.title ILIKE ").push_bind(like_pattern(needle));
                }
                MosqueFilter::LocationContains(needle) => {
                    q.push(" AND m.location ILIKE ").push_bind(like_pattern(needle));
                }
            },
            "m.id",
            page,
        )
        .await
    }

    #[instrument(skip(self, draft), fields(mosque_id = %id), err)]
    async fn update_mosque(&self, id: MosqueId, draft: &MosqueDraft) -> StoreResult<MosqueReadModel> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE mosques SET title = $1, description = $2, location = $3
            WHERE id = $4
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.location)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_mosque", e))?;
        updated.ok_or(StoreError::NotFound("mosque"))?;
        self.get_mosque(id).await
    }

    async fn delete_mosque(&self, id: MosqueId) -> StoreResult<()> {
        self.delete_by_id("delete_mosque", "mosques", id.get(), "mosque").await
    }
}

#[async_trait]
impl CircleRepository for PostgresAcademyStore {
    #[instrument(skip(self, draft), fields(mosque_id = %draft.mosque_id), err)]
    async fn create_circle(&self, draft: &CircleDraft) -> StoreResult<CircleReadModel> {
        self.ensure_exists("mosques", draft.mosque_id.get(), "mosque").await?;
        if let Some(teacher) = draft.teacher_id {
            self.ensure_teacher(teacher).await?;
        }
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO circles (title, mosque_id, teacher_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(draft.mosque_id.get())
        .bind(draft.teacher_id.map(UserId::get))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_circle", e))?;
        self.get_circle(CircleId::new(id)).await
    }

    async fn get_circle(&self, id: CircleId) -> StoreResult<CircleReadModel> {
        self.fetch_by_id::<CircleRow, _>("get_circle", CIRCLE_SELECT, "c.id", id.get(), "circle")
            .await
    }

    async fn list_circles(&self, filter: CircleFilter, page: PageRequest) -> StoreResult<Page<CircleReadModel>> {
        self.fetch_page::<CircleRow, _>(
            "list_circles",
            CIRCLE_SELECT,
            move |q| match filter {
                CircleFilter::Mosque(mosque) => {
                    q.push(" AND c.mosque_id = ").push_bind(mosque.get());
                }
                CircleFilter::Teacher(teacher) => {
                    q.push(" AND c.teacher_id = ").push_bind(teacher.get());
                }
                CircleFilter::WithStudents => {
                    q.push(
                        " AND EXISTS (SELECT 1 FROM users s WHERE s.circle_id = c.id AND s.role = 'STUDENT')",
                    );
                }
                CircleFilter::WithoutTeacherInMosque(mosque) => {
                    q.push(" AND c.teacher_id IS NULL AND c.mosque_id = ")
                        .push_bind(mosque.get());
                }
            },
            "c.id",
            page,
        )
        .await
    }

    #[instrument(skip(self, draft), fields(circle_id = %id), err)]
    async fn update_circle(&self, id: CircleId, draft: &CircleDraft) -> StoreResult<CircleReadModel> {
        self.ensure_exists("circles", id.get(), "circle").await?;
        self.ensure_exists("mosques", draft.mosque_id.get(), "mosque").await?;
        if let Some(teacher) = draft.teacher_id {
            self.ensure_teacher(teacher).await?;
        }
        sqlx::query("UPDATE circles SET title = $1, mosque_id = $2, teacher_id = $3 WHERE id = $4")
            .bind(&draft.title)
            .bind(draft.mosque_id.get())
            .bind(draft.teacher_id.map(UserId::get))
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_circle", e))?;
        self.get_circle(id).await
    }

    #[instrument(skip(self), fields(circle_id = %id), err)]
    async fn set_circle_teacher(&self, id: CircleId, teacher: Option<UserId>) -> StoreResult<()> {
        self.ensure_exists("circles", id.get(), "circle").await?;
        if let Some(teacher) = teacher {
            self.ensure_teacher(teacher).await?;
        }
        sqlx::query("UPDATE circles SET teacher_id = $1 WHERE id = $2")
            .bind(teacher.map(UserId::get))
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_circle_teacher", e))?;
        Ok(())
    }

    async fn delete_circle(&self, id: CircleId) -> StoreResult<()> {
        self.delete_by_id("delete_circle", "circles", id.get(), "circle").await
    }

    async fn link_course(&self, circle: CircleId, course: CourseId) -> StoreResult<()> {
        self.ensure_exists("circles", circle.get(), "circle").await?;
        self.ensure_exists("courses", course.get(), "course").await?;
        sqlx::query(
            r#"
            INSERT INTO circle_courses (circle_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(circle.get())
        .bind(course.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("link_course", e))?;
        Ok(())
    }

    async fn unlink_course(&self, circle: CircleId, course: CourseId) -> StoreResult<()> {
        self.ensure_exists("circles", circle.get(), "circle").await?;
        self.ensure_exists("courses", course.get(), "course").await?;
        sqlx::query("DELETE FROM circle_courses WHERE circle_id = $1 AND course_id = $2")
            .bind(circle.get())
            .bind(course.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("unlink_course", e))?;
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for PostgresAcademyStore {
    #[instrument(skip(self, draft), err)]
    async fn create_course(&self, draft: &CourseDraft) -> StoreResult<CourseReadModel> {
        let id: i64 = sqlx::query_scalar("INSERT INTO courses (title, description) VALUES ($1, $2) RETURNING id")
            .bind(&draft.title)
            .bind(&draft.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_course", e))?;
        self.get_course(CourseId::new(id)).await
    }

    async fn get_course(&self, id: CourseId) -> StoreResult<CourseReadModel> {
        self.fetch_by_id::<CourseRow, _>("get_course", COURSE_SELECT, "co.id", id.get(), "course")
            .await
    }

    async fn list_courses(&self, filter: &CourseFilter, page: PageRequest) -> StoreResult<Page<CourseReadModel>> {
        self.fetch_page::<CourseRow, _>(
            "list_courses",
            COURSE_SELECT,
            |q| match filter {
                CourseFilter::All => {}
                CourseFilter::TitleContains(needle) => {
                    q.push(" AND co.title ILIKE ").push_bind(like_pattern(needle));
                }
                CourseFilter::Circle(circle) => {
                    q.push(" AND co.id IN (SELECT course_id FROM circle_courses WHERE circle_id = ")
                        .push_bind(circle.get())
                        .push(")");
                }
                CourseFilter::Student(student) => {
                    q.push(
                        " AND (co.id IN (SELECT cc.course_id FROM circle_courses cc \
                         JOIN users u ON u.circle_id = cc.circle_id WHERE u.id = ",
                    )
                    .push_bind(student.get())
                    .push(
                        ") OR co.id IN (SELECT l.course_id FROM student_progress p \
                         JOIN lessons l ON l.id = p.lesson_id WHERE p.student_id = ",
                    )
                    .push_bind(student.get())
                    .push("))");
                }
            },
            "co.id",
            page,
        )
        .await
    }

    #[instrument(skip(self, draft), fields(course_id = %id), err)]
    async fn update_course(&self, id: CourseId, draft: &CourseDraft) -> StoreResult<CourseReadModel> {
        let updated: Option<i64> =
            sqlx::query_scalar("UPDATE courses SET title = $1, description = $2 WHERE id = $3 RETURNING id")
                .bind(&draft.title)
                .bind(&draft.description)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("update_course", e))?;
        updated.ok_or(StoreError::NotFound("course"))?;
        self.get_course(id).await
    }

    async fn delete_course(&self, id: CourseId) -> StoreResult<()> {
        self.delete_by_id("delete_course", "courses", id.get(), "course").await
    }
}

#[async_trait]
impl LessonRepository for PostgresAcademyStore {
    #[instrument(skip(self, draft), fields(course_id = %draft.course_id, order = ?draft.order), err)]
    async fn create_lesson(&self, draft: &LessonDraft) -> StoreResult<LessonReadModel> {
        let course = draft.course_id.get();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Row lock on the course serializes concurrent placements within it.
        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_course", e))?;
        if locked.is_none() {
            return Err(StoreError::NotFound("course"));
        }

        let position = match draft.order {
            None => {
                let max: Option<i32> = sqlx::query_scalar("SELECT MAX(position) FROM lessons WHERE course_id = $1")
                    .bind(course)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("max_position", e))?;
                next_order(max)
            }
            Some(order) => {
                sqlx::query("UPDATE lessons SET position = position + 1 WHERE course_id = $1 AND position >= $2")
                    .bind(course)
                    .bind(order)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("shift_positions", e))?;
                order
            }
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO lessons (title, description, position, course_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(position)
        .bind(course)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_lesson", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        self.get_lesson(LessonId::new(id)).await
    }

    async fn get_lesson(&self, id: LessonId) -> StoreResult<LessonReadModel> {
        self.fetch_by_id::<LessonRow, _>("get_lesson", LESSON_SELECT, "l.id", id.get(), "lesson")
            .await
    }

    async fn list_lessons(&self, course: CourseId, order: LessonOrder) -> StoreResult<Vec<LessonReadModel>> {
        self.ensure_exists("courses", course.get(), "course").await?;
        let order_by = match order {
            LessonOrder::Id => "l.id",
            LessonOrder::Position => "l.position, l.id",
        };
        self.fetch_list::<LessonRow, _>(
            "list_lessons",
            LESSON_SELECT,
            move |q| {
                q.push(" AND l.course_id = ").push_bind(course.get());
            },
            order_by,
        )
        .await
    }

    async fn max_lesson_order(&self, course: CourseId) -> StoreResult<Option<i32>> {
        self.ensure_exists("courses", course.get(), "course").await?;
        sqlx::query_scalar("SELECT MAX(position) FROM lessons WHERE course_id = $1")
            .bind(course.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("max_lesson_order", e))
    }

    #[instrument(skip(self, draft), fields(lesson_id = %id), err)]
    async fn update_lesson(&self, id: LessonId, draft: &LessonDraft) -> StoreResult<LessonReadModel> {
        self.ensure_exists("courses", draft.course_id.get(), "course").await?;
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE lessons
            SET title = $1, description = $2, course_id = $3, position = COALESCE($4, position)
            WHERE id = $5
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.course_id.get())
        .bind(draft.order)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_lesson", e))?;
        updated.ok_or(StoreError::NotFound("lesson"))?;
        self.get_lesson(id).await
    }

    async fn delete_lesson(&self, id: LessonId) -> StoreResult<()> {
        self.delete_by_id("delete_lesson", "lessons", id.get(), "lesson").await
    }
}

#[async_trait]
impl UserRepository for PostgresAcademyStore {
    #[instrument(skip(self, user), fields(username = %user.username, role = %user.role), err)]
    async fn create_user(&self, user: &NewUser) -> StoreResult<UserReadModel> {
        if let Some(circle) = user.circle_id {
            self.ensure_exists("circles", circle.get(), "circle").await?;
        }
        if let Some(mosque) = user.mosque_id {
            self.ensure_exists("mosques", mosque.get(), "mosque").await?;
        }
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password_hash, role, circle_id, mosque_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.circle_id.map(CircleId::get))
        .bind(user.mosque_id.map(MosqueId::get))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("create_user", e) {
            StoreError::Conflict(_) => StoreError::Conflict(format!("username '{}' already exists", user.username)),
            other => other,
        })?;
        self.get_user(UserId::new(id)).await
    }

    async fn get_user(&self, id: UserId) -> StoreResult<UserReadModel> {
        self.fetch_by_id::<UserRow, _>("get_user", USER_SELECT, "u.id", id.get(), "user")
            .await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserReadModel>> {
        let mut query = Builder::new(USER_SELECT);
        query.push(" WHERE u.username = ").push_bind(username.to_string());
        let row: Option<UserRow> = query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;
        Ok(row.map(UserReadModel::from))
    }

    async fn list_users(&self, filter: UserFilter, page: PageRequest) -> StoreResult<Page<UserReadModel>> {
        self.fetch_page::<UserRow, _>(
            "list_users",
            USER_SELECT,
            move |q| match filter {
                UserFilter::Role(role) => {
                    q.push(" AND u.role = ").push_bind(role.as_str());
                }
                UserFilter::Mosque(mosque) => {
                    q.push(" AND u.mosque_id = ").push_bind(mosque.get());
                }
                UserFilter::MosqueAndRole(mosque, role) => {
                    q.push(" AND u.mosque_id = ")
                        .push_bind(mosque.get())
                        .push(" AND u.role = ")
                        .push_bind(role.as_str());
                }
                UserFilter::StudentsInCircle(circle) => {
                    q.push(" AND u.role = 'STUDENT' AND u.circle_id = ")
                        .push_bind(circle.get());
                }
                UserFilter::AvailableTeachers(mosque) => {
                    q.push(" AND u.role = 'TEACHER' AND (u.mosque_id IS NULL OR u.mosque_id = ")
                        .push_bind(mosque.get())
                        .push(")");
                }
                UserFilter::UnassignedStudents(mosque) => {
                    q.push(" AND u.role = 'STUDENT' AND u.circle_id IS NULL AND u.mosque_id = ")
                        .push_bind(mosque.get());
                }
            },
            "u.id",
            page,
        )
        .await
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    async fn update_user(&self, id: UserId, changes: &UserChanges) -> StoreResult<UserReadModel> {
        if let Some(circle) = changes.circle_id {
            self.ensure_exists("circles", circle.get(), "circle").await?;
        }
        if let Some(mosque) = changes.mosque_id {
            self.ensure_exists("mosques", mosque.get(), "mosque").await?;
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET password_hash = COALESCE($1, password_hash),
                role = $2,
                circle_id = $3,
                mosque_id = $4,
                updated_at = NOW()
            WHERE id = $5
            RETURNING id
            "#,
        )
        .bind(&changes.password_hash)
        .bind(changes.role.as_str())
        .bind(changes.circle_id.map(CircleId::get))
        .bind(changes.mosque_id.map(MosqueId::get))
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        updated.ok_or(StoreError::NotFound("user"))?;

        // Only teachers lead circles.
        if changes.role != UserRole::Teacher {
            sqlx::query("UPDATE circles SET teacher_id = NULL WHERE teacher_id = $1")
                .bind(id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("release_circles", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        self.get_user(id).await
    }

    async fn password_hash(&self, id: UserId) -> StoreResult<String> {
        let hash: Option<String> = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("password_hash", e))?;
        hash.ok_or(StoreError::NotFound("user"))
    }

    #[instrument(skip(self, hash), fields(user_id = %id), err)]
    async fn set_password_hash(&self, id: UserId, hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(hash)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password_hash", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn set_user_circle(&self, id: UserId, circle: Option<CircleId>) -> StoreResult<()> {
        if let Some(circle) = circle {
            self.ensure_exists("circles", circle.get(), "circle").await?;
        }
        let result = sqlx::query("UPDATE users SET circle_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(circle.map(CircleId::get))
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_user_circle", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        self.delete_by_id("delete_user", "users", id.get(), "user").await
    }
}

#[async_trait]
impl ProgressRepository for PostgresAcademyStore {
    #[instrument(skip(self, draft), fields(student_id = %draft.student_id, lesson_id = %draft.lesson_id), err)]
    async fn create_progress(&self, draft: &ProgressDraft) -> StoreResult<ProgressReadModel> {
        self.ensure_exists("users", draft.student_id.get(), "user").await?;
        self.ensure_exists("lessons", draft.lesson_id.get(), "lesson").await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO student_progress (student_id, lesson_id, completed, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(draft.student_id.get())
        .bind(draft.lesson_id.get())
        .bind(draft.completed)
        .bind(&draft.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_progress", e))?;
        self.get_progress(ProgressId::new(id)).await
    }

    async fn get_progress(&self, id: ProgressId) -> StoreResult<ProgressReadModel> {
        self.fetch_by_id::<ProgressRow, _>("get_progress", PROGRESS_SELECT, "p.id", id.get(), "progress")
            .await
    }

    async fn list_progress(
        &self,
        student: UserId,
        course: CourseId,
        completed_only: bool,
    ) -> StoreResult<Vec<ProgressReadModel>> {
        self.fetch_list::<ProgressRow, _>(
            "list_progress",
            PROGRESS_SELECT,
            move |q| {
                q.push(" AND p.student_id = ")
                    .push_bind(student.get())
                    .push(" AND l.course_id = ")
                    .push_bind(course.get());
                if completed_only {
                    q.push(" AND p.completed");
                }
            },
            "p.id",
        )
        .await
    }

    async fn count_completed(&self, student: UserId, course: CourseId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM student_progress p
            JOIN lessons l ON l.id = p.lesson_id
            WHERE p.student_id = $1 AND l.course_id = $2 AND p.completed
            "#,
        )
        .bind(student.get())
        .bind(course.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_completed", e))?;
        Ok(count_of(count))
    }

    #[instrument(skip(self, draft), fields(progress_id = %id), err)]
    async fn update_progress(&self, id: ProgressId, draft: &ProgressDraft) -> StoreResult<ProgressReadModel> {
        self.ensure_exists("users", draft.student_id.get(), "user").await?;
        self.ensure_exists("lessons", draft.lesson_id.get(), "lesson").await?;
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE student_progress
            SET student_id = $1, lesson_id = $2, completed = $3, notes = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING id
            "#,
        )
        .bind(draft.student_id.get())
        .bind(draft.lesson_id.get())
        .bind(draft.completed)
        .bind(&draft.notes)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_progress", e))?;
        updated.ok_or(StoreError::NotFound("progress"))?;
        self.get_progress(id).await
    }

    async fn delete_progress(&self, id: ProgressId) -> StoreResult<()> {
        self.delete_by_id("delete_progress", "student_progress", id.get(), "progress")
            .await
    }
}

#[async_trait]
impl LogbookRepository for PostgresAcademyStore {
    #[instrument(skip(self, draft), fields(student_id = %draft.student_id, day = %draft.day), err)]
    async fn create_logbook(&self, draft: &LogbookDraft) -> StoreResult<LogbookReadModel> {
        self.ensure_exists("users", draft.student_id.get(), "user").await?;
        self.ensure_exists("courses", draft.course_id.get(), "course").await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO logbook (student_id, course_id, text, day)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(draft.student_id.get())
        .bind(draft.course_id.get())
        .bind(&draft.text)
        .bind(draft.day)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_logbook", e))?;
        self.get_logbook(LogbookId::new(id)).await
    }

    async fn get_logbook(&self, id: LogbookId) -> StoreResult<LogbookReadModel> {
        self.fetch_by_id::<LogbookRow, _>("get_logbook", LOGBOOK_SELECT, "lb.id", id.get(), "logbook entry")
            .await
    }

    async fn list_logbook(&self, filter: LogbookFilter, page: PageRequest) -> StoreResult<Page<LogbookReadModel>> {
        self.fetch_page::<LogbookRow, _>(
            "list_logbook",
            LOGBOOK_SELECT,
            move |q| match filter {
                LogbookFilter::StudentCourseDay { student, course, day } => {
                    q.push(" AND lb.student_id = ")
                        .push_bind(student.get())
                        .push(" AND lb.course_id = ")
                        .push_bind(course.get())
                        .push(" AND lb.day = ")
                        .push_bind(day);
                }
                LogbookFilter::StudentDay { student, day } => {
                    q.push(" AND lb.student_id = ")
                        .push_bind(student.get())
                        .push(" AND lb.day = ")
                        .push_bind(day);
                }
                LogbookFilter::StudentCourseRange { student, course, range } => {
                    q.push(" AND lb.student_id = ")
                        .push_bind(student.get())
                        .push(" AND lb.course_id = ")
                        .push_bind(course.get())
                        .push(" AND lb.day BETWEEN ")
                        .push_bind(range.start())
                        .push(" AND ")
                        .push_bind(range.end());
                }
                LogbookFilter::StudentCourse { student, course } => {
                    q.push(" AND lb.student_id = ")
                        .push_bind(student.get())
                        .push(" AND lb.course_id = ")
                        .push_bind(course.get());
                }
                LogbookFilter::CircleCourseDay { circle, course, day } => {
                    q.push(" AND lb.course_id = ")
                        .push_bind(course.get())
                        .push(" AND lb.day = ")
                        .push_bind(day)
                        .push(" AND lb.student_id IN (SELECT id FROM users WHERE circle_id = ")
                        .push_bind(circle.get())
                        .push(")");
                }
            },
            "lb.id",
            page,
        )
        .await
    }

    #[instrument(skip(self, draft), fields(logbook_id = %id), err)]
    async fn update_logbook(&self, id: LogbookId, draft: &LogbookDraft) -> StoreResult<LogbookReadModel> {
        self.ensure_exists("users", draft.student_id.get(), "user").await?;
        self.ensure_exists("courses", draft.course_id.get(), "course").await?;
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE logbook
            SET student_id = $1, course_id = $2, text = $3, day = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING id
            "#,
        )
        .bind(draft.student_id.get())
        .bind(draft.course_id.get())
        .bind(&draft.text)
        .bind(draft.day)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_logbook", e))?;
        updated.ok_or(StoreError::NotFound("logbook entry"))?;
        self.get_logbook(id).await
    }

    async fn delete_logbook(&self, id: LogbookId) -> StoreResult<()> {
        self.delete_by_id("delete_logbook", "logbook", id.get(), "logbook entry")
            .await
    }
}

#[async_trait]
impl NoteRepository for PostgresAcademyStore {
    #[instrument(skip(self, draft), fields(student_id = %draft.student_id), err)]
    async fn create_note(&self, draft: &NoteDraft, author: Option<UserId>) -> StoreResult<NoteReadModel> {
        self.ensure_exists("users", draft.student_id.get(), "user").await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO notes (student_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(draft.student_id.get())
        .bind(author.map(UserId::get))
        .bind(&draft.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_note", e))?;
        self.get_note(NoteId::new(id)).await
    }

    async fn get_note(&self, id: NoteId) -> StoreResult<NoteReadModel> {
        self.fetch_by_id::<NoteRow, _>("get_note", NOTE_SELECT, "n.id", id.get(), "note")
            .await
    }

    async fn list_notes(&self, student: UserId, page: PageRequest) -> StoreResult<Page<NoteReadModel>> {
        self.fetch_page::<NoteRow, _>(
            "list_notes",
            NOTE_SELECT,
            move |q| {
                q.push(" AND n.student_id = ").push_bind(student.get());
            },
            "n.id",
            page,
        )
        .await
    }

    #[instrument(skip(self, draft), fields(note_id = %id), err)]
    async fn update_note(&self, id: NoteId, draft: &NoteDraft) -> StoreResult<NoteReadModel> {
        self.ensure_exists("users", draft.student_id.get(), "user").await?;
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE notes SET student_id = $1, text = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING id
            "#,
        )
        .bind(draft.student_id.get())
        .bind(&draft.text)
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_note", e))?;
        updated.ok_or(StoreError::NotFound("note"))?;
        self.get_note(id).await
    }

    async fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        self.delete_by_id("delete_note", "notes", id.get(), "note").await
    }
}
