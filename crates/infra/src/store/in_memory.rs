use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use masjedi_academy::{
    CircleDraft, CircleReadModel, CourseDraft, CourseReadModel, LessonDraft, LessonReadModel, LogbookDraft,
    LogbookReadModel, MosqueDraft, MosqueReadModel, NewUser, NoteDraft, NoteReadModel, ProgressDraft,
    ProgressReadModel, UserChanges, UserReadModel, next_order,
};
use masjedi_core::{
    CircleId, CourseId, LessonId, LogbookId, MosqueId, NoteId, Page, PageRequest, ProgressId, UserId, UserRole,
};

use super::{
    CircleFilter, CircleRepository, CourseFilter, CourseRepository, LessonOrder, LessonRepository, LogbookFilter,
    LogbookRepository, MosqueFilter, MosqueRepository, NoteRepository, ProgressRepository, StoreError, StoreResult,
    UserFilter, UserRepository,
};

#[derive(Debug, Clone)]
struct MosqueRow {
    title: String,
    description: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CircleRow {
    title: String,
    mosque_id: MosqueId,
    teacher_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CourseRow {
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LessonRow {
    title: String,
    description: Option<String>,
    position: i32,
    course_id: CourseId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct UserRow {
    username: String,
    password_hash: String,
    role: UserRole,
    circle_id: Option<CircleId>,
    mosque_id: Option<MosqueId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ProgressRow {
    student_id: UserId,
    lesson_id: LessonId,
    completed: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LogbookRow {
    student_id: UserId,
    course_id: CourseId,
    text: String,
    day: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct NoteRow {
    student_id: UserId,
    author_id: Option<UserId>,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// All tables behind one lock, so multi-table writes (cascades, lesson
/// placement) are atomic with respect to readers.
#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    mosques: BTreeMap<MosqueId, MosqueRow>,
    circles: BTreeMap<CircleId, CircleRow>,
    circle_courses: BTreeSet<(CircleId, CourseId)>,
    courses: BTreeMap<CourseId, CourseRow>,
    lessons: BTreeMap<LessonId, LessonRow>,
    users: BTreeMap<UserId, UserRow>,
    progress: BTreeMap<ProgressId, ProgressRow>,
    logbook: BTreeMap<LogbookId, LogbookRow>,
    notes: BTreeMap<NoteId, NoteRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn mosque(&self, id: MosqueId) -> StoreResult<&MosqueRow> {
        self.mosques.get(&id).ok_or(StoreError::NotFound("mosque"))
    }

    fn circle(&self, id: CircleId) -> StoreResult<&CircleRow> {
        self.circles.get(&id).ok_or(StoreError::NotFound("circle"))
    }

    fn course(&self, id: CourseId) -> StoreResult<&CourseRow> {
        self.courses.get(&id).ok_or(StoreError::NotFound("course"))
    }

    fn lesson(&self, id: LessonId) -> StoreResult<&LessonRow> {
        self.lessons.get(&id).ok_or(StoreError::NotFound("lesson"))
    }

    fn user(&self, id: UserId) -> StoreResult<&UserRow> {
        self.users.get(&id).ok_or(StoreError::NotFound("user"))
    }

    fn require_teacher(&self, id: UserId) -> StoreResult<()> {
        if self.user(id)?.role != UserRole::Teacher {
            return Err(StoreError::InvalidReference(format!("user {id} is not a teacher")));
        }
        Ok(())
    }

    fn students_of(&self, circle: CircleId) -> impl Iterator<Item = (&UserId, &UserRow)> {
        self.users
            .iter()
            .filter(move |(_, u)| u.circle_id == Some(circle) && u.role == UserRole::Student)
    }

    fn mosque_rm(&self, id: MosqueId, row: &MosqueRow) -> MosqueReadModel {
        MosqueReadModel {
            id,
            title: row.title.clone(),
            description: row.description.clone(),
            location: row.location.clone(),
            number_of_circles: self.circles.values().filter(|c| c.mosque_id == id).count() as u64,
            created_at: row.created_at,
        }
    }

    fn circle_rm(&self, id: CircleId, row: &CircleRow) -> CircleReadModel {
        CircleReadModel {
            id,
            title: row.title.clone(),
            mosque_id: row.mosque_id,
            mosque_title: self
                .mosques
                .get(&row.mosque_id)
                .map(|m| m.title.clone())
                .unwrap_or_default(),
            teacher_id: row.teacher_id,
            teacher_name: row
                .teacher_id
                .and_then(|t| self.users.get(&t))
                .map(|u| u.username.clone()),
            number_of_students: self.students_of(id).count() as u64,
            number_of_courses: self.circle_courses.iter().filter(|(c, _)| *c == id).count() as u64,
            created_at: row.created_at,
        }
    }

    fn course_rm(&self, id: CourseId, row: &CourseRow) -> CourseReadModel {
        CourseReadModel {
            id,
            title: row.title.clone(),
            description: row.description.clone(),
            number_of_lessons: self.lessons.values().filter(|l| l.course_id == id).count() as u64,
            created_at: row.created_at,
        }
    }

    fn lesson_rm(id: LessonId, row: &LessonRow) -> LessonReadModel {
        LessonReadModel {
            id,
            title: row.title.clone(),
            description: row.description.clone(),
            order: row.position,
            course_id: row.course_id,
            created_at: row.created_at,
        }
    }

    fn user_rm(&self, id: UserId, row: &UserRow) -> UserReadModel {
        UserReadModel {
            id,
            username: row.username.clone(),
            role: row.role,
            circle_id: row.circle_id,
            circle_title: row.circle_id.and_then(|c| self.circles.get(&c)).map(|c| c.title.clone()),
            mosque_id: row.mosque_id,
            mosque_title: row.mosque_id.and_then(|m| self.mosques.get(&m)).map(|m| m.title.clone()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn progress_rm(&self, id: ProgressId, row: &ProgressRow) -> StoreResult<ProgressReadModel> {
        let lesson = self.lesson(row.lesson_id)?;
        Ok(ProgressReadModel {
            id,
            student_id: row.student_id,
            lesson_id: row.lesson_id,
            lesson_title: lesson.title.clone(),
            course_id: lesson.course_id,
            completed: row.completed,
            notes: row.notes.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn logbook_rm(&self, id: LogbookId, row: &LogbookRow) -> LogbookReadModel {
        LogbookReadModel {
            id,
            student_id: row.student_id,
            course_id: row.course_id,
            course_title: self
                .courses
                .get(&row.course_id)
                .map(|c| c.title.clone())
                .unwrap_or_default(),
            text: row.text.clone(),
            day: row.day,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn note_rm(&self, id: NoteId, row: &NoteRow) -> NoteReadModel {
        NoteReadModel {
            id,
            text: row.text.clone(),
            student_id: row.student_id,
            student_name: self
                .users
                .get(&row.student_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            author_id: row.author_id,
            author_name: row
                .author_id
                .and_then(|a| self.users.get(&a))
                .map(|u| u.username.clone()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn lesson_course(&self, lesson: LessonId) -> Option<CourseId> {
        self.lessons.get(&lesson).map(|l| l.course_id)
    }

    fn remove_circle(&mut self, id: CircleId) {
        self.circles.remove(&id);
        for user in self.users.values_mut().filter(|u| u.circle_id == Some(id)) {
            user.circle_id = None;
        }
        self.circle_courses.retain(|(c, _)| *c != id);
    }

    fn remove_lesson(&mut self, id: LessonId) {
        self.lessons.remove(&id);
        self.progress.retain(|_, p| p.lesson_id != id);
    }
}

/// Dev/test store holding every table in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAcademyStore {
    tables: RwLock<Tables>,
}

impl InMemoryAcademyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

#[async_trait]
impl MosqueRepository for InMemoryAcademyStore {
    async fn create_mosque(&self, draft: &MosqueDraft) -> StoreResult<MosqueReadModel> {
        let mut t = self.write();
        let id = MosqueId::new(t.next_id());
        let row = MosqueRow {
            title: draft.title.clone(),
            description: draft.description.clone(),
            location: draft.location.clone(),
            created_at: Utc::now(),
        };
        t.mosques.insert(id, row.clone());
        tracing::debug!(mosque_id = %id, "mosque created");
        Ok(t.mosque_rm(id, &row))
    }

    async fn get_mosque(&self, id: MosqueId) -> StoreResult<MosqueReadModel> {
        let t = self.read();
        let row = t.mosque(id)?;
        Ok(t.mosque_rm(id, row))
    }

    async fn list_mosques(&self, filter: &MosqueFilter, page: PageRequest) -> StoreResult<Page<MosqueReadModel>> {
        let t = self.read();
        let items = t
            .mosques
            .iter()
            .filter(|(_, m)| match filter {
                MosqueFilter::All => true,
                MosqueFilter::TitleContains(q) => contains_ignore_case(Some(m.title.as_str()), q),
                MosqueFilter::LocationContains(q) => contains_ignore_case(m.location.as_deref(), q),
            })
            .map(|(id, m)| t.mosque_rm(*id, m))
            .collect();
        Ok(Page::from_items(items, page))
    }

    async fn update_mosque(&self, id: MosqueId, draft: &MosqueDraft) -> StoreResult<MosqueReadModel> {
        let mut t = self.write();
        let row = t.mosques.get_mut(&id).ok_or(StoreError::NotFound("mosque"))?;
        row.title = draft.title.clone();
        row.description = draft.description.clone();
        row.location = draft.location.clone();
        let row = row.clone();
        Ok(t.mosque_rm(id, &row))
    }

    async fn delete_mosque(&self, id: MosqueId) -> StoreResult<()> {
        let mut t = self.write();
        t.mosques.remove(&id).ok_or(StoreError::NotFound("mosque"))?;
        let circles: Vec<CircleId> = t
            .circles
            .iter()
            .filter(|(_, c)| c.mosque_id == id)
            .map(|(cid, _)| *cid)
            .collect();
        for circle in circles {
            t.remove_circle(circle);
        }
        for user in t.users.values_mut().filter(|u| u.mosque_id == Some(id)) {
            user.mosque_id = None;
        }
        tracing::debug!(mosque_id = %id, "mosque deleted");
        Ok(())
    }
}

#[async_trait]
impl CircleRepository for InMemoryAcademyStore {
    async fn create_circle(&self, draft: &CircleDraft) -> StoreResult<CircleReadModel> {
        let mut t = self.write();
        t.mosque(draft.mosque_id)?;
        if let Some(teacher) = draft.teacher_id {
            t.require_teacher(teacher)?;
        }
        let id = CircleId::new(t.next_id());
        let row = CircleRow {
            title: draft.title.clone(),
            mosque_id: draft.mosque_id,
            teacher_id: draft.teacher_id,
            created_at: Utc::now(),
        };
        t.circles.insert(id, row.clone());
        tracing::debug!(circle_id = %id, "circle created");
        Ok(t.circle_rm(id, &row))
    }

    async fn get_circle(&self, id: CircleId) -> StoreResult<CircleReadModel> {
        let t = self.read();
        let row = t.circle(id)?;
        Ok(t.circle_rm(id, row))
    }

    async fn list_circles(&self, filter: CircleFilter, page: PageRequest) -> StoreResult<Page<CircleReadModel>> {
        let t = self.read();
        let items = t
            .circles
            .iter()
            .filter(|(id, c)| match filter {
                CircleFilter::Mosque(m) => c.mosque_id == m,
                CircleFilter::Teacher(u) => c.teacher_id == Some(u),
                CircleFilter::WithStudents => t.students_of(**id).next().is_some(),
                CircleFilter::WithoutTeacherInMosque(m) => c.mosque_id == m && c.teacher_id.is_none(),
            })
            .map(|(id, c)| t.circle_rm(*id, c))
            .collect();
        Ok(Page::from_items(items, page))
    }

    async fn update_circle(&self, id: CircleId, draft: &CircleDraft) -> StoreResult<CircleReadModel> {
        let mut t = self.write();
        t.circle(id)?;
        t.mosque(draft.mosque_id)?;
        if let Some(teacher) = draft.teacher_id {
            t.require_teacher(teacher)?;
        }
        let row = t.circles.get_mut(&id).ok_or(StoreError::NotFound("circle"))?;
        row.title = draft.title.clone();
        row.mosque_id = draft.mosque_id;
        row.teacher_id = draft.teacher_id;
        let row = row.clone();
        Ok(t.circle_rm(id, &row))
    }

    async fn set_circle_teacher(&self, id: CircleId, teacher: Option<UserId>) -> StoreResult<()> {
        let mut t = self.write();
        t.circle(id)?;
        if let Some(teacher) = teacher {
            t.require_teacher(teacher)?;
        }
        if let Some(row) = t.circles.get_mut(&id) {
            row.teacher_id = teacher;
        }
        Ok(())
    }

    async fn delete_circle(&self, id: CircleId) -> StoreResult<()> {
        let mut t = self.write();
        t.circle(id)?;
        t.remove_circle(id);
        tracing::debug!(circle_id = %id, "circle deleted");
        Ok(())
    }

    async fn link_course(&self, circle: CircleId, course: CourseId) -> StoreResult<()> {
        let mut t = self.write();
        t.circle(circle)?;
        t.course(course)?;
        t.circle_courses.insert((circle, course));
        Ok(())
    }

    async fn unlink_course(&self, circle: CircleId, course: CourseId) -> StoreResult<()> {
        let mut t = self.write();
        t.circle(circle)?;
        t.course(course)?;
        t.circle_courses.remove(&(circle, course));
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for InMemoryAcademyStore {
    async fn create_course(&self, draft: &CourseDraft) -> StoreResult<CourseReadModel> {
        let mut t = self.write();
        let id = CourseId::new(t.next_id());
        let row = CourseRow {
            title: draft.title.clone(),
            description: draft.description.clone(),
            created_at: Utc::now(),
        };
        t.courses.insert(id, row.clone());
        tracing::debug!(course_id = %id, "course created");
        Ok(t.course_rm(id, &row))
    }

    async fn get_course(&self, id: CourseId) -> StoreResult<CourseReadModel> {
        let t = self.read();
        let row = t.course(id)?;
        Ok(t.course_rm(id, row))
    }

    async fn list_courses(&self, filter: &CourseFilter, page: PageRequest) -> StoreResult<Page<CourseReadModel>> {
        let t = self.read();
        let student_courses: BTreeSet<CourseId> = match filter {
            CourseFilter::Student(student) => {
                let circle = t.users.get(student).and_then(|u| u.circle_id);
                let via_circle = t
                    .circle_courses
                    .iter()
                    .filter(|(c, _)| Some(*c) == circle)
                    .map(|(_, course)| *course);
                let via_progress = t
                    .progress
                    .values()
                    .filter(|p| p.student_id == *student)
                    .filter_map(|p| t.lesson_course(p.lesson_id));
                via_circle.chain(via_progress).collect()
            }
            _ => BTreeSet::new(),
        };
        let items = t
            .courses
            .iter()
            .filter(|(id, c)| match filter {
                CourseFilter::All => true,
                CourseFilter::TitleContains(q) => contains_ignore_case(Some(c.title.as_str()), q),
                CourseFilter::Circle(circle) => t.circle_courses.contains(&(*circle, **id)),
                CourseFilter::Student(_) => student_courses.contains(*id),
            })
            .map(|(id, c)| t.course_rm(*id, c))
            .collect();
        Ok(Page::from_items(items, page))
    }

    async fn update_course(&self, id: CourseId, draft: &CourseDraft) -> StoreResult<CourseReadModel> {
        let mut t = self.write();
        let row = t.courses.get_mut(&id).ok_or(StoreError::NotFound("course"))?;
        row.title = draft.title.clone();
        row.description = draft.description.clone();
        let row = row.clone();
        Ok(t.course_rm(id, &row))
    }

    async fn delete_course(&self, id: CourseId) -> StoreResult<()> {
        let mut t = self.write();
        t.courses.remove(&id).ok_or(StoreError::NotFound("course"))?;
        let lessons: Vec<LessonId> = t
            .lessons
            .iter()
            .filter(|(_, l)| l.course_id == id)
            .map(|(lid, _)| *lid)
            .collect();
        for lesson in lessons {
            t.remove_lesson(lesson);
        }
        t.logbook.retain(|_, e| e.course_id != id);
        t.circle_courses.retain(|(_, c)| *c != id);
        tracing::debug!(course_id = %id, "course deleted");
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for InMemoryAcademyStore {
    async fn create_lesson(&self, draft: &LessonDraft) -> StoreResult<LessonReadModel> {
        let mut t = self.write();
        t.course(draft.course_id)?;
        let position = match draft.order {
            None => next_order(
                t.lessons
                    .values()
                    .filter(|l| l.course_id == draft.course_id)
                    .map(|l| l.position)
                    .max(),
            ),
            Some(order) => {
                for lesson in t
                    .lessons
                    .values_mut()
                    .filter(|l| l.course_id == draft.course_id && l.position >= order)
                {
                    lesson.position += 1;
                }
                order
            }
        };
        let id = LessonId::new(t.next_id());
        let row = LessonRow {
            title: draft.title.clone(),
            description: draft.description.clone(),
            position,
            course_id: draft.course_id,
            created_at: Utc::now(),
        };
        t.lessons.insert(id, row.clone());
        tracing::debug!(lesson_id = %id, position, "lesson created");
        Ok(Tables::lesson_rm(id, &row))
    }

    async fn get_lesson(&self, id: LessonId) -> StoreResult<LessonReadModel> {
        let t = self.read();
        Ok(Tables::lesson_rm(id, t.lesson(id)?))
    }

    async fn list_lessons(&self, course: CourseId, order: LessonOrder) -> StoreResult<Vec<LessonReadModel>> {
        let t = self.read();
        t.course(course)?;
        let mut items: Vec<LessonReadModel> = t
            .lessons
            .iter()
            .filter(|(_, l)| l.course_id == course)
            .map(|(id, l)| Tables::lesson_rm(*id, l))
            .collect();
        if order == LessonOrder::Position {
            items.sort_by_key(|l| (l.order, l.id));
        }
        Ok(items)
    }

    async fn max_lesson_order(&self, course: CourseId) -> StoreResult<Option<i32>> {
        let t = self.read();
        t.course(course)?;
        Ok(t.lessons
            .values()
            .filter(|l| l.course_id == course)
            .map(|l| l.position)
            .max())
    }

    async fn update_lesson(&self, id: LessonId, draft: &LessonDraft) -> StoreResult<LessonReadModel> {
        let mut t = self.write();
        t.lesson(id)?;
        t.course(draft.course_id)?;
        let row = t.lessons.get_mut(&id).ok_or(StoreError::NotFound("lesson"))?;
        row.title = draft.title.clone();
        row.description = draft.description.clone();
        row.course_id = draft.course_id;
        if let Some(order) = draft.order {
            row.position = order;
        }
        Ok(Tables::lesson_rm(id, row))
    }

    async fn delete_lesson(&self, id: LessonId) -> StoreResult<()> {
        let mut t = self.write();
        t.lesson(id)?;
        t.remove_lesson(id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryAcademyStore {
    async fn create_user(&self, user: &NewUser) -> StoreResult<UserReadModel> {
        let mut t = self.write();
        if t.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!("username '{}' already exists", user.username)));
        }
        if let Some(circle) = user.circle_id {
            t.circle(circle)?;
        }
        if let Some(mosque) = user.mosque_id {
            t.mosque(mosque)?;
        }
        let id = UserId::new(t.next_id());
        let now = Utc::now();
        let row = UserRow {
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            circle_id: user.circle_id,
            mosque_id: user.mosque_id,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(id, row.clone());
        tracing::debug!(user_id = %id, role = %user.role, "user created");
        Ok(t.user_rm(id, &row))
    }

    async fn get_user(&self, id: UserId) -> StoreResult<UserReadModel> {
        let t = self.read();
        let row = t.user(id)?;
        Ok(t.user_rm(id, row))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserReadModel>> {
        let t = self.read();
        Ok(t.users
            .iter()
            .find(|(_, u)| u.username == username)
            .map(|(id, u)| t.user_rm(*id, u)))
    }

    async fn list_users(&self, filter: UserFilter, page: PageRequest) -> StoreResult<Page<UserReadModel>> {
        let t = self.read();
        let items = t
            .users
            .iter()
            .filter(|(_, u)| match filter {
                UserFilter::Role(role) => u.role == role,
                UserFilter::Mosque(m) => u.mosque_id == Some(m),
                UserFilter::MosqueAndRole(m, role) => u.mosque_id == Some(m) && u.role == role,
                UserFilter::StudentsInCircle(c) => u.circle_id == Some(c) && u.role == UserRole::Student,
                UserFilter::AvailableTeachers(m) => {
                    u.role == UserRole::Teacher && (u.mosque_id == Some(m) || u.mosque_id.is_none())
                }
                UserFilter::UnassignedStudents(m) => {
                    u.role == UserRole::Student && u.mosque_id == Some(m) && u.circle_id.is_none()
                }
            })
            .map(|(id, u)| t.user_rm(*id, u))
            .collect();
        Ok(Page::from_items(items, page))
    }

    async fn update_user(&self, id: UserId, changes: &UserChanges) -> StoreResult<UserReadModel> {
        let mut t = self.write();
        t.user(id)?;
        if let Some(circle) = changes.circle_id {
            t.circle(circle)?;
        }
        if let Some(mosque) = changes.mosque_id {
            t.mosque(mosque)?;
        }
        let row = t.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        if let Some(hash) = &changes.password_hash {
            row.password_hash = hash.clone();
        }
        row.role = changes.role;
        row.circle_id = changes.circle_id;
        row.mosque_id = changes.mosque_id;
        row.updated_at = Utc::now();
        let row = row.clone();
        // Only teachers lead circles.
        if changes.role != UserRole::Teacher {
            for circle in t.circles.values_mut().filter(|c| c.teacher_id == Some(id)) {
                circle.teacher_id = None;
            }
        }
        Ok(t.user_rm(id, &row))
    }

    async fn password_hash(&self, id: UserId) -> StoreResult<String> {
        Ok(self.read().user(id)?.password_hash.clone())
    }

    async fn set_password_hash(&self, id: UserId, hash: &str) -> StoreResult<()> {
        let mut t = self.write();
        let row = t.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        row.password_hash = hash.to_string();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn set_user_circle(&self, id: UserId, circle: Option<CircleId>) -> StoreResult<()> {
        let mut t = self.write();
        t.user(id)?;
        if let Some(circle) = circle {
            t.circle(circle)?;
        }
        if let Some(row) = t.users.get_mut(&id) {
            row.circle_id = circle;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut t = self.write();
        t.users.remove(&id).ok_or(StoreError::NotFound("user"))?;
        t.progress.retain(|_, p| p.student_id != id);
        t.logbook.retain(|_, e| e.student_id != id);
        t.notes.retain(|_, n| n.student_id != id);
        for note in t.notes.values_mut().filter(|n| n.author_id == Some(id)) {
            note.author_id = None;
        }
        for circle in t.circles.values_mut().filter(|c| c.teacher_id == Some(id)) {
            circle.teacher_id = None;
        }
        tracing::debug!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryAcademyStore {
    async fn create_progress(&self, draft: &ProgressDraft) -> StoreResult<ProgressReadModel> {
        let mut t = self.write();
        t.user(draft.student_id)?;
        t.lesson(draft.lesson_id)?;
        let id = ProgressId::new(t.next_id());
        let now = Utc::now();
        let row = ProgressRow {
            student_id: draft.student_id,
            lesson_id: draft.lesson_id,
            completed: draft.completed,
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        t.progress.insert(id, row.clone());
        tracing::debug!(progress_id = %id, "progress recorded");
        t.progress_rm(id, &row)
    }

    async fn get_progress(&self, id: ProgressId) -> StoreResult<ProgressReadModel> {
        let t = self.read();
        let row = t.progress.get(&id).ok_or(StoreError::NotFound("progress"))?;
        t.progress_rm(id, row)
    }

    async fn list_progress(
        &self,
        student: UserId,
        course: CourseId,
        completed_only: bool,
    ) -> StoreResult<Vec<ProgressReadModel>> {
        let t = self.read();
        t.progress
            .iter()
            .filter(|(_, p)| {
                p.student_id == student
                    && t.lesson_course(p.lesson_id) == Some(course)
                    && (!completed_only || p.completed)
            })
            .map(|(id, p)| t.progress_rm(*id, p))
            .collect()
    }

    async fn count_completed(&self, student: UserId, course: CourseId) -> StoreResult<u64> {
        let t = self.read();
        Ok(t.progress
            .values()
            .filter(|p| p.student_id == student && p.completed && t.lesson_course(p.lesson_id) == Some(course))
            .count() as u64)
    }

    async fn update_progress(&self, id: ProgressId, draft: &ProgressDraft) -> StoreResult<ProgressReadModel> {
        let mut t = self.write();
        t.user(draft.student_id)?;
        t.lesson(draft.lesson_id)?;
        let row = t.progress.get_mut(&id).ok_or(StoreError::NotFound("progress"))?;
        row.student_id = draft.student_id;
        row.lesson_id = draft.lesson_id;
        row.completed = draft.completed;
        row.notes = draft.notes.clone();
        row.updated_at = Utc::now();
        let row = row.clone();
        t.progress_rm(id, &row)
    }

    async fn delete_progress(&self, id: ProgressId) -> StoreResult<()> {
        self.write()
            .progress
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("progress"))
    }
}

#[async_trait]
impl LogbookRepository for InMemoryAcademyStore {
    async fn create_logbook(&self, draft: &LogbookDraft) -> StoreResult<LogbookReadModel> {
        let mut t = self.write();
        t.user(draft.student_id)?;
        t.course(draft.course_id)?;
        let id = LogbookId::new(t.next_id());
        let now = Utc::now();
        let row = LogbookRow {
            student_id: draft.student_id,
            course_id: draft.course_id,
            text: draft.text.clone(),
            day: draft.day,
            created_at: now,
            updated_at: now,
        };
        t.logbook.insert(id, row.clone());
        tracing::debug!(logbook_id = %id, "logbook entry created");
        Ok(t.logbook_rm(id, &row))
    }

    async fn get_logbook(&self, id: LogbookId) -> StoreResult<LogbookReadModel> {
        let t = self.read();
        let row = t.logbook.get(&id).ok_or(StoreError::NotFound("logbook entry"))?;
        Ok(t.logbook_rm(id, row))
    }

    async fn list_logbook(&self, filter: LogbookFilter, page: PageRequest) -> StoreResult<Page<LogbookReadModel>> {
        let t = self.read();
        let items = t
            .logbook
            .iter()
            .filter(|(_, e)| match filter {
                LogbookFilter::StudentCourseDay { student, course, day } => {
                    e.student_id == student && e.course_id == course && e.day == day
                }
                LogbookFilter::StudentDay { student, day } => e.student_id == student && e.day == day,
                LogbookFilter::StudentCourseRange { student, course, range } => {
                    e.student_id == student && e.course_id == course && range.contains(e.day)
                }
                LogbookFilter::StudentCourse { student, course } => e.student_id == student && e.course_id == course,
                LogbookFilter::CircleCourseDay { circle, course, day } => {
                    e.course_id == course
                        && e.day == day
                        && t.users.get(&e.student_id).and_then(|u| u.circle_id) == Some(circle)
                }
            })
            .map(|(id, e)| t.logbook_rm(*id, e))
            .collect();
        Ok(Page::from_items(items, page))
    }

    async fn update_logbook(&self, id: LogbookId, draft: &LogbookDraft) -> StoreResult<LogbookReadModel> {
        let mut t = self.write();
        t.user(draft.student_id)?;
        t.course(draft.course_id)?;
        let row = t.logbook.get_mut(&id).ok_or(StoreError::NotFound("logbook entry"))?;
        row.student_id = draft.student_id;
        row.course_id = draft.course_id;
        row.text = draft.text.clone();
        row.day = draft.day;
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(t.logbook_rm(id, &row))
    }

    async fn delete_logbook(&self, id: LogbookId) -> StoreResult<()> {
        self.write()
            .logbook
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("logbook entry"))
    }
}

#[async_trait]
impl NoteRepository for InMemoryAcademyStore {
    async fn create_note(&self, draft: &NoteDraft, author: Option<UserId>) -> StoreResult<NoteReadModel> {
        let mut t = self.write();
        t.user(draft.student_id)?;
        if let Some(author) = author {
            t.user(author)?;
        }
        let id = NoteId::new(t.next_id());
        let now = Utc::now();
        let row = NoteRow {
            student_id: draft.student_id,
            author_id: author,
            text: draft.text.clone(),
            created_at: now,
            updated_at: now,
        };
        t.notes.insert(id, row.clone());
        tracing::debug!(note_id = %id, "note created");
        Ok(t.note_rm(id, &row))
    }

    async fn get_note(&self, id: NoteId) -> StoreResult<NoteReadModel> {
        let t = self.read();
        let row = t.notes.get(&id).ok_or(StoreError::NotFound("note"))?;
        Ok(t.note_rm(id, row))
    }

    async fn list_notes(&self, student: UserId, page: PageRequest) -> StoreResult<Page<NoteReadModel>> {
        let t = self.read();
        let items = t
            .notes
            .iter()
            .filter(|(_, n)| n.student_id == student)
            .map(|(id, n)| t.note_rm(*id, n))
            .collect();
        Ok(Page::from_items(items, page))
    }

    async fn update_note(&self, id: NoteId, draft: &NoteDraft) -> StoreResult<NoteReadModel> {
        let mut t = self.write();
        t.user(draft.student_id)?;
        let row = t.notes.get_mut(&id).ok_or(StoreError::NotFound("note"))?;
        row.student_id = draft.student_id;
        row.text = draft.text.clone();
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(t.note_rm(id, &row))
    }

    async fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        self.write()
            .notes
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("note"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use masjedi_academy::UserDraft;

    async fn user(store: &InMemoryAcademyStore, name: &str, role: UserRole) -> UserReadModel {
        let draft = UserDraft::new(name, "password", role, None, None).unwrap();
        store.create_user(&draft.into_new_user("hash".into())).await.unwrap()
    }

    async fn course_with_lessons(store: &InMemoryAcademyStore, n: usize) -> (CourseId, Vec<LessonId>) {
        let course = store
            .create_course(&CourseDraft::new("Tajweed", None).unwrap())
            .await
            .unwrap();
        let mut ids = Vec::new();
        for i in 0..n {
            let lesson = store
                .create_lesson(&LessonDraft::new(format!("L{i}"), None, None, course.id).unwrap())
                .await
                .unwrap();
            ids.push(lesson.id);
        }
        (course.id, ids)
    }

    #[tokio::test]
    async fn lessons_without_order_are_appended() {
        let store = InMemoryAcademyStore::new();
        let (course, _) = course_with_lessons(&store, 3).await;
        let orders: Vec<i32> = store
            .list_lessons(course, LessonOrder::Position)
            .await
            .unwrap()
            .iter()
            .map(|l| l.order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(store.max_lesson_order(course).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn explicit_order_shifts_later_lessons() {
        let store = InMemoryAcademyStore::new();
        let (course, ids) = course_with_lessons(&store, 3).await;
        let inserted = store
            .create_lesson(&LessonDraft::new("Inserted", None, Some(2), course).unwrap())
            .await
            .unwrap();
        assert_eq!(inserted.order, 2);
        assert_eq!(store.get_lesson(ids[0]).await.unwrap().order, 1);
        assert_eq!(store.get_lesson(ids[1]).await.unwrap().order, 3);
        assert_eq!(store.get_lesson(ids[2]).await.unwrap().order, 4);
    }

    #[tokio::test]
    async fn max_order_of_empty_course_is_none() {
        let store = InMemoryAcademyStore::new();
        let (course, _) = course_with_lessons(&store, 0).await;
        assert_eq!(store.max_lesson_order(course).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_mosque_removes_circles_and_detaches_students() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let circle = store
            .create_circle(&CircleDraft::new("Circle A", mosque.id, None).unwrap())
            .await
            .unwrap();
        let student = user(&store, "s1", UserRole::Student).await;
        store.set_user_circle(student.id, Some(circle.id)).await.unwrap();
        assert_eq!(store.get_circle(circle.id).await.unwrap().number_of_students, 1);
        assert_eq!(store.get_mosque(mosque.id).await.unwrap().number_of_circles, 1);

        store.delete_mosque(mosque.id).await.unwrap();

        assert_eq!(store.get_circle(circle.id).await, Err(StoreError::NotFound("circle")));
        assert_eq!(store.get_user(student.id).await.unwrap().circle_id, None);
    }

    #[tokio::test]
    async fn deleting_course_removes_lessons_progress_and_logbook() {
        let store = InMemoryAcademyStore::new();
        let (course, lessons) = course_with_lessons(&store, 1).await;
        let student = user(&store, "s1", UserRole::Student).await;
        let progress = store
            .create_progress(&ProgressDraft::new(student.id, lessons[0], true, None))
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let entry = store
            .create_logbook(&LogbookDraft::new(student.id, course, "Read page 3", day).unwrap())
            .await
            .unwrap();

        store.delete_course(course).await.unwrap();

        assert!(store.get_lesson(lessons[0]).await.is_err());
        assert!(store.get_progress(progress.id).await.is_err());
        assert!(store.get_logbook(entry.id).await.is_err());
    }

    #[tokio::test]
    async fn deleting_teacher_keeps_circle_and_clears_note_author() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let teacher = user(&store, "t1", UserRole::Teacher).await;
        let student = user(&store, "s1", UserRole::Student).await;
        let circle = store
            .create_circle(&CircleDraft::new("Circle A", mosque.id, Some(teacher.id)).unwrap())
            .await
            .unwrap();
        assert_eq!(circle.teacher_name.as_deref(), Some("t1"));
        let note = store
            .create_note(&NoteDraft::new("Good recitation", student.id).unwrap(), Some(teacher.id))
            .await
            .unwrap();
        assert_eq!(note.author_name.as_deref(), Some("t1"));

        store.delete_user(teacher.id).await.unwrap();

        assert_eq!(store.get_circle(circle.id).await.unwrap().teacher_id, None);
        assert_eq!(store.get_note(note.id).await.unwrap().author_id, None);
    }

    #[tokio::test]
    async fn progress_carries_its_lesson_and_course() {
        let store = InMemoryAcademyStore::new();
        let (course, lessons) = course_with_lessons(&store, 2).await;
        let student = user(&store, "s1", UserRole::Student).await;
        let progress = store
            .create_progress(&ProgressDraft::new(student.id, lessons[1], false, None))
            .await
            .unwrap();
        assert_eq!(progress.course_id, course);
        assert_eq!(progress.lesson_title, "L1");

        let listed = store.list_progress(student.id, course, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].course_id, course);
    }

    #[tokio::test]
    async fn demoting_teacher_releases_their_circles() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let teacher = user(&store, "ustadh", UserRole::Teacher).await;
        let circle = store
            .create_circle(&CircleDraft::new("Circle A", mosque.id, Some(teacher.id)).unwrap())
            .await
            .unwrap();

        let changes = UserChanges {
            password_hash: None,
            role: UserRole::Student,
            circle_id: None,
            mosque_id: None,
        };
        let demoted = store.update_user(teacher.id, &changes).await.unwrap();
        assert_eq!(demoted.role, UserRole::Student);

        let circle = store.get_circle(circle.id).await.unwrap();
        assert_eq!(circle.teacher_id, None);
        assert_eq!(circle.teacher_name, None);
    }

    #[tokio::test]
    async fn teacher_update_keeps_their_circles() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let teacher = user(&store, "ustadh", UserRole::Teacher).await;
        let circle = store
            .create_circle(&CircleDraft::new("Circle A", mosque.id, Some(teacher.id)).unwrap())
            .await
            .unwrap();

        let changes = UserChanges {
            password_hash: None,
            role: UserRole::Teacher,
            circle_id: None,
            mosque_id: Some(mosque.id),
        };
        store.update_user(teacher.id, &changes).await.unwrap();

        assert_eq!(store.get_circle(circle.id).await.unwrap().teacher_id, Some(teacher.id));
    }

    #[tokio::test]
    async fn non_teacher_cannot_lead_a_circle() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let student = user(&store, "s1", UserRole::Student).await;
        let err = store
            .create_circle(&CircleDraft::new("Circle A", mosque.id, Some(student.id)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = InMemoryAcademyStore::new();
        user(&store, "amina", UserRole::Student).await;
        let draft = UserDraft::new("amina", "password", UserRole::Teacher, None, None).unwrap();
        let err = store.create_user(&draft.into_new_user("h".into())).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn student_courses_union_circle_links_and_progress() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let circle = store
            .create_circle(&CircleDraft::new("Circle A", mosque.id, None).unwrap())
            .await
            .unwrap();
        let (linked, _) = course_with_lessons(&store, 0).await;
        let (studied, studied_lessons) = course_with_lessons(&store, 1).await;
        let (_unrelated, _) = course_with_lessons(&store, 0).await;
        let student = user(&store, "s1", UserRole::Student).await;
        store.set_user_circle(student.id, Some(circle.id)).await.unwrap();
        store.link_course(circle.id, linked).await.unwrap();
        store.link_course(circle.id, linked).await.unwrap();
        store
            .create_progress(&ProgressDraft::new(student.id, studied_lessons[0], false, None))
            .await
            .unwrap();

        let courses = store
            .list_courses(&CourseFilter::Student(student.id), PageRequest::unpaged())
            .await
            .unwrap();
        let ids: Vec<CourseId> = courses.content.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![linked, studied]);
        assert_eq!(store.get_circle(circle.id).await.unwrap().number_of_courses, 1);
    }

    #[tokio::test]
    async fn logbook_range_and_circle_filters() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let circle = store
            .create_circle(&CircleDraft::new("Circle A", mosque.id, None).unwrap())
            .await
            .unwrap();
        let (course, _) = course_with_lessons(&store, 0).await;
        let student = user(&store, "s1", UserRole::Student).await;
        store.set_user_circle(student.id, Some(circle.id)).await.unwrap();
        for d in 1..=5 {
            let day = NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
            store
                .create_logbook(&LogbookDraft::new(student.id, course, format!("day {d}"), day).unwrap())
                .await
                .unwrap();
        }
        let range = masjedi_academy::DateRange::new(
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 4).unwrap(),
        )
        .unwrap();
        let in_range = store
            .list_logbook(
                LogbookFilter::StudentCourseRange { student: student.id, course, range },
                PageRequest::unpaged(),
            )
            .await
            .unwrap();
        assert_eq!(in_range.total_elements, 3);

        let day = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        let by_circle = store
            .list_logbook(LogbookFilter::CircleCourseDay { circle: circle.id, course, day }, PageRequest::unpaged())
            .await
            .unwrap();
        assert_eq!(by_circle.content.len(), 1);
        assert_eq!(by_circle.content[0].text, "day 5");
    }

    #[tokio::test]
    async fn user_filters_select_available_teachers_and_unassigned_students() {
        let store = InMemoryAcademyStore::new();
        let mosque = store
            .create_mosque(&MosqueDraft::new("Al-Huda", None, None).unwrap())
            .await
            .unwrap();
        let other = store
            .create_mosque(&MosqueDraft::new("Al-Falah", None, None).unwrap())
            .await
            .unwrap();
        let free_teacher = user(&store, "t-free", UserRole::Teacher).await;
        let local = NewUser {
            username: "t-local".into(),
            password_hash: "h".into(),
            role: UserRole::Teacher,
            circle_id: None,
            mosque_id: Some(mosque.id),
        };
        let local_teacher = store.create_user(&local).await.unwrap();
        let elsewhere = NewUser {
            username: "t-else".into(),
            mosque_id: Some(other.id),
            ..local.clone()
        };
        store.create_user(&elsewhere).await.unwrap();
        let student = NewUser {
            username: "s-free".into(),
            role: UserRole::Student,
            ..local
        };
        let student = store.create_user(&student).await.unwrap();

        let teachers = store
            .list_users(UserFilter::AvailableTeachers(mosque.id), PageRequest::unpaged())
            .await
            .unwrap();
        let ids: Vec<UserId> = teachers.content.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![free_teacher.id, local_teacher.id]);

        let unassigned = store
            .list_users(UserFilter::UnassignedStudents(mosque.id), PageRequest::unpaged())
            .await
            .unwrap();
        assert_eq!(unassigned.content.len(), 1);
        assert_eq!(unassigned.content[0].id, student.id);
        assert_eq!(unassigned.content[0].mosque_title.as_deref(), Some("Al-Huda"));
    }

    #[tokio::test]
    async fn title_search_is_case_insensitive_and_paged() {
        let store = InMemoryAcademyStore::new();
        for title in ["Masjid Al-Noor", "Noor Center", "Al-Huda"] {
            store
                .create_mosque(&MosqueDraft::new(title, None, None).unwrap())
                .await
                .unwrap();
        }
        let page = store
            .list_mosques(&MosqueFilter::TitleContains("noor".into()), PageRequest::new(Some(0), Some(1)))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.content[0].title, "Masjid Al-Noor");
    }
}
