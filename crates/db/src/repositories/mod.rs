//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod batch_repo;
pub mod course_repo;
pub mod enrollment_repo;
pub mod lesson_repo;
pub mod module_repo;
pub mod user_repo;

pub use batch_repo::BatchRepo;
pub use course_repo::CourseRepo;
pub use enrollment_repo::EnrollmentRepo;
pub use lesson_repo::LessonRepo;
pub use module_repo::ModuleRepo;
pub use user_repo::UserRepo;
