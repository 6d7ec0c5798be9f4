mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod school;
pub use school::{School, SchoolCreate};

mod class;
pub use class::{CLASS_CODE_CONSTRAINT, DEFAULT_TOTAL_SESSIONS, SchoolClass, SchoolClassCreate};

mod student;
pub use student::{SKILL_LAB_ID_CONSTRAINT, Student, StudentCreate};

mod teacher;
pub use teacher::{TEACHER_EMPLOYEE_ID_CONSTRAINT, Teacher, TeacherCreate};

mod coordinator;
pub use coordinator::{COORDINATOR_EMPLOYEE_ID_CONSTRAINT, Coordinator, CoordinatorCreate};

mod parent;
pub use parent::{AccountStatus, PARENT_ID_CONSTRAINT, Parent, ParentCreate};

mod lesson;
pub use lesson::{Lesson, LessonCreate, LessonLevel, LessonStatus, completion_rate};

mod lesson_resource;
pub use lesson_resource::{LessonResource, LessonResourceCreate};
