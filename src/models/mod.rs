mod chat_group;
mod file;
mod message;
mod organization;
mod project;
mod task;
mod user;

pub use chat_group::{ChatGroup, ParticipantEntry, ParticipantRole};
pub use file::{FileRecord, FileType};
pub use message::Message;
pub use organization::Organization;
pub use project::{Project, ProjectStatus, TeamMemberEntry, TeamRole};
pub use task::{Task, TaskPriority, TaskStatus};
pub use user::User;
