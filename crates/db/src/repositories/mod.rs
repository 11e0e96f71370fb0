//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod profile_repo;
pub mod question_option_repo;
pub mod question_repo;
pub mod questionnaire_repo;
pub mod response_repo;
pub mod session_repo;

pub use profile_repo::ProfileRepo;
pub use question_option_repo::QuestionOptionRepo;
pub use question_repo::QuestionRepo;
pub use questionnaire_repo::QuestionnaireRepo;
pub use response_repo::ResponseRepo;
pub use session_repo::SessionRepo;
