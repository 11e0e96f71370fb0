//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts, where rows are authored

pub mod profile;
pub mod question;
pub mod question_option;
pub mod questionnaire;
pub mod response;
pub mod session;
