//! Request models with validation at construction
//!
//! All user input is validated before it reaches a repository.
//! Invalid input returns ValidationError, not panic.

pub mod dates;
pub mod kinds;
pub mod pagination;
pub mod resource;
pub mod text;
pub mod validation;

pub use dates::{parse_date, parse_datetime, parse_optional};
pub use kinds::{
    parse_activity, ActivityLevel, Difficulty, MealType, ParticipationStatus, Purpose, TipKind,
    UnitKind,
};
pub use pagination::{PageMeta, Paginated, Pagination, PaginationParams};
pub use resource::Resource;
pub use text::{Email, Score};
pub use validation::ValidationError;
