pub mod collection_ext;
pub mod error;
pub mod hashing;
pub mod scheduled_executor;
pub mod string_ext;

pub use collection_ext::{group_by, unique_ordered, vec_to_map};
pub use error::{CoreError, CoreResult};
pub use scheduled_executor::{ScheduledExecutor, ScheduledTask};
pub use string_ext::{clean_optional_string, StringExt};
