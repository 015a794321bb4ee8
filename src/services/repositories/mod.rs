//! One repository struct per data-model aggregate, each holding its own
//! `SqlitePool` handle. Narrow interfaces: a repository exposes only the
//! operations its callers actually need, not a generic CRUD surface.

pub mod appearance_repo;
pub mod cache_repo;
pub mod city_repo;
pub mod committee_repo;
pub mod council_repo;
pub mod item_repo;
pub mod matter_repo;
pub mod meeting_repo;
pub mod queue_repo;
pub mod vote_repo;

pub use appearance_repo::AppearanceRepo;
pub use cache_repo::CacheRepo;
pub use city_repo::CityRepo;
pub use committee_repo::CommitteeRepo;
pub use council_repo::CouncilRepo;
pub use item_repo::ItemRepo;
pub use matter_repo::MatterRepo;
pub use meeting_repo::MeetingRepo;
pub use queue_repo::QueueRepo;
pub use vote_repo::VoteRepo;
