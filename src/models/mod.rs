pub mod appearance;
pub mod cache;
pub mod city;
pub mod committee;
pub mod council;
pub mod item;
pub mod matter;
pub mod matter_filter;
pub mod meeting;
pub mod queue;
pub mod topic;
pub mod vote;

pub use appearance::{MatterAppearance, VoteOutcome, VoteTally};
pub use cache::ProcessingCacheEntry;
pub use city::{City, CityStatus, Vendor};
pub use committee::{Committee, CommitteeMembership};
pub use council::{normalize_member_name, CouncilMember};
pub use item::{AgendaItem, Attachment, AttachmentType};
pub use matter::{preferred_matter_key, Matter, MatterStatus};
pub use meeting::{Meeting, MeetingStatus, Participation, ProcessingStatus};
pub use queue::{priority_for_days_until, retry_backoff_secs, JobStatus, JobType, QueueJob};
pub use topic::{is_canonical, CANONICAL_TOPICS};
pub use vote::{Vote, VoteValue};
