pub mod records;
pub mod user;

pub use records::{ClientRecord, Section, ServiceOffering, UnknownSection};
pub use user::UserProfile;
