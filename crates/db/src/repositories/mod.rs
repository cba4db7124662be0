pub mod device_session_repo;
pub mod identity_repo;

pub use device_session_repo::DeviceSessionRepo;
pub use identity_repo::IdentityRepo;
