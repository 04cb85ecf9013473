pub mod cloud;
pub mod error;
pub mod gcp;
pub mod local;

pub use cloud::CloudApi;
pub use error::DriverError;
pub use gcp::GcpCloud;
pub use local::{Call, LocalCloud, LocalSecret, LocalState};
