// cdm-api: Async Rust client for the CDM appliance REST API

pub mod classify;
pub mod credentials;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod job;
pub mod reconcile;
pub mod resolve;
pub mod transport;
pub mod url_codec;
pub mod value;

pub use classify::DispatchResult;
pub use credentials::Credentials;
pub use dispatch::{Dispatcher, Method};
pub use endpoint::ApiVersion;
pub use error::Error;
pub use job::{JobHandle, JobPoller, JobReport, JobStatus};
pub use reconcile::{StripFields, is_equivalent, matches_after, matches_stripped};
pub use resolve::{HostOs, ObjectResolver, ObjectType};
pub use transport::{TlsMode, TransportConfig};
pub use value::ValueExt;
