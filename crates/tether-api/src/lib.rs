// tether-api: contract between a hosted backend client and the tether reactive layer.
//
// Defines the event envelope the backend delivers, the subscription handle
// it vends, and the traits (`Backend`, `AuthStore`) a concrete client
// library implements. The wire protocol itself lives behind those traits.

pub mod auth;
pub mod backend;
pub mod error;
pub mod record;
pub mod subscription;

pub use auth::AuthStore;
pub use backend::{Backend, Collection, WILDCARD_TOPIC};
pub use error::Error;
pub use record::{AuthRecord, RecordAction, RecordEvent, RecordModel, Session};
pub use subscription::Subscription;
