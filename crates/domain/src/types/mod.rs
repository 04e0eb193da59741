//! Session data types
//!
//! - [`VendorUser`]: the identity client's user object, replaced wholesale
//! - [`TokenInfo`]: normalized token record derived from a `VendorUser`
//! - [`UserInfo`]: application profile fetched from the backend
//! - [`PersistedSession`]: the durable `"oidc-storage"` blob
//! - [`CallbackStatus`]: login-completion progress

pub mod session;
pub mod token;
pub mod user;

pub use session::{CallbackStatus, PersistedSession};
pub use token::TokenInfo;
pub use user::{UserInfo, VendorUser};
