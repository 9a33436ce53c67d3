//! Card authorization.
//!
//! Cards are checked against the local allow-list first. Cards not on the
//! list are forwarded to a remote authority when one is configured.
//!
//! ```text
//! CardIdentifier
//!     │
//!     └─> AuthorizationService
//!             ├─> AllowList        (hit → granted, Local)
//!             └─> RemoteAuthority  (2xx → granted, Remote; failure → RemoteUnavailable)
//!                     └─> HttpAuthority ───(HTTP)───> access server
//! ```

pub mod allow_list;
pub mod error;
pub mod http;
pub mod remote;
pub mod service;

pub use allow_list::AllowList;
pub use error::{AuthError, Result};
pub use http::HttpAuthority;
pub use remote::{AnyAuthority, NoRemote, RemoteAuthority};
pub use service::AuthorizationService;
