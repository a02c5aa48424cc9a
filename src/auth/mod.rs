//! Bearer authentication and claim-based authorization for API routes.
//!
//! Access tokens are stateless: the extractors only check the signature,
//! the algorithm and the expiry. Refresh tokens never travel in the
//! `Authorization` header; they are exchanged through the identity API.

mod bearer;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use bearer::get_bearer_token;
pub use errors::ApiAuthError;
pub use extractors::{Authorized, Bearer, PolicyConstraint, TagViewer};
pub use ip::{FORWARDED_FOR_HEADER, HasHeadersAndExtensions, extract_client_ip};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
