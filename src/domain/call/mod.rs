//! Call bounded context: session issuance and media credentials

pub mod credential;
pub mod routing;
pub mod service;
pub mod session;

pub use credential::{CredentialGrant, CredentialSigner, SignerError};
pub use routing::RoutingHandle;
pub use service::CallSessionIssuer;
pub use session::{CallSession, CallType, ChannelCredential, MediaRole, PartyCredential};
