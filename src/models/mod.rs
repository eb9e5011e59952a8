mod credential;
mod id;
mod state;

pub use credential::{Credential, CredentialList, NewCredential, NodeAccess};
pub use id::{CredentialId, IdError};
pub use state::CredentialState;
pub(crate) use state::node_access_set;
