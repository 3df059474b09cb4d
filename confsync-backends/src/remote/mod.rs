//! Remote providers: the configuration-deployment service and the secret
//! store, plus the shared name resolver and HTTP client.

pub mod deploy;
pub mod http;
pub mod resolver;
pub mod secrets;
