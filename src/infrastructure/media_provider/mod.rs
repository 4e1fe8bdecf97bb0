//! External media provider integration

pub mod hmac_signer;

pub use hmac_signer::HmacCredentialSigner;
