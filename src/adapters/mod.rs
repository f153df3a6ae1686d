pub mod keyring;
pub mod transport;
