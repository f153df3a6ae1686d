pub mod add;
pub mod daemon;
pub mod remove;
pub mod status;
pub mod sync;

use std::sync::Arc;

use crate::adapters::keyring::gpg::GpgClient;
use crate::adapters::transport::http::HttpTransport;
use crate::config::settings::Settings;
use crate::core::services::engine::SyncEngine;
use crate::core::services::validator::AuthorityValidator;

/// Wire the concrete adapters into an engine for one command run.
fn build_engine(settings: &Settings) -> SyncEngine {
    SyncEngine::new(
        Arc::new(HttpTransport::new()),
        Arc::new(GpgClient::new()),
        settings.sync.keyserver.clone(),
        settings.timeout(),
    )
}

/// Wire the concrete adapters into a validator for one add/edit run.
fn build_validator(settings: &Settings) -> AuthorityValidator {
    AuthorityValidator::new(
        Arc::new(HttpTransport::new()),
        Arc::new(GpgClient::new()),
        settings.sync.keyserver.clone(),
        settings.timeout(),
    )
}
