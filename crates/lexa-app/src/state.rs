use lexa_consult::{HttpConsultClient, SessionController};
use lexa_search::SearchClient;
use lexa_storage::SessionStore;
use lexa_storage::file::FileStore;

use crate::config::LexaConfig;

/// Everything a front end host keeps alive for one window.
pub struct AppState {
    pub config: LexaConfig,
    pub session: SessionController<HttpConsultClient>,
    pub search: SearchClient,
}

impl AppState {
    /// Wire up services from `config`, persisting the session identifier in
    /// `store`.
    pub fn build(config: LexaConfig, store: &dyn SessionStore) -> eyre::Result<Self> {
        config.validate()?;
        let session = build_session(&config, store)?;
        let search = build_search_client(&config)?;
        tracing::info!(
            user_id = %session.user_id(),
            consult_url = %config.consult_url,
            "app state ready"
        );
        Ok(Self {
            config,
            session,
            search,
        })
    }

    /// [`AppState::build`] with the session identifier kept in the platform's
    /// local data directory.
    pub fn with_default_store(config: LexaConfig) -> eyre::Result<Self> {
        let store = FileStore::default_location()?;
        Self::build(config, &store)
    }
}

/// The consultation session. Timeouts are enforced by the controller, not
/// the HTTP client.
pub fn build_session(
    config: &LexaConfig,
    store: &dyn SessionStore,
) -> eyre::Result<SessionController<HttpConsultClient>> {
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| eyre::eyre!("failed to build HTTP client: {e}"))?;
    let client = HttpConsultClient::with_client(http, config.consult_url.clone());
    Ok(SessionController::with_store(
        client,
        store,
        config.session_config(),
    )?)
}

pub fn build_search_client(config: &LexaConfig) -> eyre::Result<SearchClient> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| eyre::eyre!("failed to build HTTP client: {e}"))?;
    Ok(SearchClient::with_client(
        http,
        config.search_endpoints(),
        config.session_config().limits,
    ))
}
