//! Relay setup: resolve, select, spawn

use crate::error::Result;
use crate::hls::{self, HlsVariantSelector, ResolvedSource};
use crate::resolve::SourceResolver;
use crate::state::AppState;
use crate::stations::StationSpec;
use crate::transcode::{TranscodeCommand, TranscodeProcess};

use super::session::{RelaySession, SessionPhase};
use super::stream::RelayStream;

/// Start relaying `station`.
///
/// Resolution and spawn failures are returned before any body is produced.
/// A failed HLS variant selection is not fatal: the transcoder is pointed at
/// the resolved manifest URL instead.
pub async fn open_relay(state: &AppState, name: &str, station: &StationSpec) -> Result<RelayStream> {
    let mut session = RelaySession::new(name);
    tracing::info!(
        session = %session.id(),
        station = name,
        format = %station.format,
        "Relay requested"
    );

    match start(state, &mut session, station).await {
        Ok(process) => Ok(RelayStream::new(session, process, &state.config.relay)?),
        Err(e) => {
            tracing::warn!(session = %session.id(), station = name, "Relay failed: {}", e);
            session.enter(SessionPhase::Closed);
            Err(e)
        }
    }
}

async fn start(
    state: &AppState,
    session: &mut RelaySession,
    station: &StationSpec,
) -> Result<TranscodeProcess> {
    let config = &state.config;

    let resolver = SourceResolver::new(state.http_client.clone());
    let resolved = resolver.resolve(&station.url).await?;

    let source = if hls::is_hls_url(&resolved) {
        session.enter(SessionPhase::SelectingVariant);
        let selector = HlsVariantSelector::new(config.http.clone(), config.user_agent.as_str());
        match selector.select_best(&resolved).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(
                    session = %session.id(),
                    url = %resolved,
                    "HLS variant selection failed, using manifest URL: {}",
                    e
                );
                ResolvedSource::direct(resolved)
            }
        }
    } else {
        ResolvedSource::direct(resolved)
    };

    session.enter(SessionPhase::Spawning);
    let command = TranscodeCommand::build(&config.transcoder, &config.user_agent, &source, station);
    tracing::debug!(session = %session.id(), args = ?command.args(), "Transcoder command");

    let process = TranscodeProcess::spawn(&config.transcoder, command.args())?;
    tracing::info!(
        session = %session.id(),
        pid = process.id(),
        url = %source.playable_url,
        "Transcoder started"
    );
    Ok(process)
}
