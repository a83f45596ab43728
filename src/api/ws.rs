// =============================================================================
// WebSocket Handler — live advisor feed
// =============================================================================
//
// Clients connect to `/api/v1/ws?ticker=..&period=..` (same parameters as
// `/api/v1/analysis`) and receive:
//   1. An immediate report on connect.
//   2. A new report whenever a refresh (every `ws_refresh_secs`) yields a
//      newer latest bar or a different action.
//
// Every message is a JSON object tagged by `type`: `report` or `error`.
// Ping frames are answered with Pong; a Close frame ends the session.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::advisor::{AnalysisQuery, AnalysisRequest};
use crate::api::rest::evaluate_query;
use crate::app_state::AppState;
use crate::types::Action;

/// Identity of what the client last saw: latest bar time and action.
type FeedKey = (i64, Action);

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

/// Validates the query before upgrading so bad parameters get a plain 400.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysisQuery>,
) -> impl IntoResponse {
    let resolved = {
        let config = state.runtime_config.read();
        AnalysisRequest::resolve(&query, &config)
    };
    if let Err(e) = resolved {
        warn!(error = %e, "WebSocket connection rejected");
        return e.into_response();
    }

    let refresh_secs = state.runtime_config.read().ws_refresh_secs.max(1);
    info!(ticker = ?query.ticker, refresh_secs, "WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, query, refresh_secs))
        .into_response()
}

// =============================================================================
// Connection handler
// =============================================================================

/// Runs two concurrent branches via `tokio::select!`:
///   1. **Refresh** — re-evaluate the request and push on change.
///   2. **Recv** — Ping/Pong, Close, text messages (treated as a request to
///      refresh now).
async fn handle_ws_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    query: AnalysisQuery,
    refresh_secs: u64,
) {
    let (mut sender, mut receiver) = socket.split();

    let mut last_sent: Option<FeedKey> = None;
    let mut sequence: u64 = 0;

    // First tick fires immediately, which doubles as the on-connect push.
    let mut refresh = interval(Duration::from_secs(refresh_secs));
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                if let Err(e) = push_update(&mut sender, &state, &query, &mut last_sent, &mut sequence).await {
                    debug!(error = %e, "WebSocket send failed — disconnecting");
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(msg = %text, "WebSocket text message received — refreshing");
                        refresh.reset_immediately();
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "Failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received — disconnecting");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("WebSocket binary message ignored");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended (None)");
                        break;
                    }
                }
            }
        }
    }

    info!(sent = sequence, "WebSocket connection closed");
}

// =============================================================================
// Helpers
// =============================================================================

/// Evaluate the subscription and send a message when the result differs from
/// what the client last received. Errors are always sent and reset the key so
/// the next good report goes out.
async fn push_update<S>(
    sender: &mut S,
    state: &Arc<AppState>,
    query: &AnalysisQuery,
    last_sent: &mut Option<FeedKey>,
    sequence: &mut u64,
) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    let payload = match evaluate_query(state, query).await {
        Ok((report, _)) => {
            let key = (report.recommendation.timestamp, report.recommendation.action);
            if *last_sent == Some(key) {
                debug!(ticker = %report.ticker, "no change since last push");
                return Ok(());
            }
            *last_sent = Some(key);
            state.push_report(&report);
            serde_json::json!({ "type": "report", "seq": *sequence + 1, "report": report })
        }
        Err(e) => {
            *last_sent = None;
            let mut body = e.to_json();
            body["type"] = "error".into();
            body["status"] = e.status().as_u16().into();
            body["seq"] = (*sequence + 1).into();
            body
        }
    };

    match serde_json::to_string(&payload) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            *sequence += 1;
            debug!(seq = *sequence, "WebSocket update sent");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize WebSocket payload");
            Ok(())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use futures_util::sink::drain;

    use super::*;
    use crate::market_data::source::StaticSource;
    use crate::market_data::Candle;
    use crate::runtime_config::AdvisorConfig;
    use crate::types::{Interval, Period};

    fn state() -> Arc<AppState> {
        let candles: Vec<Candle> = (0..200)
            .map(|i| {
                let c = 50.0 + 3.0 * (i as f64 / 6.0).cos();
                Candle::new(i * 60, c, c, c, c, 1.0)
            })
            .collect();
        let source = StaticSource::new().with("ETH-USD", Period::Month1, Interval::Minute5, candles);
        Arc::new(AppState::new(AdvisorConfig::default(), Arc::new(source)))
    }

    fn sink() -> impl futures_util::Sink<Message, Error = axum::Error> + Unpin {
        drain().sink_map_err(|never: std::convert::Infallible| -> axum::Error { match never {} })
    }

    #[tokio::test]
    async fn pushes_once_until_something_changes() {
        let state = state();
        let query = AnalysisQuery {
            ticker: Some("ETH-USD".into()),
            ..Default::default()
        };
        let mut sender = sink();
        let mut last = None;
        let mut seq = 0;

        push_update(&mut sender, &state, &query, &mut last, &mut seq).await.unwrap();
        assert_eq!(seq, 1);
        assert!(last.is_some());

        push_update(&mut sender, &state, &query, &mut last, &mut seq).await.unwrap();
        assert_eq!(seq, 1);
        assert_eq!(state.recent_reports(50).len(), 1);
    }

    #[tokio::test]
    async fn errors_are_always_pushed() {
        let state = state();
        let query = AnalysisQuery {
            ticker: Some("NOPE".into()),
            autofix: Some("false".into()),
            ..Default::default()
        };
        let mut sender = sink();
        let mut last = None;
        let mut seq = 0;

        push_update(&mut sender, &state, &query, &mut last, &mut seq).await.unwrap();
        push_update(&mut sender, &state, &query, &mut last, &mut seq).await.unwrap();
        assert_eq!(seq, 2);
        assert!(last.is_none());
        assert!(state.recent_reports(50).is_empty());
    }
}
