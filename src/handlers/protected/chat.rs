// handlers/protected/chat.rs - POST /api/chat handler

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};

use crate::error::{ApiError, CHAT_FAILURE};
use crate::services::chat::ChatRequest;
use crate::state::AppState;

/// POST /api/chat - Stream the assistant's reply as server-sent events
///
/// Each `message` event carries a text chunk. A provider failure after the
/// stream has started ends it with a single `error` event.
pub async fn chat_post(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let replies = state.chat().reply(&request).await?;

    let events = replies.scan(false, |failed, chunk| {
        if *failed {
            return futures::future::ready(None);
        }
        let event = match chunk {
            Ok(text) => Event::default().event("message").data(text.replace('\r', "")),
            Err(e) => {
                tracing::warn!("Chat stream interrupted: {}", e);
                *failed = true;
                Event::default().event("error").data(CHAT_FAILURE)
            }
        };
        futures::future::ready(Some(Ok::<_, Infallible>(event)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
