//! Connection handler that runs one SCPI session per connection.
//!
//! The handler reads newline-framed requests, hands each to the
//! [`Dispatcher`] and writes the response back before reading the next line.
//! When the client disconnects or the device library asks for a server exit,
//! the session's selection, lock and device handle are released.

use std::sync::atomic::{AtomicU64, Ordering};

use scpi_lang::ErrorCode;
use tracing::{debug, info, warn};

use crate::session::{SessionContext, SessionSettings};
use crate::transport::{ConnectionHandler, ConnectionStream, Line, LineReader};

use super::DISPATCH_TARGET;
use super::dispatcher::Dispatcher;
use super::errors::SessionExit;
use super::response::ResponseWriter;

const FIRST_SESSION_ID: u64 = 1;

/// Serves SCPI sessions over accepted connections.
pub(crate) struct SessionConnectionHandler {
    dispatcher: Dispatcher,
    settings: SessionSettings,
    max_request_bytes: usize,
    next_session: AtomicU64,
}

impl SessionConnectionHandler {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        settings: SessionSettings,
        max_request_bytes: usize,
    ) -> Self {
        Self {
            dispatcher,
            settings,
            max_request_bytes,
            next_session: AtomicU64::new(FIRST_SESSION_ID),
        }
    }

    fn open_session(&self, stream: &ConnectionStream) -> SessionContext {
        let session_id = self.next_session.fetch_add(1, Ordering::SeqCst);
        let mut settings = self.settings.clone();
        settings.transport = stream.kind();
        SessionContext::new(session_id, settings)
    }

    fn serve(&self, ctx: &mut SessionContext, stream: &mut ConnectionStream) {
        if self.dispatcher.auto_login(ctx).is_err() {
            return;
        }
        let mut reader = LineReader::new(self.max_request_bytes);
        loop {
            let line = match reader.next_line(&mut *stream) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!(
                        target: DISPATCH_TARGET,
                        session = ctx.session_id(),
                        "client disconnected"
                    );
                    return;
                }
                Err(error) => {
                    warn!(
                        target: DISPATCH_TARGET,
                        session = ctx.session_id(),
                        %error,
                        "failed to read request"
                    );
                    return;
                }
            };
            let outcome = match line {
                Line::Complete(request) => self.dispatcher.execute(ctx, &request),
                Line::TooLong => {
                    warn!(
                        target: DISPATCH_TARGET,
                        session = ctx.session_id(),
                        limit = self.max_request_bytes,
                        "request exceeds size limit"
                    );
                    Ok(ctx.raise(ErrorCode::CMD_ERR, None))
                }
            };
            let response = match outcome {
                Ok(response) => response,
                Err(SessionExit) => {
                    info!(
                        target: DISPATCH_TARGET,
                        session = ctx.session_id(),
                        "closing session on server exit"
                    );
                    return;
                }
            };
            if let Err(error) = ResponseWriter::new(&mut *stream).write_response(&response) {
                warn!(
                    target: DISPATCH_TARGET,
                    session = ctx.session_id(),
                    %error,
                    "failed to write response"
                );
                return;
            }
        }
    }
}

impl ConnectionHandler for SessionConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let mut ctx = self.open_session(&stream);
        debug!(
            target: DISPATCH_TARGET,
            session = ctx.session_id(),
            transport = ctx.transport(),
            peer = %stream.peer(),
            "session started"
        );
        self.serve(&mut ctx, &mut stream);
        self.dispatcher.end_session(&mut ctx);
        debug!(target: DISPATCH_TARGET, session = ctx.session_id(), "session ended");
    }
}
