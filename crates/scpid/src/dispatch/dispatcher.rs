//! Per-request state machine shared by every session.

use std::borrow::Cow;
use std::sync::Arc;

use scpi_lang::{CommandMatch, ErrorCode, SubCommand, parameters, preparse_command};
use tracing::{debug, error, info, warn};

use crate::device::{DeviceConnector, DeviceError};
use crate::health::HealthReporter;
use crate::session::SessionContext;
use crate::subsystems::{CommandTrees, Handler};

use super::DISPATCH_TARGET;
use super::errors::{CommandError, SessionExit, TRACE_DETAIL, map_device_error};

const LOGIN: &[u8] = b"LOGIN";
const LOGOUT: &[u8] = b"LOGOUT";
const CLOSE: &[u8] = b"CLOSE";
const SILENT_SUCCESS: &[u8] = b"+0";

/// Requests issued on the client's behalf when a session logs out.
const RELEASE_REQUESTS: [&[u8]; 2] = [b"INST NONE", b"SYST:LOCK:FORCED OFF"];

/// Routes request lines to command handlers.
///
/// The dispatcher itself is stateless; everything that belongs to a session
/// lives in the [`SessionContext`] passed to [`Dispatcher::execute`].
#[derive(Clone)]
pub struct Dispatcher {
    trees: Arc<CommandTrees>,
    connector: Arc<dyn DeviceConnector>,
    reporter: Arc<dyn HealthReporter>,
}

impl Dispatcher {
    /// Builds a dispatcher over compiled command trees.
    #[must_use]
    pub fn new(
        trees: Arc<CommandTrees>,
        connector: Arc<dyn DeviceConnector>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            trees,
            connector,
            reporter,
        }
    }

    /// Executes one request line and returns the bytes to send back.
    ///
    /// # Errors
    ///
    /// Returns [`SessionExit`] when the device library asks the server to
    /// drop the session. Every other failure is encoded into the response.
    pub fn execute(
        &self,
        ctx: &mut SessionContext,
        line: &[u8],
    ) -> Result<Vec<u8>, SessionExit> {
        let shown = redacted(line);
        debug!(
            target: DISPATCH_TARGET,
            session = ctx.session_id(),
            request = %shown,
            "request received"
        );
        monitor(ctx, shown.as_bytes());

        let tokens = preparse_command(line);
        let header = tokens.first().map(SubCommand::head).unwrap_or_default();
        let response = if line.trim_ascii().is_empty() {
            // Blank lines succeed silently so every line still gets its reply.
            Vec::new()
        } else if starts_with_ignore_case(header, LOGIN) {
            let raw = tokens.first().map(SubCommand::tail).unwrap_or_default();
            self.login(ctx, raw, shown.as_bytes())?
        } else if starts_with_ignore_case(header, LOGOUT) || starts_with_ignore_case(header, CLOSE)
        {
            self.logout(ctx)?
        } else {
            self.route(ctx, &tokens)?
        };

        let response = if response.is_empty() && ctx.flags().respond_always {
            SILENT_SUCCESS.to_vec()
        } else {
            response
        };
        debug!(
            target: DISPATCH_TARGET,
            session = ctx.session_id(),
            response = %String::from_utf8_lossy(&response),
            "response ready"
        );
        monitor(ctx, &response);
        Ok(response)
    }

    /// Logs in with the persisted auto-login credentials, when enabled.
    ///
    /// Failures are recorded in the session's error queue for the client to
    /// read later.
    ///
    /// # Errors
    ///
    /// Returns [`SessionExit`] when the device library asks the server to
    /// drop the session.
    pub fn auto_login(&self, ctx: &mut SessionContext) -> Result<(), SessionExit> {
        let settings = ctx.autologin().clone();
        if !settings.enabled || ctx.is_logged_in() {
            return Ok(());
        }
        debug!(
            target: DISPATCH_TARGET,
            session = ctx.session_id(),
            user = %settings.username,
            "attempting auto-login"
        );
        if let Err(error) = self.open_device(ctx, &settings.username, &settings.password) {
            warn!(
                target: DISPATCH_TARGET,
                session = ctx.session_id(),
                %error,
                "auto-login failed"
            );
            fail(ctx, CommandError::Device(error))?;
        }
        Ok(())
    }

    /// Releases everything the session holds once the client has gone.
    pub fn end_session(&self, ctx: &mut SessionContext) {
        if !ctx.is_logged_in() {
            return;
        }
        if self.release(ctx).is_err() {
            debug!(
                target: DISPATCH_TARGET,
                session = ctx.session_id(),
                "server exit during session cleanup"
            );
        }
        self.close_device(ctx);
    }

    fn login(
        &self,
        ctx: &mut SessionContext,
        raw: &[u8],
        shown: &[u8],
    ) -> Result<Vec<u8>, SessionExit> {
        if ctx.is_logged_in() {
            return Ok(ctx.raise(ErrorCode::ADMIN_ALREADY_LOGGED_IN, None));
        }
        let params = parameters(raw);
        let [user, password, ..] = params.as_slice() else {
            return Ok(ctx.raise(ErrorCode::MISSING_PARAMETER, None));
        };
        let user = String::from_utf8_lossy(user);
        let password = String::from_utf8_lossy(password);
        if let Err(error) = self.open_device(ctx, &user, &password) {
            info!(
                target: DISPATCH_TARGET,
                session = ctx.session_id(),
                user = %user,
                %error,
                "login rejected"
            );
            return fail(ctx, CommandError::Device(error));
        }
        // The device handle did not exist when the request was first logged.
        monitor(ctx, shown);
        Ok(format!("Login successful, SID {}", ctx.session_id()).into_bytes())
    }

    fn logout(&self, ctx: &mut SessionContext) -> Result<Vec<u8>, SessionExit> {
        if !ctx.is_logged_in() {
            return Ok(ctx.raise(ErrorCode::ADMIN_NOT_LOGGED_IN, None));
        }
        self.release(ctx)?;
        let message = format!("Logout successful, SID {}", ctx.session_id()).into_bytes();
        monitor(ctx, &message);
        self.close_device(ctx);
        Ok(message)
    }

    fn open_device(
        &self,
        ctx: &mut SessionContext,
        user: &str,
        password: &str,
    ) -> Result<(), DeviceError> {
        let mut device = self.connector.connect(ctx.device_address(), user, password)?;
        let defaults = match device.defaults() {
            Ok(defaults) => defaults,
            Err(error) => {
                device.close();
                return Err(error);
            }
        };
        ctx.attach(device, defaults);
        self.reporter
            .session_login(ctx.session_id(), ctx.user(), ctx.transport());
        Ok(())
    }

    fn close_device(&self, ctx: &mut SessionContext) {
        let user = ctx.user().to_owned();
        ctx.detach();
        self.reporter.session_logout(ctx.session_id(), &user);
    }

    /// Drops the selection, its lock and the forced-lock flag.
    fn release(&self, ctx: &mut SessionContext) -> Result<(), SessionExit> {
        for request in RELEASE_REQUESTS {
            self.route(ctx, &preparse_command(request))?;
        }
        Ok(())
    }

    fn route(
        &self,
        ctx: &mut SessionContext,
        tokens: &[SubCommand<'_>],
    ) -> Result<Vec<u8>, SessionExit> {
        if let Some(found) = self.trees.session().search(tokens) {
            return invoke(ctx, found);
        }
        if !ctx.is_logged_in() {
            return Ok(ctx.raise(ErrorCode::ADMIN_NOT_LOGGED_IN, None));
        }
        let found = self
            .trees
            .instrument(ctx.protocol_type())
            .and_then(|tree| tree.search(tokens))
            .or_else(|| self.trees.system().search(tokens));
        match found {
            Some(found) => invoke(ctx, found),
            None => Ok(ctx.raise(ErrorCode::CMD_ERR, None)),
        }
    }
}

fn invoke(
    ctx: &mut SessionContext,
    found: CommandMatch<'_, Handler>,
) -> Result<Vec<u8>, SessionExit> {
    match (found.handler)(ctx, found.parameters) {
        Ok(response) => Ok(response),
        Err(error) => fail(ctx, error),
    }
}

/// Encodes a handler failure and records it in the error queue.
fn fail(ctx: &mut SessionContext, failure: CommandError) -> Result<Vec<u8>, SessionExit> {
    match failure {
        CommandError::Code { code, detail } => Ok(ctx.raise(code, detail.as_deref())),
        CommandError::Device(device_error) => {
            let Some(mapped) = map_device_error(&device_error) else {
                info!(
                    target: DISPATCH_TARGET,
                    session = ctx.session_id(),
                    "device library requested server exit"
                );
                return Err(SessionExit);
            };
            if mapped.detail == Some(TRACE_DETAIL) {
                error!(
                    target: DISPATCH_TARGET,
                    session = ctx.session_id(),
                    error = %device_error,
                    "device failure"
                );
            } else {
                debug!(
                    target: DISPATCH_TARGET,
                    session = ctx.session_id(),
                    error = %device_error,
                    code = %mapped.code,
                    "device rejected request"
                );
            }
            Ok(ctx.raise(mapped.code, mapped.detail))
        }
        CommandError::Unexpected { message } => {
            error!(
                target: DISPATCH_TARGET,
                session = ctx.session_id(),
                %message,
                "unhandled handler failure"
            );
            Ok(ctx.raise(ErrorCode::INTERNAL_UNHANDLED_ERROR, Some(TRACE_DETAIL)))
        }
    }
}

fn monitor(ctx: &SessionContext, text: &[u8]) {
    if let Ok(device) = ctx.device() {
        device.monitor(text);
    }
}

fn starts_with_ignore_case(header: &[u8], keyword: &[u8]) -> bool {
    header
        .get(..keyword.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
}

/// Request text safe to log; credentials never reach the logs.
fn redacted(line: &[u8]) -> Cow<'_, str> {
    let header = preparse_command(line)
        .first()
        .map(SubCommand::head)
        .unwrap_or_default();
    if starts_with_ignore_case(header, LOGIN) {
        Cow::Owned(format!("{} ****", String::from_utf8_lossy(header)))
    } else {
        String::from_utf8_lossy(line)
    }
}
