//! Challenge-response login and session lifecycle.

use std::sync::Arc;

use md5::{Digest, Md5};
use tracing::debug;
use url::Url;

use super::error::{FritzError, Result};
use super::markup;
use super::transport::Transport;
use super::LOGIN_PATH;

/// Sentinel id the device returns while no session is established.
pub const EMPTY_SID: &str = "0000000000000000";

/// Opaque session identifier issued after a successful handshake.
///
/// Replaced wholesale on re-login, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub sid: String,
}

impl Session {
    pub fn is_valid(&self) -> bool {
        self.sid != EMPTY_SID
    }
}

/// Handshake progress. `Denied` is terminal: once the device has rejected
/// the credentials there is no point retrying with the same ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginState {
    Unauthenticated,
    ChallengeIssued,
    Authenticated,
    Denied,
}

/// Issues challenges, computes the credential digest and tracks whether
/// the current session is still usable.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    base_url: Url,
    user: String,
    password: String,
    state: LoginState,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: Url,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url,
            user: user.into(),
            password: password.into(),
            state: LoginState::Unauthenticated,
        }
    }

    /// GET the bootstrap endpoint and pull sid and challenge nonce out of
    /// the response.
    async fn challenge(&self, url: &Url) -> Result<(String, String)> {
        let response = self.transport.get(url.as_str()).await?;
        if !response.is_success() {
            return Err(FritzError::Transport(format!(
                "challenge endpoint returned HTTP {}",
                response.status
            )));
        }

        markup::session_info(&response.body)
    }

    /// Perform the challenge-response handshake and return a fresh session.
    ///
    /// The device only accepts `challenge + "-" + md5(utf16le(challenge)
    /// || utf16le("-") || utf16le(password))` as the login response; both
    /// challenge attempts coming back with the sentinel id means password
    /// login is disabled or the credentials are wrong.
    pub async fn authenticate(&mut self) -> Result<Session> {
        if self.state == LoginState::Denied {
            return Err(FritzError::Auth(format!(
                "{} already rejected the credentials",
                self.base_url
            )));
        }

        debug!("logging in to FRITZ!Box at {}", self.base_url);
        let login_url = self
            .base_url
            .join(LOGIN_PATH)
            .map_err(|e| FritzError::Transport(e.to_string()))?;

        let (sid, challenge_nonce) = self.challenge(&login_url).await?;
        self.state = LoginState::ChallengeIssued;
        if sid != EMPTY_SID {
            // The device still honors an earlier session for this client.
            self.state = LoginState::Authenticated;
            return Ok(Session { sid });
        }

        let mut url = login_url;
        url.query_pairs_mut()
            .append_pair("username", &self.user)
            .append_pair(
                "response",
                &challenge_response(&challenge_nonce, &self.password),
            );

        let (sid, _) = self.challenge(&url).await?;
        if sid == EMPTY_SID {
            self.state = LoginState::Denied;
            return Err(FritzError::Auth(format!(
                "{} rejected the supplied credentials; this only works if login \
                 via user and password is enabled in the FRITZ!Box",
                self.base_url
            )));
        }

        self.state = LoginState::Authenticated;
        Ok(Session { sid })
    }

    /// Idempotent guard before protected operations: keeps a valid session
    /// as-is, performs the handshake otherwise.
    pub async fn ensure_valid(&mut self, session: &Session) -> Result<Session> {
        if session.is_valid() && self.state == LoginState::Authenticated {
            return Ok(session.clone());
        }

        self.authenticate().await
    }

    /// Mark the current session as rejected so the next operation re-enters
    /// the handshake.
    pub fn invalidate(&mut self) {
        if self.state == LoginState::Authenticated {
            self.state = LoginState::ChallengeIssued;
        }
    }
}

/// Login response token for a challenge nonce.
///
/// The hash input is the UTF-16LE encoding of `<challenge>-<password>`.
/// That encoding is dictated by the device's digest scheme and must be
/// byte-exact.
pub fn challenge_response(challenge: &str, password: &str) -> String {
    let mut md5 = Md5::new();
    md5.update(utf16le(challenge));
    md5.update(utf16le("-"));
    md5.update(utf16le(password));

    format!("{}-{:x}", challenge, md5.finalize())
}

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
