//! Reading and writing the mutable attributes of a profile's edit form.

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;
use tracing::warn;
use url::Url;

use super::error::{FritzError, Result};
use super::markup;
use super::session::{Session, SessionManager};
use super::transport::{HttpResponse, Transport};
use super::DATA_PATH;

/// Page token of the profile edit form.
const EDIT_PAGE: &str = "kids_profileedit";

/// Time-window tokens of the edit form's time-control radio group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Online at any time
    Unlimited,
    /// Online within the configured budget
    Limited,
    /// Never online
    Never,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Unlimited => "unlimited",
            TimeWindow::Limited => "limited",
            TimeWindow::Never => "never",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "unlimited" => Some(TimeWindow::Unlimited),
            "limited" => Some(TimeWindow::Limited),
            "never" => Some(TimeWindow::Never),
            _ => None,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content filter selection; only meaningful while parental control is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Black,
    White,
}

impl FilterType {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::Black => "black",
            FilterType::White => "white",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the mutable fields of a profile's edit form.
///
/// Absent toggles are meaningful: the device treats a missing form field
/// as "switch this off", so a write must carry exactly the fields a prior
/// read observed and nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileFormState {
    pub time_window: TimeWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parental: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disallow_guest: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FilterType>,
}

impl ProfileFormState {
    /// Parse the edit form markup into a snapshot.
    pub fn from_markup(body: &str) -> Result<Self> {
        let token =
            markup::checked_time_option(body).ok_or(FritzError::Parse("time_ctrl_options"))?;
        let time_window =
            TimeWindow::from_token(&token).ok_or(FritzError::Parse("time option value"))?;

        let parental = markup::checkbox_checked(body, "parental").then_some(true);
        let disallow_guest = markup::checkbox_checked(body, "disallow_guest").then_some(true);

        // The filter radios keep their markup state even while parental
        // control is off; only report a filter the device acts on.
        let filter_type = if parental.is_some() {
            if markup::value_checkbox_checked(body, "white") {
                Some(FilterType::White)
            } else if markup::value_checkbox_checked(body, "black") {
                Some(FilterType::Black)
            } else {
                None
            }
        } else {
            None
        };

        Ok(Self {
            time_window,
            parental,
            disallow_guest,
            filter_type,
        })
    }

    /// Optional form fields in wire order, omitting everything absent.
    fn carried_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if self.parental == Some(true) {
            fields.push(("parental", "on".to_string()));
        }
        if self.disallow_guest == Some(true) {
            fields.push(("disallow_guest", "on".to_string()));
        }
        if let Some(filter) = self.filter_type {
            fields.push(("filtertype", filter.as_str().to_string()));
        }

        fields
    }
}

/// Reads and writes a profile's edit form.
///
/// Both operations perform at most one re-authentication-and-retry cycle
/// when the device rejects the current session; a second failure is
/// surfaced as a transport error.
pub struct ProfileStateStore {
    transport: Arc<dyn Transport>,
    data_url: Url,
}

impl ProfileStateStore {
    pub fn new(transport: Arc<dyn Transport>, base_url: &Url) -> Result<Self> {
        let data_url = base_url
            .join(DATA_PATH)
            .map_err(|e| FritzError::Transport(e.to_string()))?;

        Ok(Self { transport, data_url })
    }

    /// Fetch and parse the current form state of a profile.
    pub async fn read(
        &self,
        sessions: &mut SessionManager,
        session: Session,
        profile_id: &str,
    ) -> Result<(ProfileFormState, Session)> {
        let fields = [
            ("edit", profile_id.to_string()),
            ("page", EDIT_PAGE.to_string()),
        ];

        let (response, session) = self.post_edit(sessions, session, &fields).await?;
        Ok((ProfileFormState::from_markup(&response.body)?, session))
    }

    /// Push a new time window, carrying forward the toggles observed by
    /// the preceding read so the device does not silently drop them.
    pub async fn write(
        &self,
        sessions: &mut SessionManager,
        session: Session,
        profile_id: &str,
        window: TimeWindow,
        carried: &ProfileFormState,
    ) -> Result<Session> {
        let mut fields = vec![
            ("edit", profile_id.to_string()),
            ("time", window.as_str().to_string()),
            ("budget", "unlimited".to_string()),
            ("apply", "nop".to_string()),
            ("page", EDIT_PAGE.to_string()),
        ];
        fields.extend(carried.carried_fields());

        let (_, session) = self.post_edit(sessions, session, &fields).await?;
        Ok(session)
    }

    /// Submit an edit-page request, re-authenticating once if the device
    /// rejects the current session id.
    async fn post_edit(
        &self,
        sessions: &mut SessionManager,
        session: Session,
        fields: &[(&'static str, String)],
    ) -> Result<(HttpResponse, Session)> {
        let retry_reason = match self.try_post(&session, fields).await {
            Ok(response) if response.is_success() => return Ok((response, session)),
            Ok(response) => format!("HTTP {}", response.status),
            Err(err) => err.to_string(),
        };

        warn!("edit request failed ({retry_reason}), logging in again");
        sessions.invalidate();
        let session = sessions.authenticate().await?;

        let response = self.try_post(&session, fields).await?;
        if !response.is_success() {
            return Err(FritzError::Transport(format!(
                "edit request still failing after re-login: HTTP {}",
                response.status
            )));
        }

        Ok((response, session))
    }

    async fn try_post(
        &self,
        session: &Session,
        fields: &[(&'static str, String)],
    ) -> Result<HttpResponse> {
        let mut form = vec![("sid", session.sid.clone())];
        form.extend(fields.iter().cloned());

        self.transport.post_form(self.data_url.as_str(), &form).await
    }
}
