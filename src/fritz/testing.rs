//! Scripted transport and markup fixtures shared by the protocol tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::{FritzError, Result};
use super::transport::{HttpResponse, Transport};

/// One request as seen by the fake device.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// Transport that replays a scripted queue of responses and records every
/// request it sees, in order.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(HttpResponse {
            status,
            body: body.to_string(),
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of challenge-endpoint requests seen so far.
    pub fn login_attempts(&self) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains("login_sid.lua"))
            .count()
    }

    fn next_response(&self) -> Result<HttpResponse> {
        self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            FritzError::Transport("mock transport ran out of scripted responses".to_string())
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            form: Vec::new(),
        });

        self.next_response()
    }

    async fn post_form(&self, url: &str, fields: &[(&str, String)]) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            form: fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        });

        self.next_response()
    }
}

/// Login bootstrap payload in the device's dialect.
pub fn session_info_xml(sid: &str, challenge: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <SessionInfo><SID>{sid}</SID><Challenge>{challenge}</Challenge>\
         <BlockTime>0</BlockTime></SessionInfo>"
    )
}

/// Profile listing page with one structural header row plus the given
/// `(name, id)` data rows.
pub fn profile_list_html(rows: &[(&str, &str)]) -> String {
    let mut html = String::from(
        "<table id=\"uiProfileList\">\n<tr><th>Name</th><th></th></tr>\n",
    );
    for (name, id) in rows {
        html.push_str(&format!(
            "<tr><td class=\"name\"><span>{name}</span></td>\
             <td class=\"btncolumn\"><button type=\"submit\" name=\"edit\" value=\"{id}\">\
             Edit</button></td></tr>\n"
        ));
    }
    html.push_str("</table>");

    html
}

/// Profile edit form with the given time token checked and the toggles in
/// the given states.
pub fn edit_form_html(
    time: &str,
    parental: bool,
    disallow_guest: bool,
    filter: Option<&str>,
) -> String {
    let checked = |token: &str| if token == time { " checked=\"checked\"" } else { "" };
    let marker = |on: bool| if on { " checked=\"checked\"" } else { "" };

    let mut html = format!(
        "<div class=\"time_ctrl_options\">\n\
         <input type=\"radio\" name=\"time\" value=\"unlimited\"{}>\n\
         <input type=\"radio\" name=\"time\" value=\"limited\"{}>\n\
         <input type=\"radio\" name=\"time\" value=\"never\"{}>\n\
         </div>\n",
        checked("unlimited"),
        checked("limited"),
        checked("never"),
    );
    html.push_str(&format!(
        "<div class=\"formular\"><input type=\"checkbox\" name=\"parental\"{}></div>\n",
        marker(parental)
    ));
    html.push_str(&format!(
        "<div class=\"formular\"><input type=\"checkbox\" name=\"disallow_guest\"{}></div>\n",
        marker(disallow_guest)
    ));
    html.push_str(&format!(
        "<div class=\"formular\">\
         <input type=\"radio\" name=\"filtertype\" value=\"white\"{}>\
         <input type=\"radio\" name=\"filtertype\" value=\"black\"{}>\
         </div>",
        marker(filter == Some("white")),
        marker(filter == Some("black")),
    ));

    html
}
