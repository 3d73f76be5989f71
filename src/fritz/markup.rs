//! Tolerant extraction of tokens from the console's semi-structured markup.
//!
//! The device serves markup that is not reliably well formed, so nothing
//! here builds a document tree. Extraction works on the raw text with
//! small anchored patterns: raw markup in, structured tokens out. Protocol
//! modules never touch the markup themselves, which keeps the mechanism
//! swappable.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::error::{FritzError, Result};

static SID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<SID>\s*([0-9a-fA-F]+)").unwrap());

static CHALLENGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Challenge>\s*([^<\s]+)").unwrap());

static NAME_CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<td[^>]*class="name"[^>]*>\s*<span[^>]*>([^<]+)"#).unwrap());

static BUTTON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<button([^>]*)>").unwrap());

static INPUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<input([^>]*)>").unwrap());

static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([a-zA-Z_-]+)\s*=\s*"([^"]*)""#).unwrap());

/// Session id and challenge nonce from the login bootstrap payload.
///
/// Closing tags are deliberately not required, a truncated payload still
/// yields its tokens.
pub fn session_info(body: &str) -> Result<(String, String)> {
    let sid = SID_RE
        .captures(body)
        .map(|c| c[1].to_string())
        .ok_or(FritzError::Parse("SID"))?;
    let challenge = CHALLENGE_RE
        .captures(body)
        .map(|c| c[1].to_string())
        .ok_or(FritzError::Parse("Challenge"))?;

    Ok((sid, challenge))
}

/// `(name, id)` pairs from the profile listing table.
///
/// Rows without a name cell are structural (headers, separators) and are
/// skipped; a data row's id sits on its edit button.
pub fn profile_rows(body: &str) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    for row in body.split("<tr") {
        let Some(name) = NAME_CELL_RE.captures(row).map(|c| c[1].trim().to_string()) else {
            continue;
        };
        let id = BUTTON_RE
            .captures_iter(row)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|attrs| attr_value(attrs, "name") == Some("edit"))
            .and_then(|attrs| attr_value(attrs, "value"));

        if let Some(id) = id {
            rows.push((name, id.to_string()));
        }
    }

    rows
}

/// Value of the checked option within the time-control radio group.
pub fn checked_time_option(body: &str) -> Option<String> {
    let start = body.find("time_ctrl_options")?;
    let section = &body[start..];
    let section = section
        .find("</div>")
        .map_or(section, |end| &section[..end]);

    input_attrs(section)
        .find(|attrs| is_checked(attrs))
        .and_then(|attrs| attr_value(attrs, "value"))
        .map(str::to_string)
}

/// Whether the form checkbox with the given `name` carries a checked marker.
pub fn checkbox_checked(body: &str, name: &str) -> bool {
    input_attrs(body).any(|attrs| attr_value(attrs, "name") == Some(name) && is_checked(attrs))
}

/// Whether the form checkbox carrying the given `value` is checked.
pub fn value_checkbox_checked(body: &str, value: &str) -> bool {
    input_attrs(body).any(|attrs| attr_value(attrs, "value") == Some(value) && is_checked(attrs))
}

fn input_attrs(body: &str) -> impl Iterator<Item = &str> {
    INPUT_RE
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
}

fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|c| &c[1] == name)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

fn is_checked(attrs: &str) -> bool {
    attr_value(attrs, "checked").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_info_extracts_both_tokens() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<SessionInfo><SID>0000000000000000</SID><Challenge>1234567z</Challenge><BlockTime>0</BlockTime></SessionInfo>"#;

        let (sid, challenge) = session_info(body).unwrap();
        assert_eq!(sid, "0000000000000000");
        assert_eq!(challenge, "1234567z");
    }

    #[test]
    fn session_info_tolerates_missing_close_tags() {
        // Firmware occasionally truncates the payload; the tokens must
        // still come out.
        let body = "<SessionInfo><SID>a0b1c2d3e4f50617<Challenge>deadbeef";

        let (sid, challenge) = session_info(body).unwrap();
        assert_eq!(sid, "a0b1c2d3e4f50617");
        assert_eq!(challenge, "deadbeef");
    }

    #[test]
    fn session_info_missing_challenge_is_parse_error() {
        let err = session_info("<SessionInfo><SID>0000000000000000</SID></SessionInfo>").unwrap_err();
        assert!(matches!(err, FritzError::Parse("Challenge")));
    }

    #[test]
    fn profile_rows_skips_structural_rows() {
        let body = r#"<table id="uiProfileList">
<tr><th>Name</th><th></th></tr>
<tr><td class="name"><span>Kids</span></td>
<td class="btncolumn"><button type="submit" name="edit" value="1">Edit</button></td></tr>
<tr><td colspan="2">separator</td></tr>
<tr><td class="name"><span>Guest</span></td>
<td class="btncolumn"><button type="submit" name="edit" value="2">Edit</button></td></tr>
</table>"#;

        assert_eq!(
            profile_rows(body),
            vec![
                ("Kids".to_string(), "1".to_string()),
                ("Guest".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn profile_rows_ignores_buttons_other_than_edit() {
        let body = r#"<tr><td class="name"><span>Kids</span></td>
<td><button name="delete" value="9">X</button><button name="edit" value="3">Edit</button></td></tr>"#;

        assert_eq!(profile_rows(body), vec![("Kids".to_string(), "3".to_string())]);
    }

    #[test]
    fn checked_time_option_finds_selected_radio() {
        let body = r#"<div class="time_ctrl_options">
<input type="radio" name="time" value="unlimited">
<input type="radio" name="time" value="never" checked="checked">
</div>"#;

        assert_eq!(checked_time_option(body), Some("never".to_string()));
    }

    #[test]
    fn checked_time_option_ignores_inputs_outside_the_group() {
        let body = r#"<div class="time_ctrl_options">
<input type="radio" name="time" value="unlimited">
</div>
<div class="formular"><input type="checkbox" name="parental" checked="checked"></div>"#;

        assert_eq!(checked_time_option(body), None);
    }

    #[test]
    fn checkbox_checked_requires_the_checked_marker() {
        let body = r#"<div class="formular"><input type="checkbox" name="parental"></div>"#;
        assert!(!checkbox_checked(body, "parental"));

        let body = r#"<div class="formular"><input type="checkbox" name="parental" checked="checked"></div>"#;
        assert!(checkbox_checked(body, "parental"));
    }

    #[test]
    fn value_checkbox_checked_matches_on_value() {
        let body = r#"<div class="formular">
<input type="radio" name="filtertype" value="white" checked="checked">
<input type="radio" name="filtertype" value="black">
</div>"#;

        assert!(value_checkbox_checked(body, "white"));
        assert!(!value_checkbox_checked(body, "black"));
    }
}
