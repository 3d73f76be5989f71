//! Profile listing and name resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::error::{FritzError, Result};
use super::markup;
use super::session::Session;
use super::transport::Transport;
use super::DATA_PATH;

/// An access profile as resolved from the device's listing.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub id: String,
}

/// Resolves human-readable profile names to the device-internal ids.
pub struct ProfileDirectory {
    transport: Arc<dyn Transport>,
    data_url: Url,
}

impl ProfileDirectory {
    pub fn new(transport: Arc<dyn Transport>, base_url: &Url) -> Result<Self> {
        let data_url = base_url
            .join(DATA_PATH)
            .map_err(|e| FritzError::Transport(e.to_string()))?;

        Ok(Self { transport, data_url })
    }

    /// Fetch the profile listing as a name to id mapping.
    pub async fn list_profiles(&self, session: &Session) -> Result<BTreeMap<String, String>> {
        debug!("fetching available profiles");
        let fields = [
            ("xhr", "1".to_string()),
            ("sid", session.sid.clone()),
            ("no_sidrenew", String::new()),
            ("page", "kidPro".to_string()),
        ];

        let response = self.transport.post_form(self.data_url.as_str(), &fields).await?;
        if !response.is_success() {
            return Err(FritzError::Transport(format!(
                "profile listing returned HTTP {}",
                response.status
            )));
        }

        Ok(markup::profile_rows(&response.body).into_iter().collect())
    }

    /// Resolve a display name to the internal profile id.
    ///
    /// Exact match only; the console shows the canonical spelling.
    pub async fn resolve_id(&self, session: &Session, name: &str) -> Result<String> {
        let mut profiles = self.list_profiles(session).await?;
        profiles
            .remove(name)
            .ok_or_else(|| FritzError::ProfileNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fritz::testing::{profile_list_html, MockTransport};

    fn directory(transport: &Arc<MockTransport>) -> ProfileDirectory {
        ProfileDirectory::new(
            Arc::clone(transport) as Arc<dyn Transport>,
            &Url::parse("http://fritz.box").unwrap(),
        )
        .unwrap()
    }

    fn session() -> Session {
        Session {
            sid: "a0b1c2d3e4f50617".to_string(),
        }
    }

    #[tokio::test]
    async fn list_profiles_maps_names_to_ids() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, &profile_list_html(&[("Kids", "1"), ("Guest", "2")]));

        let profiles = directory(&transport).list_profiles(&session()).await.unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles["Kids"], "1");
        assert_eq!(profiles["Guest"], "2");
    }

    #[tokio::test]
    async fn list_profiles_posts_the_listing_request() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, &profile_list_html(&[]));

        directory(&transport).list_profiles(&session()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].url.ends_with("/data.lua"));
        assert_eq!(requests[0].field("xhr"), Some("1"));
        assert_eq!(requests[0].field("sid"), Some("a0b1c2d3e4f50617"));
        assert_eq!(requests[0].field("no_sidrenew"), Some(""));
        assert_eq!(requests[0].field("page"), Some("kidPro"));
    }

    #[tokio::test]
    async fn resolve_id_unknown_name_is_profile_not_found() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, &profile_list_html(&[("Kids", "1")]));

        let err = directory(&transport)
            .resolve_id(&session(), "Gäste")
            .await
            .unwrap_err();

        assert!(matches!(err, FritzError::ProfileNotFound(name) if name == "Gäste"));
    }
}
