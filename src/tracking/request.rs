use crate::source::record::VisitRecord;
use reqwest::Url;
use sha2::{Digest, Sha256};

/// Path suffixes of requests that are already tracker hits; their parameters
/// are replayed as-is. `/js/` is the tracker proxy endpoint.
const TRACKER_PATHS: &[&str] = &["/matomo.php", "/piwik.php", "/js/", "/js/index.php"];

/// Where and as whom visits are tracked
#[derive(Debug, Clone)]
pub struct TrackingTarget {
    pub site_id: u32,
    /// Base URL of the tracked website; logged paths are appended to it
    pub site_url: String,
    pub token_auth: Option<String>,
}

/// Query parameters for one tracker hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRequest {
    pub line_number: u64,
    params: Vec<(String, String)>,
}

impl TrackingRequest {
    pub fn from_visit(visit: &VisitRecord, target: &TrackingTarget) -> Self {
        let mut request = Self {
            line_number: visit.line_number,
            params: Vec::new(),
        };

        if let Some(forwarded) = tracker_hit_params(&visit.target) {
            for (name, value) in forwarded {
                if name != "idsite" && name != "token_auth" {
                    request.push(name, value);
                }
            }
            request.set("idsite", target.site_id.to_string());
            request.set("rec", "1");
            request.set("apiv", "1");
            request.set("send_image", "0");
        } else {
            request.push("idsite", target.site_id.to_string());
            request.push("rec", "1");
            request.push("apiv", "1");
            request.push("send_image", "0");
            request.push(
                "url",
                format!("{}{}", target.site_url.trim_end_matches('/'), visit.target),
            );
            if let Some(referrer) = &visit.referrer {
                request.push("urlref", referrer.clone());
            }
            if let Some(ua) = &visit.user_agent {
                request.push("ua", ua.clone());
            }
            request.push("_id", visitor_id(&visit.client_ip, visit.user_agent.as_deref()));
            // overriding the client IP is only honoured for authenticated requests
            if target.token_auth.is_some() {
                request.push("cip", visit.client_ip.clone());
            }
        }

        if let Some(token) = &target.token_auth {
            request.set("token_auth", token.clone());
        }

        request
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push((name.into(), value.into()));
    }

    fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((name.to_string(), value)),
        }
    }
}

/// If the logged target is a tracker endpoint, return its query parameters
fn tracker_hit_params(target: &str) -> Option<Vec<(String, String)>> {
    let url = Url::parse("http://replay.invalid").ok()?.join(target).ok()?;
    if !TRACKER_PATHS.iter().any(|path| url.path().ends_with(path)) {
        return None;
    }
    Some(
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
    )
}

/// Stable 16 hex digit visitor id derived from client IP and user agent
fn visitor_id(client_ip: &str, user_agent: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client_ip.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.unwrap_or_default().as_bytes());
    let digest = hasher.finalize();

    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
