//! Blocking HTTP client for fixit-api

use anyhow::{Result, anyhow, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Response envelope returned by every endpoint
#[derive(Debug, serde::Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    code: Option<String>,
}

pub struct Client {
    base_url: String,
    token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request("GET", path).call())
    }

    pub fn get_query<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut request = self.request("GET", path);
        for (key, value) in query {
            request = request.query(key, value);
        }
        self.send(request.call())
    }

    pub fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        self.send(self.request("POST", path).send_json(body))
    }

    pub fn patch<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        self.send(self.request("PATCH", path).send_json(body))
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request("DELETE", path).call())
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let request = ureq::request(method, &format!("{}{}", self.base_url, path))
            .set("Accept", "application/json");
        match self.token {
            Some(ref token) => request.set("Authorization", &format!("Bearer {}", token)),
            None => request,
        }
    }

    fn send<T: DeserializeOwned>(
        &self,
        response: std::result::Result<ureq::Response, ureq::Error>,
    ) -> Result<T> {
        match response {
            Ok(resp) => {
                let envelope: Envelope<T> = resp.into_json()?;
                match envelope.data {
                    Some(data) if envelope.success => Ok(data),
                    _ => Err(failure(envelope.error, envelope.code)),
                }
            }
            Err(ureq::Error::Status(status, resp)) => {
                match resp.into_json::<Envelope<serde_json::Value>>() {
                    Ok(envelope) => Err(failure(envelope.error, envelope.code)),
                    Err(_) => bail!("HTTP {}", status),
                }
            }
            Err(e) => Err(anyhow!("Could not reach fixit-api at {}: {}", self.base_url, e)),
        }
    }
}

fn failure(error: Option<String>, code: Option<String>) -> anyhow::Error {
    let message = error.unwrap_or_else(|| "request failed".to_string());
    match code.as_deref() {
        Some("unauthenticated") => anyhow!("{} (run `fixit login` first)", message),
        Some(code) => anyhow!("{} [{}]", message, code),
        None => anyhow!(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let client = Client::new("http://127.0.0.1:3847/", None);
        assert_eq!(client.base_url, "http://127.0.0.1:3847");
    }

    #[test]
    fn test_failure_message() {
        let err = failure(Some("issue fix-9 not found".into()), Some("not_found".into()));
        assert_eq!(err.to_string(), "issue fix-9 not found [not_found]");

        let err = failure(None, Some("unauthenticated".into()));
        assert!(err.to_string().contains("fixit login"));
    }
}
