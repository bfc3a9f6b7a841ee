//! Submission of execution documents to a Jira/Xray server.
use crate::config::OAuthConfig;
use crate::model::ExecutionDocument;
use crate::oauth::OAuthSigner;
use crate::wire::{to_wire, WireExecution};
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use ureq::tls::{Certificate, RootCerts, TlsConfig};
use ureq::Agent;

const ISSUE_ENDPOINT: &str = "rest/api/2/issue";
const EXECUTION_ISSUE_TYPE: &str = "Test Execution";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for one Xray server.
#[derive(Debug, Clone)]
pub struct XraySettings {
    pub base_url: String,
    pub endpoint: String,
    pub credentials: Credentials,
    /// PEM file with the CA certificate(s) to trust instead of the defaults.
    pub certificate: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone)]
pub enum Credentials {
    Basic { username: String, password: String },
    OAuth(OAuthConfig),
}

/// How each request is authorized.
#[derive(Debug)]
enum Auth {
    /// Precomputed `Authorization` header.
    Basic(String),
    /// Signed per request over method, URL and body.
    OAuth(OAuthSigner),
}

impl Auth {
    fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Ok(match credentials {
            Credentials::Basic { username, password } => {
                Auth::Basic(basic_authorization(username, password))
            }
            Credentials::OAuth(config) => Auth::OAuth(OAuthSigner::from_config(config)?),
        })
    }

    fn header(&self, url: &str, body: &[u8]) -> Result<String> {
        match self {
            Auth::Basic(header) => Ok(header.clone()),
            Auth::OAuth(signer) => signer.authorization("POST", url, body),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    test_exec_issue: IssueRef,
}

#[derive(Debug, Deserialize)]
struct IssueRef {
    key: String,
}

#[derive(Debug, Serialize)]
struct NewIssue<'a> {
    fields: NewIssueFields<'a>,
}

#[derive(Debug, Serialize)]
struct NewIssueFields<'a> {
    project: KeyRef<'a>,
    summary: &'a str,
    issuetype: NameRef<'a>,
    components: Vec<NameRef<'a>>,
}

#[derive(Debug, Serialize)]
struct KeyRef<'a> {
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct NameRef<'a> {
    name: &'a str,
}

pub struct XrayClient {
    agent: Agent,
    base_url: String,
    endpoint: String,
    auth: Auth,
}

impl XrayClient {
    pub fn new(settings: &XraySettings) -> Result<Self> {
        let mut builder = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false);
        if let Some(path) = settings.certificate.as_deref() {
            builder = builder.tls_config(tls_config(path)?);
        }
        Ok(Self {
            agent: Agent::new_with_config(builder.build()),
            base_url: settings.base_url.clone(),
            endpoint: settings.endpoint.clone(),
            auth: Auth::from_credentials(&settings.credentials)?,
        })
    }

    /// Import one execution; returns the Test Execution issue key.
    pub fn import_execution(&self, execution: &WireExecution<'_>) -> Result<String> {
        let response: ImportResponse = self.post_json(&self.endpoint, execution)?;
        Ok(response.test_exec_issue.key)
    }

    /// Create an empty Test Execution issue carrying `components`.
    pub fn create_execution_issue(
        &self,
        project: &str,
        summary: &str,
        components: &[String],
    ) -> Result<String> {
        let issue = NewIssue {
            fields: NewIssueFields {
                project: KeyRef { key: project },
                summary,
                issuetype: NameRef {
                    name: EXECUTION_ISSUE_TYPE,
                },
                components: components
                    .iter()
                    .map(|name| NameRef { name })
                    .collect(),
            },
        };
        let created: IssueRef = self.post_json(ISSUE_ENDPOINT, &issue)?;
        Ok(created.key)
    }

    fn post_json<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = join_url(&self.base_url, path);
        let body = serde_json::to_vec(body).with_context(|| format!("serialize body of POST {url}"))?;
        let authorization = self.auth.header(&url, &body)?;
        tracing::debug!(url = %url, bytes = body.len(), "POST");
        let mut response = self
            .agent
            .post(url.as_str())
            .header("Authorization", authorization.as_str())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send(body.as_slice())
            .with_context(|| format!("POST {url}"))?;
        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("read response of POST {url}"))?;
        if !status.is_success() {
            return Err(anyhow!("POST {url} failed with {status}: {}", text.trim()));
        }
        serde_json::from_str(&text).with_context(|| format!("parse response of POST {url}"))
    }
}

fn tls_config(path: &Path) -> Result<TlsConfig> {
    let pem = fs::read(path).with_context(|| format!("read certificate {}", path.display()))?;
    let certificate = Certificate::from_pem(&pem)
        .with_context(|| format!("parse certificate {}", path.display()))?;
    Ok(TlsConfig::builder()
        .root_certs(RootCerts::Specific(Arc::new(vec![certificate])))
        .build())
}

fn basic_authorization(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Jira project of a document: explicit metadata, else the prefix of the
/// first test key (`POC-12` -> `POC`).
pub fn project_for(document: &ExecutionDocument) -> Option<String> {
    if let Some(project) = document.info.project.as_deref() {
        return Some(project.to_string());
    }
    document
        .tests
        .first()
        .and_then(|test| test.test_key.split_once('-'))
        .map(|(project, _)| project.to_string())
        .filter(|project| !project.is_empty())
}

/// Import every document in order, creating the execution issue first when
/// components were requested for a new execution. Returns the execution keys.
pub fn submit_documents(
    client: &XrayClient,
    documents: &[ExecutionDocument],
    components: &[String],
) -> Result<Vec<String>> {
    let mut keys = Vec::with_capacity(documents.len());
    for document in documents {
        let created = if !components.is_empty() && document.key.as_existing().is_none() {
            let project = project_for(document)
                .ok_or_else(|| anyhow!("cannot infer Jira project; pass --project"))?;
            let summary = document.info.summary.as_deref().unwrap_or_default();
            let key = client.create_execution_issue(&project, summary, components)?;
            tracing::info!(key = %key, project = %project, "created test execution");
            Some(key)
        } else {
            None
        };

        let mut wire = to_wire(document);
        if let Some(key) = created.as_deref() {
            wire.test_execution_key = Some(key);
        }
        let key = client
            .import_execution(&wire)
            .with_context(|| format!("import execution {}", document.key))?;
        tracing::info!(key = %key, tests = document.tests.len(), "imported test execution");
        keys.push(key);
    }
    Ok(keys)
}

#[cfg(test)]
#[path = "xray_tests.rs"]
mod tests;
