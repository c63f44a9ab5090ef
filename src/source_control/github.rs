use async_trait::async_trait;
use reqwest::{Client, Response, header};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};
use crate::source_control::{DeploymentState, PullRequest, SourceControl};

const GITHUB_API: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

/// GitHub REST API client scoped to one repository.
pub struct GitHub {
    client: Client,
    api_base: String,
    token: String,
    owner: String,
    repo: String,
}

#[derive(Deserialize)]
struct PullRecord {
    number: u64,
    head: HeadRecord,
}

#[derive(Deserialize)]
struct HeadRecord {
    sha: String,
}

#[derive(Deserialize)]
struct DeploymentRecord {
    id: u64,
}

impl GitHub {
    pub fn new(token: &str, owner: &str, repo: &str) -> DeployResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("tandem/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: GITHUB_API.to_string(),
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Point the client at another API root (GitHub Enterprise).
    #[must_use]
    pub fn api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.api_base, self.owner, self.repo)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

async fn check(response: Response) -> DeployResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(DeployError::SourceControl(format!("{status} from {url}: {body}")))
}

#[async_trait]
impl SourceControl for GitHub {
    async fn list_open_pull_requests(&self) -> DeployResult<Vec<PullRequest>> {
        let url = self.repo_url("/pulls");
        let mut pulls = Vec::new();

        for page in 1.. {
            debug!(%url, page, "listing open pull requests");
            let response = self
                .request(reqwest::Method::GET, &url)
                .query(&[
                    ("state", "open".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?;
            let records: Vec<PullRecord> = check(response).await?.json().await?;
            let last_page = records.len() < PER_PAGE;

            pulls.extend(records.into_iter().map(|r| PullRequest {
                number: r.number,
                head_sha: r.head.sha,
            }));

            if last_page {
                break;
            }
        }

        Ok(pulls)
    }

    async fn create_deployment(&self, git_ref: &str, environment: &str) -> DeployResult<u64> {
        let response = self
            .request(reqwest::Method::POST, &self.repo_url("/deployments"))
            .json(&json!({
                "ref": git_ref,
                "task": "deploy",
                "auto_merge": false,
                "required_contexts": [],
                "environment": environment,
            }))
            .send()
            .await?;
        let record: DeploymentRecord = check(response).await?.json().await?;

        info!(id = record.id, git_ref, environment, "created deployment");
        Ok(record.id)
    }

    async fn set_deployment_status(
        &self,
        deployment_id: u64,
        git_ref: &str,
        state: DeploymentState,
        environment_url: &str,
    ) -> DeployResult<()> {
        let path = format!("/deployments/{deployment_id}/statuses");
        let response = self
            .request(reqwest::Method::POST, &self.repo_url(&path))
            .json(&json!({
                "ref": git_ref,
                "state": state,
                "environment_url": environment_url,
            }))
            .send()
            .await?;
        check(response).await?;

        info!(deployment_id, %state, environment_url, "set deployment status");
        Ok(())
    }
}
