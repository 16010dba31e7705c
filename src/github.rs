use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value as JsonValue, json};

use crate::data::ratio::Datapoint;

// ---------------------------------------------------------------------------
// Results repository submission
// ---------------------------------------------------------------------------

/// Where accepted benchmark datapoints are collected.
#[derive(Debug, Clone)]
pub struct ResultsRepo {
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
}

impl Default for ResultsRepo {
    fn default() -> Self {
        ResultsRepo {
            owner: "Proteobot".to_string(),
            repo: "Results_Module2_quant_DDA".to_string(),
            base_branch: "main".to_string(),
        }
    }
}

/// Publish the session's datapoints as a pull request against the results
/// repository: branch off the base head, put the serialized datapoints via
/// the contents API, open the PR. Returns the PR URL.
///
/// Synchronous by design; the caller runs it inside one UI frame and shows
/// any error in the status line.
pub fn submit_datapoints(
    repo: &ResultsRepo,
    token: &str,
    datapoints: &[Datapoint],
    branch_name: &str,
) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("quantbench/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;
    let api = format!("https://api.github.com/repos/{}/{}", repo.owner, repo.repo);

    // Head commit of the base branch.
    let base_ref: JsonValue = client
        .get(format!("{api}/git/ref/heads/{}", repo.base_branch))
        .bearer_auth(token)
        .send()
        .context("fetching base branch")?
        .error_for_status()
        .context("fetching base branch")?
        .json()
        .context("decoding base branch response")?;
    let base_sha = base_ref["object"]["sha"]
        .as_str()
        .context("base branch response has no object.sha")?;

    // New branch for this submission.
    client
        .post(format!("{api}/git/refs"))
        .bearer_auth(token)
        .json(&json!({
            "ref": format!("refs/heads/{branch_name}"),
            "sha": base_sha,
        }))
        .send()
        .context("creating submission branch")?
        .error_for_status()
        .context("creating submission branch")?;

    // The datapoints file itself.
    let content = serde_json::to_string_pretty(datapoints).context("serializing datapoints")?;
    client
        .put(format!("{api}/contents/results/{branch_name}.json"))
        .bearer_auth(token)
        .json(&json!({
            "message": format!("Benchmark results {branch_name}"),
            "content": BASE64.encode(content),
            "branch": branch_name,
        }))
        .send()
        .context("uploading datapoints")?
        .error_for_status()
        .context("uploading datapoints")?;

    // And the pull request.
    let pr: JsonValue = client
        .post(format!("{api}/pulls"))
        .bearer_auth(token)
        .json(&json!({
            "title": format!("Benchmark results {branch_name}"),
            "head": branch_name,
            "base": repo.base_branch,
        }))
        .send()
        .context("opening pull request")?
        .error_for_status()
        .context("opening pull request")?
        .json()
        .context("decoding pull request response")?;

    let url = pr["html_url"]
        .as_str()
        .context("pull request response has no html_url")?;
    log::info!("Opened results pull request {url}");
    Ok(url.to_string())
}
