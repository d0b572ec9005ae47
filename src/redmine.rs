//! Gerrit to Redmine connector.
//!
//! Translates review comments into notes on the Redmine issues referenced
//! from the comment text or the change subject.
//!
//! See: <https://www.redmine.org/projects/redmine/wiki/Rest_api>

use lazy_static::lazy_static;
use log::{debug, error};
use regex::{Captures, Regex};
use serde_json::json;

use crate::dispatch::Handler;
use crate::event::CommentAddedEvent;
use crate::object::ApprovalKind;

lazy_static! {
    /// An issue reference is a `#` followed by up to twenty digits.
    static ref ISSUE_ID: Regex = Regex::new(r"#(\d{1,20})").unwrap();
    static ref TEMPLATE_VAR: Regex = Regex::new(r"\$(\w+)").unwrap();
}

/// Default note template; see [`render_comment`] for the available variables.
pub const DEFAULT_COMMENT_TEMPLATE: &str = "\
$comment_author_name reviewed \"$change_subject\" ($change_url):\n\
\n\
$comment\n\
\n\
Verified: $approvals_verified_value, Code-Review: $approvals_review_value";

#[derive(Debug, Clone)]
pub struct RedmineConfig {
    /// Issue URL template; `{}` is replaced by the issue id, e.g.
    /// `https://redmine.example.org/issues/{}.json`.
    pub issue_url: String,
    pub api_key: String,
    pub comment_template: String,
}

/// Handler posting review comments as issue notes.
pub struct RedmineHandler {
    config: RedmineConfig,
    client: hyper::Client,
}

/// Create a new hyper client for the given url.
fn new_client(url: &str) -> hyper::Client {
    if url.starts_with("https://") {
        let ssl = hyper_native_tls::NativeTlsClient::new().unwrap();
        let connector = hyper::net::HttpsConnector::new(ssl);
        return hyper::Client::with_connector(connector);
    }
    hyper::Client::new()
}

/// Returns the issue ids referenced in `text`, deduplicated, in order of
/// first occurrence.
fn issue_ids(text: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for caps in ISSUE_ID.captures_iter(text) {
        let id = caps[1].to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// The issues a review touches: everything referenced from the change
/// subject or from the rendered note. The note is scanned after rendering,
/// so ids pulled in by template variables count and ids in parts of the
/// comment the template drops do not.
fn referenced_issues(subject: &str, note: &str) -> Vec<String> {
    let mut ids = issue_ids(subject);
    for id in issue_ids(note) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Renders a `$variable` template against a comment event.
///
/// Approval values are looked up by kind, not by position in the wire list;
/// a kind the review did not score renders empty. Unknown variables are left
/// as written.
pub fn render_comment(template: &str, event: &CommentAddedEvent) -> String {
    let approval_value = |kind: ApprovalKind| -> String {
        event
            .approvals
            .iter()
            .find(|approval| approval.kind == kind)
            .map(|approval| approval.value.to_string())
            .unwrap_or_default()
    };

    TEMPLATE_VAR
        .replace_all(template, |caps: &Captures| -> String {
            match &caps[1] {
                "comment_author_name" => event.author.name.clone(),
                "comment_author_email" => event.author.email.clone(),
                "comment" => event.comment.clone(),
                "change_url" => event.change.url.clone(),
                "change_subject" => event.change.subject.clone(),
                "approvals_verified_value" => approval_value(ApprovalKind::Verified),
                "approvals_review_value" => approval_value(ApprovalKind::CodeReview),
                "change_owner_name" => event.change.owner.name.clone(),
                "change_owner_email" => event.change.owner.email.clone(),
                "change_number" => event.change.number.to_string(),
                "change_project" => event.change.project.clone(),
                "change_id" => event.change.change_id.clone(),
                "change_branch" => event.change.branch.clone(),
                "patchset_uploader_name" => event.patch_set.uploader.name.clone(),
                "patchset_uploader_email" => event.patch_set.uploader.email.clone(),
                "patchset_revision" => event.patch_set.revision.clone(),
                "patchset_number" => event.patch_set.number.to_string(),
                "patchset_ref" => event.patch_set.reference.clone(),
                "patchset_created_on" => event.patch_set.created_on.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

impl RedmineHandler {
    pub fn new(config: RedmineConfig) -> RedmineHandler {
        let client = new_client(&config.issue_url);
        RedmineHandler { config, client }
    }

    fn add_comment(&self, issue_id: &str, body: &str) {
        let url = self.config.issue_url.replace("{}", issue_id);
        let mut headers = hyper::header::Headers::new();
        headers.set(hyper::header::ContentType::json());
        headers.set_raw(
            "X-Redmine-API-Key",
            vec![self.config.api_key.clone().into_bytes()],
        );
        match self.client.put(url.as_str()).headers(headers).body(body).send() {
            Ok(response) => debug!(
                "redmine answered update of issue #{} with {}",
                issue_id, response.status
            ),
            Err(err) => error!("failed to update redmine issue #{}: {}", issue_id, err),
        }
    }
}

impl Handler for RedmineHandler {
    fn comment_added(&mut self, event: &CommentAddedEvent) {
        let rendered = render_comment(&self.config.comment_template, event);
        let ids = referenced_issues(&event.change.subject, &rendered);
        if ids.is_empty() {
            debug!(
                "comment on change {} references no issues",
                event.change.number
            );
            return;
        }

        let note = json!({ "issue": { "notes": rendered } }).to_string();
        for id in &ids {
            self.add_comment(id, &note);
        }
    }
}
