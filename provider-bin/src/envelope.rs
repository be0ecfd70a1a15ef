//! One lifecycle call per invocation: a JSON request on stdin, a JSON
//! response on stdout.

use daytona_common::{Diagnostic, Diagnostics, OpContext, SnapshotRecord};
use daytona_snapshot::{Outcome, SnapshotResource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub operation: Operation,
    #[serde(default)]
    pub planned: Option<SnapshotRecord>,
    #[serde(default)]
    pub prior: Option<SnapshotRecord>,
    #[serde(default)]
    pub import_id: Option<String>,
    /// Provider block values; the environment fills in what is missing.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub state: Option<SnapshotRecord>,
    pub diagnostics: Diagnostics,
}

impl Response {
    pub fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            state: None,
            diagnostics: diagnostic.into(),
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

impl From<Outcome> for Response {
    fn from(outcome: Outcome) -> Self {
        Self {
            state: outcome.state,
            diagnostics: outcome.diagnostics,
        }
    }
}

fn missing(operation: Operation, field: &str) -> Response {
    Response::failed(Diagnostic::error(
        "Invalid Request",
        format!("{operation:?} requires the {field:?} field"),
    ))
}

pub async fn dispatch(resource: &SnapshotResource, ctx: &OpContext, request: Request) -> Response {
    let Request {
        operation,
        planned,
        prior,
        import_id,
        ..
    } = request;

    match operation {
        Operation::Create => match planned {
            Some(planned) => resource.create(ctx, planned).await.into(),
            None => missing(operation, "planned"),
        },
        Operation::Read => match prior {
            Some(current) => resource.read(current).await.into(),
            None => missing(operation, "prior"),
        },
        Operation::Update => match (prior, planned) {
            (Some(prior), Some(planned)) => resource.update(ctx, prior, planned).await.into(),
            (None, _) => missing(operation, "prior"),
            (_, None) => missing(operation, "planned"),
        },
        Operation::Delete => match prior {
            Some(current) => resource.delete(ctx, current).await.into(),
            None => missing(operation, "prior"),
        },
        Operation::Import => match import_id {
            Some(id) if !id.is_empty() => resource.import(&id).await.into(),
            _ => missing(operation, "import_id"),
        },
    }
}
