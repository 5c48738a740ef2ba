//! Built-in HTTP runner
//!
//! Runs every request of a partition in tree order with the crate's HTTP
//! client and checks responses against the request's `expect` block.

use anyhow::Result;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tracing::{debug, info, warn};

use super::runner::{ReporterFormat, RunError, Runner};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::models::{
    Assertion, Collection, Execution, ExecutionResult, Expectation, Item, Request,
};
use crate::partition::Partition;

/// Runner backed by [`HttpClient`]
#[derive(Clone)]
pub struct HttpRunner {
    client: HttpClient,
}

impl HttpRunner {
    pub fn new(timeout_secs: u64, insecure: bool) -> Result<Self> {
        let client = HttpClient::with_timeout(timeout_secs, insecure)?;
        if client.is_insecure() {
            warn!("TLS certificate verification is disabled");
        }
        Ok(Self { client })
    }

    async fn run_partition(&self, partition: &Partition) -> Result<ExecutionResult, RunError> {
        let mut result_tree = partition.collection.clone();
        assign_ids(&mut result_tree);

        let variables = collection_variables(&result_tree);
        let mut requests = Vec::new();
        collect_requests(result_tree.item.as_deref().unwrap_or(&[]), &mut requests);

        info!(
            "Running {} requests for '{}'",
            requests.len(),
            partition.name()
        );

        let mut executions = Vec::with_capacity(requests.len());
        for request in requests {
            let assertions = self.execute(request, &variables).await;
            executions.push(Execution {
                item_id: request.id.clone().unwrap_or_default(),
                item_name: request.name.clone(),
                assertions,
            });
        }

        Ok(ExecutionResult {
            result_tree,
            executions,
        })
    }

    async fn execute(&self, request: &Request, variables: &HashMap<String, String>) -> Vec<Assertion> {
        let Some(spec) = request.request.as_ref() else {
            return vec![Assertion::fail("request has a URL", "no request definition")];
        };
        let Some(url) = spec.url() else {
            return vec![Assertion::fail("request has a URL", "request URL is missing")];
        };

        let mut http_request = HttpRequest::new(spec.method(), substitute(url, variables));
        for header in spec.headers() {
            http_request = http_request.header(
                substitute(&header.key, variables),
                substitute(&header.value, variables),
            );
        }
        if let Some(body) = spec.body() {
            http_request = http_request.body(substitute(body, variables));
        }

        debug!("{} -> {} {}", request.name, http_request.method, http_request.url);

        match self.client.send(&http_request).await {
            Ok(response) => evaluate(request.expect.as_ref(), &response),
            Err(e) => vec![Assertion::fail("request completed", e.to_string())],
        }
    }
}

impl Runner for HttpRunner {
    fn run(
        &self,
        partition: &Partition,
        _format: ReporterFormat,
    ) -> impl Future<Output = Result<ExecutionResult, RunError>> + Send {
        self.run_partition(partition)
    }
}

/// Check a response against the declared expectations
///
/// Without an `expect` block the only check is a 2xx status.
pub fn evaluate(expect: Option<&Expectation>, response: &HttpResponse) -> Vec<Assertion> {
    let Some(expect) = expect else {
        let name = "status is 2xx";
        return vec![if response.is_success() {
            Assertion::pass(name)
        } else {
            Assertion::fail(name, format!("expected 2xx but got {}", response.status_code))
        }];
    };

    let mut assertions = Vec::new();

    match expect.status {
        Some(status) => {
            let name = format!("status is {status}");
            assertions.push(if response.status_code == status {
                Assertion::pass(name)
            } else {
                Assertion::fail(
                    name,
                    format!("expected {} but got {}", status, response.status_code),
                )
            });
        }
        None => {
            let name = "status is 2xx";
            assertions.push(if response.is_success() {
                Assertion::pass(name)
            } else {
                Assertion::fail(name, format!("expected 2xx but got {}", response.status_code))
            });
        }
    }

    for text in &expect.body_contains {
        let name = format!("body contains '{text}'");
        assertions.push(if response.body_contains(text) {
            Assertion::pass(name)
        } else {
            Assertion::fail(name, format!("'{text}' not found in response body"))
        });
    }

    for header in &expect.headers {
        let name = format!("header '{header}' present");
        assertions.push(if response.get_header(header).is_some() {
            Assertion::pass(name)
        } else {
            Assertion::fail(name, format!("response has no '{header}' header"))
        });
    }

    if let Some(max) = expect.max_duration_ms {
        let name = format!("response time below {max}ms");
        assertions.push(if response.duration_ms <= max {
            Assertion::pass(name)
        } else {
            Assertion::fail(name, format!("took {}ms", response.duration_ms))
        });
    }

    assertions
}

/// Give every node of the tree a fresh id, unique within the tree
fn assign_ids(collection: &mut Collection) {
    let mut used = HashSet::new();
    collection.id = Some(fresh_id(&mut used));
    if let Some(items) = collection.item.as_mut() {
        assign_item_ids(items, &mut used);
    }
}

fn assign_item_ids(items: &mut [Item], used: &mut HashSet<String>) {
    for item in items {
        match item {
            Item::Folder(folder) => {
                folder.id = Some(fresh_id(used));
                assign_item_ids(&mut folder.item, used);
            }
            Item::Request(request) => request.id = Some(fresh_id(used)),
        }
    }
}

fn fresh_id(used: &mut HashSet<String>) -> String {
    loop {
        let id = format!(
            "{:08x}-{:04x}-{:04x}",
            rand::random::<u32>(),
            rand::random::<u16>(),
            rand::random::<u16>()
        );
        if used.insert(id.clone()) {
            return id;
        }
    }
}

/// Requests in depth-first order
fn collect_requests<'a>(items: &'a [Item], out: &mut Vec<&'a Request>) {
    for item in items {
        match item {
            Item::Folder(folder) => collect_requests(&folder.item, out),
            Item::Request(request) => out.push(request),
        }
    }
}

/// `variable` entries of the collection as a key/value map
fn collection_variables(collection: &Collection) -> HashMap<String, String> {
    let mut variables = HashMap::new();
    if let Some(Value::Array(entries)) = collection.extra.get("variable") {
        for entry in entries {
            let key = entry.get("key").and_then(Value::as_str);
            let value = entry.get("value").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            if let (Some(key), Some(value)) = (key, value) {
                variables.insert(key.to_string(), value);
            }
        }
    }
    variables
}

/// Replace `{{name}}` placeholders; unknown names are left as they are
fn substitute(text: &str, variables: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match variables.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
