//! In-memory RESTCONF store for ACL rule resources
//!
//! Serves the same URLs and envelopes as a TNSR instance for the rule
//! collection and single rules of each ACL. Every request is recorded,
//! failures can be injected, and strict mode refuses a PUT onto an occupied
//! sequence number so tests can detect intermediate collisions.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use tnsr_acl_common::paths::{nodes, DATA_RESOURCE};
use tnsr_acl_common::{
    wire, AclPaths, AclRule, AclRuleList, HttpError, Method, RawResponse, Transport,
    DEFAULT_MODULE,
};
use tracing::debug;
use url::Url;

/// Base URL of a simulator not bound to a real address.
pub const SIMULATED_BASE_URL: &str = "http://restconf.test/restconf";

/// One request as seen by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    /// ACL addressed by the URL, `None` if the URL was not an ACL resource.
    pub acl_name: Option<String>,
    /// Sequence number of a single-rule URL.
    pub sequence: Option<u32>,
    /// Status the simulator answered with.
    pub status: u16,
    /// Content-Type header, when received over HTTP.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
enum Fault {
    /// Fails the write that brings `remaining` to zero.
    NthWrite { remaining: usize, status: u16 },
    /// Fails the next request with this method on this rule.
    Request {
        method: Method,
        sequence: u32,
        status: u16,
    },
}

impl Fault {
    fn status(&self) -> u16 {
        match self {
            Fault::NthWrite { status, .. } | Fault::Request { status, .. } => *status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    acl_name: String,
    sequence: Option<u32>,
}

#[derive(Debug, Default)]
struct SimState {
    acls: BTreeMap<String, BTreeMap<u32, AclRule>>,
    strict_writes: bool,
    calls: Vec<RecordedCall>,
    faults: Vec<Fault>,
}

/// Simulated RESTCONF server state.
#[derive(Debug)]
pub struct SimulatedRestconf {
    paths: AclPaths,
    state: Mutex<SimState>,
}

impl Default for SimulatedRestconf {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRestconf {
    /// Creates an empty simulator using the default module prefix.
    pub fn new() -> Self {
        let paths = AclPaths::new(SIMULATED_BASE_URL, DEFAULT_MODULE)
            .expect("simulated base URL is a valid base");
        Self::with_paths(paths)
    }

    /// Creates an empty simulator answering for `paths`.
    pub fn with_paths(paths: AclPaths) -> Self {
        Self {
            paths,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Refuse PUT onto an occupied sequence number with 409.
    pub fn strict(self) -> Self {
        self.state.lock().strict_writes = true;
        self
    }

    /// URL builder matching this simulator.
    pub fn paths(&self) -> AclPaths {
        self.paths.clone()
    }

    /// Creates an ACL with no rules.
    pub fn create_acl(&self, acl_name: &str) {
        self.state.lock().acls.entry(acl_name.to_string()).or_default();
    }

    /// Creates the ACL if needed and stores the rules, keyed by their sequence.
    ///
    /// Rules without a sequence number are ignored.
    pub fn seed(&self, acl_name: &str, rules: impl IntoIterator<Item = AclRule>) {
        let mut state = self.state.lock();
        let acl = state.acls.entry(acl_name.to_string()).or_default();
        for rule in rules {
            if let Some(sequence) = rule.sequence {
                acl.insert(sequence, rule);
            }
        }
    }

    /// Stored sequence numbers, ascending. Empty for an unknown ACL.
    pub fn sequences(&self, acl_name: &str) -> Vec<u32> {
        self.state
            .lock()
            .acls
            .get(acl_name)
            .map(|rules| rules.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Stored rule at a sequence number.
    pub fn rule(&self, acl_name: &str, sequence: u32) -> Option<AclRule> {
        self.state
            .lock()
            .acls
            .get(acl_name)
            .and_then(|rules| rules.get(&sequence))
            .cloned()
    }

    /// Fails the `n`th write (PUT, POST or DELETE) from now on with `status`.
    pub fn fail_nth_write(&self, n: usize, status: u16) {
        self.state.lock().faults.push(Fault::NthWrite {
            remaining: n.max(1),
            status,
        });
    }

    /// Fails the next `method` request on rule `sequence` with `status`.
    pub fn fail_request(&self, method: Method, sequence: u32, status: u16) {
        self.state.lock().faults.push(Fault::Request {
            method,
            sequence,
            status,
        });
    }

    /// All recorded requests, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Recorded PUT, POST and DELETE requests.
    pub fn write_calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method.is_write())
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn write_count(&self) -> usize {
        self.write_calls().len()
    }

    /// Forgets recorded requests.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Answers one request addressed by URL path.
    pub fn handle(
        &self,
        method: Method,
        path: &str,
        body: Option<&str>,
        content_type: Option<&str>,
    ) -> RawResponse {
        let target = self.parse_target(path);
        let mut state = self.state.lock();

        let response = match state.take_fault(method, target.as_ref()) {
            Some(status) => restconf_error(status, "operation-failed", "injected failure"),
            None => match &target {
                Some(target) => state.apply(&self.paths, method, target, body),
                None => restconf_error(404, "invalid-value", "uri keypath not found"),
            },
        };

        debug!(%method, path, status = response.status, "Simulated RESTCONF request");
        state.calls.push(RecordedCall {
            method,
            acl_name: target.as_ref().map(|t| t.acl_name.clone()),
            sequence: target.and_then(|t| t.sequence),
            status: response.status,
            content_type: content_type.map(str::to_string),
        });
        response
    }

    /// Splits `.../data/m:acl-config/m:acl-table/m:acl-list=NAME/m:acl-rules[/m:acl-rule=SEQ]`.
    ///
    /// ACL names are matched as they appear in the path, without decoding.
    fn parse_target(&self, path: &str) -> Option<Target> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let data = segments.iter().position(|s| *s == DATA_RESOURCE)?;
        let rest = &segments[data + 1..];

        let list_prefix = format!("{}=", self.paths.qualified(nodes::ACL_LIST));
        let rule_prefix = format!("{}=", self.paths.qualified(nodes::ACL_RULE));

        let (config, table, list, rules, rule) = match rest {
            [c, t, l, r] => (*c, *t, *l, *r, None),
            [c, t, l, r, one] => (*c, *t, *l, *r, Some(*one)),
            _ => return None,
        };
        if config != self.paths.qualified(nodes::ACL_CONFIG)
            || table != self.paths.qualified(nodes::ACL_TABLE)
            || rules != self.paths.qualified(nodes::ACL_RULES)
        {
            return None;
        }

        let acl_name = list.strip_prefix(&list_prefix)?.to_string();
        let sequence = match rule {
            Some(segment) => Some(segment.strip_prefix(&rule_prefix)?.parse().ok()?),
            None => None,
        };
        Some(Target { acl_name, sequence })
    }
}

impl SimState {
    fn take_fault(&mut self, method: Method, target: Option<&Target>) -> Option<u16> {
        let sequence = target.and_then(|t| t.sequence);
        let mut hit = None;

        for (i, fault) in self.faults.iter_mut().enumerate() {
            let fires = match fault {
                Fault::NthWrite { remaining, .. } if method.is_write() => {
                    *remaining = remaining.saturating_sub(1);
                    *remaining == 0
                }
                Fault::NthWrite { .. } => false,
                Fault::Request {
                    method: m,
                    sequence: s,
                    ..
                } => *m == method && Some(*s) == sequence,
            };
            if fires && hit.is_none() {
                hit = Some(i);
            }
        }

        hit.map(|i| self.faults.remove(i).status())
    }

    fn apply(
        &mut self,
        paths: &AclPaths,
        method: Method,
        target: &Target,
        body: Option<&str>,
    ) -> RawResponse {
        let strict = self.strict_writes;
        let Some(rules) = self.acls.get_mut(&target.acl_name) else {
            return restconf_error(404, "invalid-value", "uri keypath not found");
        };

        match (method, target.sequence) {
            (Method::Get, None) => {
                if rules.is_empty() {
                    return RawResponse::new(200, "{}");
                }
                let list = AclRuleList::new(rules.values().cloned().collect());
                match wire::encode_rule_list(paths, &list) {
                    Ok(body) => RawResponse::new(200, body),
                    Err(e) => restconf_error(500, "operation-failed", &e.to_string()),
                }
            }
            (Method::Get, Some(sequence)) => match rules.get(&sequence) {
                Some(rule) => match wire::encode_rule(paths, rule) {
                    Ok(body) => RawResponse::new(200, body),
                    Err(e) => restconf_error(500, "operation-failed", &e.to_string()),
                },
                None => restconf_error(404, "invalid-value", "uri keypath not found"),
            },
            (Method::Put | Method::Post, Some(sequence)) => {
                let rule = match body.map(|b| wire::decode_rule(paths, b)) {
                    Some(Ok(rule)) => rule,
                    Some(Err(e)) => {
                        return restconf_error(400, "malformed-message", &e.to_string())
                    }
                    None => return restconf_error(400, "malformed-message", "missing body"),
                };
                if rule.sequence != Some(sequence) {
                    return restconf_error(
                        400,
                        "invalid-value",
                        "sequence in body does not match the resource",
                    );
                }

                let exists = rules.contains_key(&sequence);
                if exists && (method == Method::Post || strict) {
                    return restconf_error(409, "data-exists", "object already exists");
                }
                rules.insert(sequence, rule);
                RawResponse::new(if exists { 204 } else { 201 }, "")
            }
            (Method::Delete, Some(sequence)) => match rules.remove(&sequence) {
                Some(_) => RawResponse::new(204, ""),
                None => restconf_error(404, "data-missing", "object does not exist"),
            },
            _ => restconf_error(405, "operation-not-supported", "operation not supported"),
        }
    }
}

/// RESTCONF error reply with one error entry.
pub fn restconf_error(status: u16, tag: &str, message: &str) -> RawResponse {
    let body = json!({
        "ietf-restconf:errors": {
            "error": [{
                "error-type": "application",
                "error-tag": tag,
                "error-message": message,
            }]
        }
    });
    RawResponse::new(status, body.to_string())
}

/// Reason phrase for the statuses the simulator produces.
pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

#[async_trait]
impl Transport for SimulatedRestconf {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> Result<RawResponse, HttpError> {
        // Suspend once, as a real round trip would.
        tokio::task::yield_now().await;

        let url = Url::parse(url).map_err(|e| HttpError::network(e.to_string()))?;
        let response = self.handle(method, url.path(), body.as_deref(), None);
        let status = response.status;
        response.into_result(status_text(status))
    }
}
