//! Single-writer gate guarding every side-effecting tool call.
//!
//! Tools that touch the filesystem (Edit, MultiEdit, Write, Download) or
//! issue non-`GET` network requests (Fetch) ask a [`PermissionBroker`]
//! before the side effect happens. The broker either answers immediately
//! (yolo mode, or a standing session grant) or parks the request until the
//! UI resolves it via [`PermissionBroker::grant`],
//! [`PermissionBroker::grant_session`], or [`PermissionBroker::deny`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A pending or resolved request for permission to perform a side effect.
/// Not persisted — these are process-local, discarded once resolved.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub id: String,
    pub session_id: String,
    pub tool_call_id: String,
    pub tool_name: String,
    pub action: String,
    pub path: Option<String>,
    pub params_summary: String,
}

/// The resolution of a [`PermissionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowSession,
    Deny,
}

/// Normalized key a session-scoped grant is remembered under: the tool name
/// plus a normalized scope (a workspace-relative path for file tools, the
/// exact command string for Bash — see `normalized_scope`).
type GrantKey = (String, String, String);

struct PendingEntry {
    responder: oneshot::Sender<Decision>,
}

struct BrokerState {
    yolo: bool,
    pending: HashMap<String, PendingEntry>,
    session_grants: std::collections::HashSet<GrantKey>,
    subscribers: Vec<mpsc::Sender<PermissionRequest>>,
}

/// Request/response gate for side-effecting tool calls.
///
/// Cloning a `PermissionBroker` shares the same underlying state (it wraps
/// an `Arc`), so tool structs can hold one directly.
#[derive(Clone)]
pub struct PermissionBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl PermissionBroker {
    /// `yolo`: if true, every request is granted without prompting, matching
    /// `Config.SkipPermissionsRequests`.
    pub fn new(yolo: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                yolo,
                pending: HashMap::new(),
                session_grants: std::collections::HashSet::new(),
                subscribers: Vec::new(),
            })),
        }
    }

    /// Normalize the "same action" key for a grant: workspace-relative path
    /// for file tools, or the exact command string for Bash (per the
    /// resolved grant-scope design decision — not argv[0]).
    pub fn normalized_scope(tool_name: &str, action: &str) -> String {
        let _ = tool_name;
        action.to_string()
    }

    /// Ask whether `tool_name` may perform `action` (and optionally touch
    /// `path`) in `session_id`. Blocks until a decision is reached or `token`
    /// is cancelled, in which case the request is withdrawn and this
    /// returns `Decision::Deny`.
    pub async fn request(
        &self,
        session_id: &str,
        tool_call_id: &str,
        tool_name: &str,
        action: &str,
        path: Option<String>,
        params_summary: String,
        token: &CancellationToken,
    ) -> Decision {
        let scope = Self::normalized_scope(tool_name, action);

        {
            let mut state = self.state.lock();
            if state.yolo {
                return Decision::Allow;
            }
            let key = (session_id.to_string(), tool_name.to_string(), scope.clone());
            if state.session_grants.contains(&key) {
                return Decision::Allow;
            }
        }

        let id = format!("perm-{}", uuid_like());
        let (tx, rx) = oneshot::channel();
        let request = PermissionRequest {
            id: id.clone(),
            session_id: session_id.to_string(),
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            action: action.to_string(),
            path,
            params_summary,
        };

        {
            let mut state = self.state.lock();
            state.pending.insert(id.clone(), PendingEntry { responder: tx });
            state
                .subscribers
                .retain(|sub| sub.try_send(request.clone()).is_ok());
        }

        let decision = tokio::select! {
            resolved = rx => resolved.unwrap_or(Decision::Deny),
            _ = token.cancelled() => {
                self.state.lock().pending.remove(&id);
                Decision::Deny
            }
        };

        if decision == Decision::AllowSession {
            let mut state = self.state.lock();
            state
                .session_grants
                .insert((session_id.to_string(), tool_name.to_string(), scope));
        }

        decision
    }

    /// Resolve a pending request with a one-time grant.
    pub fn grant(&self, id: &str) {
        self.resolve(id, Decision::Allow);
    }

    /// Resolve a pending request with a grant that is remembered for the
    /// rest of the session under `(tool_name, normalized_scope)`.
    pub fn grant_session(&self, id: &str) {
        self.resolve(id, Decision::AllowSession);
    }

    /// Resolve a pending request with a denial.
    pub fn deny(&self, id: &str) {
        self.resolve(id, Decision::Deny);
    }

    fn resolve(&self, id: &str, decision: Decision) {
        if let Some(entry) = self.state.lock().pending.remove(id) {
            let _ = entry.responder.send(decision);
        }
    }

    /// Subscribe to new [`PermissionRequest`]s as they're created. The UI is
    /// the intended subscriber; the channel closes when the broker is
    /// dropped.
    pub fn subscribe(&self) -> mpsc::Receiver<PermissionRequest> {
        let (tx, rx) = mpsc::channel(16);
        self.state.lock().subscribers.push(tx);
        rx
    }

    /// Seed `child_session_id`'s grants from `parent_session_id`'s, per the
    /// sub-agent permission inheritance design decision: inherited grants
    /// are a seed, not a ceiling — the child still prompts for anything not
    /// already covered.
    pub fn inherit_session_grants(&self, parent_session_id: &str, child_session_id: &str) {
        let mut state = self.state.lock();
        let inherited: Vec<GrantKey> = state
            .session_grants
            .iter()
            .filter(|(sess, _, _)| sess == parent_session_id)
            .map(|(_, tool, scope)| (child_session_id.to_string(), tool.clone(), scope.clone()))
            .collect();
        state.session_grants.extend(inherited);
    }
}

/// Cheap process-local unique id, good enough for in-memory request
/// correlation (these are never persisted).
fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", std::process::id(), n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yolo_mode_allows_immediately() {
        let broker = PermissionBroker::new(true);
        let token = CancellationToken::new();
        let decision = broker
            .request("sess1", "call1", "write", "foo.txt", Some("foo.txt".into()), "write foo.txt".into(), &token)
            .await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn session_grant_is_remembered() {
        let broker = PermissionBroker::new(false);
        let token = CancellationToken::new();

        let broker2 = broker.clone();
        let handle = tokio::spawn(async move {
            broker2
                .request("sess1", "call1", "write", "foo.txt", Some("foo.txt".into()), "write foo.txt".into(), &token)
                .await
        });

        // Wait for the request to be pending, then grant it for the session.
        let mut rx = broker.subscribe();
        let req = rx.recv().await.unwrap();
        broker.grant_session(&req.id);
        assert_eq!(handle.await.unwrap(), Decision::AllowSession);

        // A second request for the same (session, tool, scope) now resolves
        // without prompting.
        let token2 = CancellationToken::new();
        let decision = broker
            .request("sess1", "call2", "write", "foo.txt", Some("foo.txt".into()), "write foo.txt".into(), &token2)
            .await;
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn cancellation_denies() {
        let broker = PermissionBroker::new(false);
        let token = CancellationToken::new();
        token.cancel();
        let decision = broker
            .request("sess1", "call1", "bash", "rm foo", None, "rm foo".into(), &token)
            .await;
        assert_eq!(decision, Decision::Deny);
    }
}
