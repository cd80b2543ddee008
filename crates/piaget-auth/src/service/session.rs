//! Session context and page gate
//!
//! The session starts `Unresolved` and only becomes `Authenticated` or
//! `Unauthenticated` once the token has been checked. The gate renders a
//! loading state until then, so a page is never redirected on the initial
//! value alone.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::SessionUser;

/// Where the session currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unresolved,
    Authenticated(SessionUser),
    Unauthenticated,
}

impl SessionStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionStatus::Unresolved)
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            SessionStatus::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Shared session state. Clones observe the same session.
#[derive(Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<SessionStatus>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionStatus::Unresolved);
        Self { tx: Arc::new(tx) }
    }

    /// Context already resolved from a token check
    pub fn resolved_with(user: Option<SessionUser>) -> Self {
        let ctx = Self::new();
        ctx.resolve(user);
        ctx
    }

    pub fn status(&self) -> SessionStatus {
        self.tx.borrow().clone()
    }

    /// Settle the session after the token check
    pub fn resolve(&self, user: Option<SessionUser>) {
        let status = match user {
            Some(user) => SessionStatus::Authenticated(user),
            None => SessionStatus::Unauthenticated,
        };
        self.tx.send_replace(status);
    }

    pub fn signed_in(&self, user: SessionUser) {
        self.tx.send_replace(SessionStatus::Authenticated(user));
    }

    pub fn signed_out(&self) {
        self.tx.send_replace(SessionStatus::Unauthenticated);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.tx.subscribe()
    }

    /// Wait until the session is no longer `Unresolved`
    pub async fn resolved(&self) -> SessionStatus {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(SessionStatus::is_resolved).await {
            Ok(status) => (*status).clone(),
            Err(_) => self.status(),
        }
    }
}

/// Pages served behind the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Home,
    Lookup,
}

/// What the gate does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Loading,
    Render(View),
    Redirect(&'static str),
}

pub const LOGIN_PATH: &str = "/";
pub const HOME_PATH: &str = "/home";
pub const LOOKUP_PATH: &str = "/consulta";

pub struct SessionGate;

impl SessionGate {
    pub fn decide(status: &SessionStatus, path: &str) -> GateDecision {
        if !status.is_resolved() {
            return GateDecision::Loading;
        }

        let path = match path.trim_end_matches('/') {
            "" => LOGIN_PATH,
            p => p,
        };
        let authenticated = status.user().is_some();

        match path {
            LOGIN_PATH if authenticated => GateDecision::Redirect(HOME_PATH),
            LOGIN_PATH => GateDecision::Render(View::Login),
            HOME_PATH if authenticated => GateDecision::Render(View::Home),
            HOME_PATH => GateDecision::Redirect(LOGIN_PATH),
            LOOKUP_PATH => GateDecision::Render(View::Lookup),
            _ => GateDecision::Redirect(LOGIN_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn user() -> SessionUser {
        SessionUser {
            email: "secretaria@cmei.edu.br".to_string(),
        }
    }

    #[test]
    fn test_unresolved_never_redirects() {
        let status = SessionStatus::Unresolved;
        for path in ["/", "/home", "/consulta", "/login", "/qualquer"] {
            assert_eq!(SessionGate::decide(&status, path), GateDecision::Loading);
        }
    }

    #[test]
    fn test_unauthenticated_routes() {
        let status = SessionStatus::Unauthenticated;
        assert_eq!(
            SessionGate::decide(&status, "/"),
            GateDecision::Render(View::Login)
        );
        assert_eq!(
            SessionGate::decide(&status, "/home"),
            GateDecision::Redirect("/")
        );
        assert_eq!(
            SessionGate::decide(&status, "/consulta"),
            GateDecision::Render(View::Lookup)
        );
        assert_eq!(
            SessionGate::decide(&status, "/login"),
            GateDecision::Redirect("/")
        );
        assert_eq!(
            SessionGate::decide(&status, "/nada"),
            GateDecision::Redirect("/")
        );
    }

    #[test]
    fn test_authenticated_routes() {
        let status = SessionStatus::Authenticated(user());
        assert_eq!(
            SessionGate::decide(&status, "/"),
            GateDecision::Redirect("/home")
        );
        assert_eq!(
            SessionGate::decide(&status, "/home/"),
            GateDecision::Render(View::Home)
        );
        assert_eq!(
            SessionGate::decide(&status, "/consulta"),
            GateDecision::Render(View::Lookup)
        );
    }

    #[test]
    fn test_context_transitions() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.status(), SessionStatus::Unresolved);

        ctx.resolve(None);
        assert_eq!(ctx.status(), SessionStatus::Unauthenticated);

        let observer = ctx.clone();
        ctx.signed_in(user());
        assert_eq!(observer.status(), SessionStatus::Authenticated(user()));

        ctx.signed_out();
        assert_eq!(observer.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_resolved_waits_for_first_resolution() {
        let ctx = SessionContext::new();
        let resolver = ctx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            resolver.resolve(Some(SessionUser {
                email: "secretaria@cmei.edu.br".to_string(),
            }));
        });

        let status = tokio::time::timeout(Duration::from_secs(2), ctx.resolved())
            .await
            .unwrap();
        assert_eq!(status, SessionStatus::Authenticated(user()));
    }

    #[tokio::test]
    async fn test_resolved_returns_immediately_when_settled() {
        let ctx = SessionContext::resolved_with(None);
        assert_eq!(ctx.resolved().await, SessionStatus::Unauthenticated);
    }
}
