//! Access rules keyed by (model name, action).
//!
//! A check returns an `AccessDecision` instead of calling a continuation, so every
//! request gets exactly one answer. No rule means allow with unmodified options.

use crate::extractors::RequestMeta;
use crate::service::RequestOptions;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Count,
    Get,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Count => "count",
            Action::Get => "get",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a check sees besides the proposed options.
#[derive(Debug)]
pub struct AccessContext<'a> {
    pub model: &'a str,
    pub alias: &'a str,
    pub action: Action,
    pub request: &'a RequestMeta,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AccessDecision {
    /// Proceed with these options (the proposed ones, or a narrowed copy).
    Allow(RequestOptions),
    Deny,
}

#[async_trait]
pub trait AccessCheck: Send + Sync {
    async fn check(&self, ctx: &AccessContext<'_>, options: RequestOptions) -> AccessDecision;
}

#[async_trait]
impl<F> AccessCheck for F
where
    F: Fn(&AccessContext<'_>, RequestOptions) -> AccessDecision + Send + Sync,
{
    async fn check(&self, ctx: &AccessContext<'_>, options: RequestOptions) -> AccessDecision {
        self(ctx, options)
    }
}

#[derive(Clone)]
pub enum AccessRule {
    /// Wildcard: allow, options untouched.
    Allow,
    Check(Arc<dyn AccessCheck>),
}

impl AccessRule {
    pub fn check<F>(f: F) -> Self
    where
        F: Fn(&AccessContext<'_>, RequestOptions) -> AccessDecision + Send + Sync + 'static,
    {
        AccessRule::Check(Arc::new(f))
    }

    /// Always deny.
    pub fn deny() -> Self {
        Self::check(|_, _| AccessDecision::Deny)
    }
}

impl fmt::Debug for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessRule::Allow => f.write_str("AccessRule::Allow"),
            AccessRule::Check(_) => f.write_str("AccessRule::Check(..)"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AccessRules {
    rules: HashMap<(String, Action), AccessRule>,
}

impl AccessRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, model: impl Into<String>, action: Action, rule: AccessRule) -> Self {
        self.rules.insert((model.into(), action), rule);
        self
    }

    /// Same rule for several actions of one model.
    pub fn rule_for(mut self, model: &str, actions: &[Action], rule: AccessRule) -> Self {
        for action in actions {
            self.rules.insert((model.to_string(), *action), rule.clone());
        }
        self
    }

    pub fn get(&self, model: &str, action: Action) -> Option<&AccessRule> {
        self.rules.get(&(model.to_string(), action))
    }

    pub async fn authorize(&self, ctx: &AccessContext<'_>, options: RequestOptions) -> AccessDecision {
        match self.get(ctx.model, ctx.action) {
            None | Some(AccessRule::Allow) => AccessDecision::Allow(options),
            Some(AccessRule::Check(check)) => {
                let decision = check.check(ctx, options).await;
                tracing::debug!(
                    model = ctx.model,
                    action = %ctx.action,
                    allowed = matches!(decision, AccessDecision::Allow(_)),
                    "access check"
                );
                decision
            }
        }
    }
}
