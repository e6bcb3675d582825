//! IAM policy document types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const POLICY_VERSION: &str = "2012-10-17";

/// Only `Allow` statements are ever produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: Effect,
    #[serde(rename = "Action")]
    pub actions: BTreeSet<String>,
    #[serde(rename = "Resource")]
    pub resources: BTreeSet<String>,
}

impl PolicyStatement {
    pub fn allow<A, R>(sid: &str, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            sid: sid.to_string(),
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.resources.contains("*")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    #[serde(rename = "Statement")]
    pub statements: Vec<PolicyStatement>,
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statements: Vec::new(),
        }
    }
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }

    pub fn statement(&self, sid: &str) -> Option<&PolicyStatement> {
        self.statements.iter().find(|s| s.sid == sid)
    }

    /// Whether any statement grants `action`
    pub fn grants(&self, action: &str) -> bool {
        self.statements.iter().any(|s| s.actions.contains(action))
    }

    /// Every action granted, across statements
    pub fn actions(&self) -> BTreeSet<&str> {
        self.statements
            .iter()
            .flat_map(|s| s.actions.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustStatement {
    pub effect: Effect,
    pub principal: Principal,
    pub action: String,
}

/// Assume-role policy naming the one service allowed to use a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustPolicy {
    pub version: String,
    #[serde(rename = "Statement")]
    pub statements: Vec<TrustStatement>,
}

impl TrustPolicy {
    pub fn for_service(service: &str) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statements: vec![TrustStatement {
                effect: Effect::Allow,
                principal: Principal {
                    service: service.to_string(),
                },
                action: "sts:AssumeRole".to_string(),
            }],
        }
    }

    pub fn service(&self) -> Option<&str> {
        self.statements.first().map(|s| s.principal.service.as_str())
    }
}
