//! Compatibility rule table.
//!
//! # Responsibilities
//! - Hold the ordered rule list
//! - Select exactly one action per request from (path, method, status, variant)
//!
//! # Design Decisions
//! - Longest matching path prefix wins; ties go to the earlier rule
//! - Path matching is case-sensitive and prefix-only, no regex
//! - Immutable after construction, shared without locks

use axum::http::{Method, StatusCode};

use crate::config::ShimVariant;

/// Backend status condition of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Any,
    /// 2xx.
    Success,
    /// Anything but 2xx.
    Failure,
    /// Exactly 204.
    NoContent,
    /// Anything but 204.
    HasBody,
}

impl StatusClass {
    pub fn matches(self, status: StatusCode) -> bool {
        match self {
            StatusClass::Any => true,
            StatusClass::Success => status.is_success(),
            StatusClass::Failure => !status.is_success(),
            StatusClass::NoContent => status == StatusCode::NO_CONTENT,
            StatusClass::HasBody => status != StatusCode::NO_CONTENT,
        }
    }
}

/// Literal body served in place of a failed backend response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthetic {
    EmptyObject,
    True,
}

impl Synthetic {
    pub fn body(self) -> &'static str {
        match self {
            Synthetic::EmptyObject => "{}",
            Synthetic::True => "true",
        }
    }
}

/// What the shim does with a backend response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Relay status, headers and body; `content-length` dropped.
    Passthrough,
    /// Serve the asset-directory manifest with its sidecar files inlined.
    ServeManifest,
    /// Serve a literal JSON body with status 200.
    Synthesize(Synthetic),
    /// Serve `download_infos` translated into library descriptors.
    TranslateLibraries { installed_only: bool },
    /// Append the proxy version to the engine's version string.
    TagVersion,
    /// Relay a 204 without touching the body.
    NoContent,
}

impl Action {
    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Passthrough => "passthrough",
            Action::ServeManifest => "manifest",
            Action::Synthesize(_) => "synthesize",
            Action::TranslateLibraries { installed_only: false } => "downloadable_libraries",
            Action::TranslateLibraries { installed_only: true } => "installed_libraries",
            Action::TagVersion => "version",
            Action::NoContent => "no_content",
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone)]
pub struct Rule {
    prefix: &'static str,
    method: Option<Method>,
    status: StatusClass,
    variant: Option<ShimVariant>,
    action: Action,
}

impl Rule {
    pub fn new(prefix: &'static str, status: StatusClass, action: Action) -> Self {
        Self {
            prefix,
            method: None,
            status,
            variant: None,
            action,
        }
    }

    /// Restrict the rule to one HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Restrict the rule to one shim variant.
    pub fn variant(mut self, variant: ShimVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    fn matches(&self, path: &str, method: &Method, status: StatusCode, variant: ShimVariant) -> bool {
        path.starts_with(self.prefix)
            && self.method.as_ref().map_or(true, |m| m == method)
            && self.variant.map_or(true, |v| v == variant)
            && self.status.matches(status)
    }
}

/// Ordered rule list evaluated once per request.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The proxy's rule table.
    pub fn standard() -> Self {
        let libraries = |installed_only| Action::TranslateLibraries { installed_only };

        Self::new(vec![
            Rule::new("engine_manifest", StatusClass::Any, Action::ServeManifest),
            Rule::new("", StatusClass::NoContent, Action::NoContent),
            Rule::new("", StatusClass::Success, Action::Passthrough),
            Rule::new("user_dict", StatusClass::Failure, Action::Synthesize(Synthetic::EmptyObject))
                .method(Method::GET),
            Rule::new("import_user_dict", StatusClass::Failure, Action::Synthesize(Synthetic::EmptyObject)),
            Rule::new("is_initialized_speaker", StatusClass::Failure, Action::Synthesize(Synthetic::True)),
            Rule::new("downloadable_libraries", StatusClass::Any, libraries(false))
                .variant(ShimVariant::V2),
            Rule::new("installed_libraries", StatusClass::Failure, libraries(true))
                .variant(ShimVariant::V2),
            Rule::new("version", StatusClass::HasBody, Action::TagVersion),
        ])
    }

    /// Pick the action for a request. Falls back to [`Action::Passthrough`].
    pub fn select(
        &self,
        path: &str,
        method: &Method,
        status: StatusCode,
        variant: ShimVariant,
    ) -> Action {
        let mut best: Option<&Rule> = None;
        for rule in &self.rules {
            if !rule.matches(path, method, status, variant) {
                continue;
            }
            if best.map_or(true, |b| rule.prefix.len() > b.prefix.len()) {
                best = Some(rule);
            }
        }
        best.map_or(Action::Passthrough, |rule| rule.action)
    }
}
