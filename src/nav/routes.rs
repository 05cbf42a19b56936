//! Route map of the platform.
//!
//! Routes are identified by name (`admin.dashboard`, `custom.chat`, ...).
//! Each record carries a path template (`:param`, optional `:param?`) and
//! the access metadata inherited from its section.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::NavigationError;
use crate::net::types::Role;

// =============================================================================
// ROUTE NAME
// =============================================================================

/// Structural identifier of a destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteName(Cow<'static, str>);

impl RouteName {
    pub const HOME: Self = Self::from_static("home");
    pub const LOGIN: Self = Self::from_static("auth.login");
    pub const REGISTER: Self = Self::from_static("auth.register");
    pub const FORGOT_PASSWORD: Self = Self::from_static("auth.forgotpassword");
    pub const RESET_PASSWORD: Self = Self::from_static("auth.reset-password");
    pub const VERIFY_EMAIL: Self = Self::from_static("auth.verify-email");
    pub const ADMIN_DASHBOARD: Self = Self::from_static("admin.dashboard");
    pub const APPLICANT_DASHBOARD: Self = Self::from_static("custom.dashboard");
    pub const AGENT_WORKSPACE: Self = Self::from_static("agent.users");

    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the login or registration screen.
    #[must_use]
    pub fn is_auth_entry(&self) -> bool {
        *self == Self::LOGIN || *self == Self::REGISTER
    }
}

impl std::fmt::Display for RouteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dashboard for a role. No role resolves to the login screen.
///
/// Shared by the guard and the session store's post-login redirect.
#[must_use]
pub fn dashboard_for(role: Option<Role>) -> RouteName {
    match role {
        Some(Role::Admin) => RouteName::ADMIN_DASHBOARD,
        Some(Role::Applicant) => RouteName::APPLICANT_DASHBOARD,
        Some(Role::Agent) => RouteName::AGENT_WORKSPACE,
        None => RouteName::LOGIN,
    }
}

// =============================================================================
// LOCATION
// =============================================================================

/// A concrete navigation target: a route name plus its path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: RouteName,
    pub params: BTreeMap<String, String>,
}

impl Location {
    #[must_use]
    pub fn named(name: RouteName) -> Self {
        Self { name, params: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl From<RouteName> for Location {
    fn from(name: RouteName) -> Self {
        Self::named(name)
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Access requirements of a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    /// Role-set restriction. `None` means any role may view the route.
    pub roles: Option<Vec<Role>>,
}

impl RouteMeta {
    #[must_use]
    pub fn public() -> Self {
        Self::default()
    }

    /// Authenticated section restricted to `roles`.
    #[must_use]
    pub fn restricted(roles: &[Role]) -> Self {
        Self { requires_auth: true, roles: Some(roles.to_vec()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, optional: bool },
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(':') {
            Some(param) => match param.strip_suffix('?') {
                Some(name) => Self::Param { name: name.to_owned(), optional: true },
                None => Self::Param { name: param.to_owned(), optional: false },
            },
            None => Self::Literal(raw.to_owned()),
        }
    }
}

/// A named destination with its path template and access metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub name: RouteName,
    pub path: String,
    pub meta: RouteMeta,
    segments: Vec<Segment>,
}

impl RouteRecord {
    #[must_use]
    pub fn new(name: RouteName, path: impl Into<String>, meta: RouteMeta) -> Self {
        let path = path.into();
        let segments = split_path(&path).map(Segment::parse).collect();
        Self { name, path, meta, segments }
    }

    fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| matches!(s, Segment::Literal(_))).count()
    }

    fn capture(&self, parts: &[&str]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut parts = parts.iter();
        for segment in &self.segments {
            match (segment, parts.next()) {
                (Segment::Literal(lit), Some(part)) if lit == part => {}
                (Segment::Param { name, .. }, Some(part)) => {
                    params.insert(name.clone(), (*part).to_owned());
                }
                (Segment::Param { optional: true, .. }, None) => {}
                _ => return None,
            }
        }
        parts.next().is_none().then_some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

// =============================================================================
// TABLE
// =============================================================================

/// Lookup table of every destination in the application.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
}

impl RouteTable {
    #[must_use]
    pub fn new(records: Vec<RouteRecord>) -> Self {
        Self { records }
    }

    /// The platform's full route map.
    #[must_use]
    pub fn platform() -> Self {
        let mut records = Vec::new();

        section(&mut records, "", &RouteMeta::public(), &[
            ("home", ""),
            ("about", "about"),
            ("contact", "contact"),
            ("delete-account", "delete-account"),
        ]);

        section(&mut records, "/auth", &RouteMeta::public(), &[
            ("auth.login", "login"),
            ("auth.register", "register"),
            ("auth.forgotpassword", "forgotpassword"),
            ("auth.reset-password", "reset-password"),
            ("auth.verify-email", "verify-email"),
        ]);

        section(&mut records, "/custom", &RouteMeta::restricted(&[Role::Applicant]), &[
            ("custom.dashboard", "dashboard"),
            ("custom.appointment", "appointment"),
            ("custom.delete-account", "delete-account"),
            ("custom.chat", "chat/:visaRequestId?"),
            ("custom.documents", "documents"),
            ("custom.payment", "payment"),
            ("custom.payment.success", "payment/success"),
            ("custom.payment.failed", "payment/failed"),
            ("custom.payment.receipt", "payment/receipt"),
            ("custom.payment.store", "payment/store/:visaRequestId?"),
            ("custom.profile", "profile"),
            ("custom.visarequest.get", "visarequest"),
            ("custom.visarequest.create", "visarequest/create"),
            ("custom.visarequest.create.view", "visarequest/create/view"),
            ("custom.visarequest.create.upload", "visarequest/create/upload/:visaRequestId"),
            ("custom.visarequest.show.get", "visarequest/show/:visaRequestId"),
            ("custom.visarequest.show.document", "visarequest/show/:visaRequestId/document"),
            ("custom.visarequest.show.receipt", "visarequest/show/receipt"),
            ("custom.upload", "upload"),
            ("custom.receipt", "receipt"),
            ("custom.showrequest", "showrequest"),
            ("custom.visa", "visa"),
        ]);

        section(&mut records, "/admin", &RouteMeta::restricted(&[Role::Admin]), &[
            ("admin.dashboard", "dashboard"),
            ("admin.users", "users"),
            ("admin.documents", "documents"),
            ("admin.payment", "payment"),
            ("admin.country", "country"),
            ("admin.visa", "visa"),
            ("admin.visa.add", "visa/add"),
            ("admin.visa.edit", "visa/add/:id"),
            ("admin.visa.show", "visa/show/:id"),
            ("admin.visarequest", "visarequest"),
            ("admin.visarequest.show", "visarequest/:userId/:visaRequestId"),
            ("admin.visatype", "visatype"),
            ("admin.faq", "faq"),
            ("admin.profile", "profile"),
        ]);

        section(&mut records, "/agent", &RouteMeta::restricted(&[Role::Agent]), &[
            ("agent.appointment", "appointment"),
            ("agent.profile", "profile"),
            ("agent.chat", "chat"),
            ("agent.chat.user.show.visarequest.show", "chat/:userId/:visaRequestId"),
            ("agent.users", "users"),
            ("agent.users.show.visarequest", "users/:userId/visarequest"),
            ("agent.users.show.visarequest.show", "users/:userId/visarequest/:visaRequestId"),
            ("agent.users.show.visarequest.show.document", "users/:userId/visarequest/:visaRequestId/document"),
        ]);

        Self { records }
    }

    #[must_use]
    pub fn get(&self, name: &RouteName) -> Option<&RouteRecord> {
        self.records.iter().find(|r| &r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteRecord> {
        self.records.iter()
    }

    /// Render the concrete path of `location`.
    ///
    /// # Errors
    ///
    /// Fails when the route is unknown or a required parameter is missing.
    pub fn href(&self, location: &Location) -> Result<String, NavigationError> {
        let record = self
            .get(&location.name)
            .ok_or_else(|| NavigationError::UnknownRoute(location.name.to_string()))?;

        let mut path = String::new();
        for segment in &record.segments {
            let part = match segment {
                Segment::Literal(lit) => lit.as_str(),
                Segment::Param { name, optional } => match location.params.get(name) {
                    Some(value) => value.as_str(),
                    None if *optional => continue,
                    None => {
                        return Err(NavigationError::MissingParam {
                            route: record.name.to_string(),
                            param: name.clone(),
                        });
                    }
                },
            };
            path.push('/');
            path.push_str(part);
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }

    /// Resolve a concrete path to a location.
    ///
    /// When several templates match, the one with more literal segments wins
    /// (`visarequest/show/receipt` over `visarequest/show/:visaRequestId`).
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::NoMatch`] when no template matches.
    pub fn match_path(&self, path: &str) -> Result<Location, NavigationError> {
        let clean = path.split(['?', '#']).next().unwrap_or_default();
        let parts: Vec<&str> = split_path(clean).collect();

        let mut best: Option<(usize, &RouteRecord, BTreeMap<String, String>)> = None;
        for record in &self.records {
            let Some(params) = record.capture(&parts) else {
                continue;
            };
            let score = record.literal_count();
            if best.as_ref().is_none_or(|(s, _, _)| score > *s) {
                best = Some((score, record, params));
            }
        }

        best.map(|(_, record, params)| Location { name: record.name.clone(), params })
            .ok_or_else(|| NavigationError::NoMatch(path.to_owned()))
    }
}

fn section(records: &mut Vec<RouteRecord>, prefix: &str, meta: &RouteMeta, routes: &[(&'static str, &str)]) {
    for &(name, path) in routes {
        let full = if path.is_empty() { format!("{prefix}/") } else { format!("{prefix}/{path}") };
        records.push(RouteRecord::new(RouteName::from_static(name), full, meta.clone()));
    }
}
