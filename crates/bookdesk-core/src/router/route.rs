use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub pattern: &'static str,
    pub requires_auth: bool,
    segments: Vec<Segment>,
}

impl Route {
    pub fn new(name: &'static str, pattern: &'static str) -> Self {
        let segments = split_path(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(param) => Segment::Param(param.to_string()),
                None => Segment::Static(s.to_string()),
            })
            .collect();
        Self {
            name,
            pattern,
            requires_auth: false,
            segments,
        }
    }

    pub fn protected(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Match a path against this route, capturing `:param` segments
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

/// A resolved navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: Route,
    /// Normalized path (no query, fragment or trailing slash)
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    pub fn requires_auth(&self) -> bool {
        self.route.requires_auth
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Drop query string and fragment, then split into non-empty segments
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    path[..end].split('/').filter(|s| !s.is_empty())
}

/// Canonical form of a path: leading slash, no trailing slash
pub fn normalize_path(path: &str) -> String {
    let joined: Vec<&str> = split_path(path).collect();
    format!("/{}", joined.join("/"))
}

/// The portal's route table
pub fn default_routes() -> Vec<Route> {
    vec![
        Route::new("home", "/"),
        Route::new("login", "/login"),
        Route::new("success", "/success/:pnr"),
        Route::new("admin", "/admin").protected(),
        Route::new("book", "/book/:id").protected(),
    ]
}
