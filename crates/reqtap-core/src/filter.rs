//! Domain and method filtering over captured calls.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::CapturedCall;

/// The method toggles offered to the user.
pub const TOGGLE_METHODS: [&str; 5] = ["get", "post", "put", "delete", "options"];

/// Which of the five method toggles are checked. Methods outside the toggles
/// never pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSet {
    pub get: bool,
    pub post: bool,
    pub put: bool,
    pub delete: bool,
    pub options: bool,
}

impl Default for MethodSet {
    fn default() -> Self {
        Self::all()
    }
}

impl MethodSet {
    pub fn all() -> Self {
        Self {
            get: true,
            post: true,
            put: true,
            delete: true,
            options: true,
        }
    }

    pub fn none() -> Self {
        Self {
            get: false,
            post: false,
            put: false,
            delete: false,
            options: false,
        }
    }

    /// Set with exactly the named methods checked (case-insensitive).
    /// Returns the first name that is not one of the toggles as the error.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut set = Self::none();
        for name in names {
            let name = name.as_ref();
            if !set.set(name, true) {
                return Err(name.to_string());
            }
        }
        Ok(set)
    }

    /// Flips one toggle. Returns false if `method` is not a toggle.
    pub fn set(&mut self, method: &str, checked: bool) -> bool {
        let slot = match method.to_ascii_lowercase().as_str() {
            "get" => &mut self.get,
            "post" => &mut self.post,
            "put" => &mut self.put,
            "delete" => &mut self.delete,
            "options" => &mut self.options,
            _ => return false,
        };
        *slot = checked;
        true
    }

    pub fn contains(&self, method: &str) -> bool {
        match method.to_lowercase().as_str() {
            "get" => self.get,
            "post" => self.post,
            "put" => self.put,
            "delete" => self.delete,
            "options" => self.options,
            _ => false,
        }
    }
}

/// Domain substring plus method toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFilter {
    pub domain: String,
    pub methods: MethodSet,
}

impl CallFilter {
    pub fn new(domain: impl Into<String>, methods: MethodSet) -> Self {
        Self {
            domain: domain.into(),
            methods,
        }
    }

    /// True when the call's host contains the domain substring and its method
    /// is checked. A URL without a host (`data:`, `file:`) has an empty host,
    /// so only an empty domain matches it. Unparsable URLs never match.
    pub fn matches(&self, call: &CapturedCall) -> bool {
        let Ok(url) = Url::parse(&call.url) else {
            return false;
        };
        let host = url.host_str().unwrap_or("");
        host.to_lowercase().contains(&self.domain.to_lowercase()) && self.methods.contains(&call.method)
    }

    /// Matching calls, input order preserved.
    pub fn apply(&self, calls: &[CapturedCall]) -> Vec<CapturedCall> {
        calls.iter().filter(|c| self.matches(c)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: u64, url: &str, method: &str) -> CapturedCall {
        CapturedCall {
            id,
            url: url.to_string(),
            method: method.to_string(),
            timestamp: id as f64,
            request_body: None,
            headers: None,
            request_id: None,
        }
    }

    fn sample() -> Vec<CapturedCall> {
        vec![
            call(1, "https://api.example.com/v1/users", "GET"),
            call(2, "https://cdn.other.net/app.js", "GET"),
            call(3, "https://API.Example.com/v1/users", "POST"),
            call(4, "http://localhost:8080/health", "OPTIONS"),
            call(5, "https://api.example.com/v1/users/1", "DELETE"),
        ]
    }

    #[test]
    fn empty_domain_with_all_methods_returns_input_verbatim() {
        let calls = sample();
        assert_eq!(CallFilter::default().apply(&calls), calls);
    }

    #[test]
    fn domain_match_is_case_insensitive_substring_of_host() {
        let f = CallFilter::new("EXAMPLE", MethodSet::all());
        let ids: Vec<u64> = f.apply(&sample()).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        // Path text does not count toward the domain match.
        let f = CallFilter::new("health", MethodSet::all());
        assert!(f.apply(&sample()).is_empty());
    }

    #[test]
    fn method_toggles_restrict_results() {
        let f = CallFilter::new("", MethodSet::from_names(&["post", "Delete"]).unwrap());
        let ids: Vec<u64> = f.apply(&sample()).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn methods_outside_toggles_never_match() {
        let calls = vec![
            call(1, "https://a.example/", "PATCH"),
            call(2, "https://a.example/", "HEAD"),
        ];
        assert!(CallFilter::default().apply(&calls).is_empty());
    }

    #[test]
    fn malformed_urls_are_excluded() {
        let calls = vec![
            call(1, "not a url", "GET"),
            call(2, "https://ok.example/", "GET"),
        ];
        let ids: Vec<u64> = CallFilter::default().apply(&calls).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn hostless_urls_match_only_an_empty_domain() {
        let calls = vec![
            call(1, "data:text/plain,hi", "GET"),
            call(2, "file:///tmp/page.html", "GET"),
            call(3, "https://ok.example/", "GET"),
        ];
        let ids: Vec<u64> = CallFilter::default().apply(&calls).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let ids: Vec<u64> = CallFilter::new("ok", MethodSet::all())
            .apply(&calls)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn from_names_rejects_unknown_method() {
        assert_eq!(MethodSet::from_names(&["get", "patch"]), Err("patch".to_string()));
    }

    #[test]
    fn filtering_is_deterministic() {
        let f = CallFilter::new("example", MethodSet::from_names(&["get"]).unwrap());
        let calls = sample();
        assert_eq!(f.apply(&calls), f.apply(&calls));
    }
}
