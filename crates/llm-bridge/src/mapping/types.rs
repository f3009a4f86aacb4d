use super::transform::Transform;
use crate::provider::Provider;

/// One supported transformation path from `source_api` to `target_api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Wire format of the inbound request.
    pub source_api: Provider,
    /// Wire format the request is converted into.
    pub target_api: Provider,
    /// Inbound path prefix that selects this mapping.
    pub proxy_path_prefix: String,
    /// Name of the env var holding the outbound base URL.
    pub target_base_url_env_var: String,
    /// Name of the env var holding the outbound credential, if any.
    pub target_api_key_env_var: Option<String>,
    pub request_transform: Transform,
    pub response_transform: Transform,
}

impl Mapping {
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.proxy_path_prefix.as_str())
    }
}

/// Validated, ordered mapping entries. Never mutated after load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    mappings: Vec<Mapping>,
}

impl MappingTable {
    pub(crate) fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.mappings.iter()
    }

    /// First entry, in file order, whose prefix matches `path`.
    pub fn route(&self, path: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.matches(path))
    }

    /// Pairs `(shadowed, by)` where entry `shadowed` can never be selected by
    /// [`route`](Self::route) because the earlier entry `by` matches first.
    pub fn shadowed_entries(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (i, later) in self.mappings.iter().enumerate() {
            if let Some(j) = self.mappings[..i]
                .iter()
                .position(|earlier| later.proxy_path_prefix.starts_with(&earlier.proxy_path_prefix))
            {
                out.push((i, j));
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.mappings.iter()
    }
}
