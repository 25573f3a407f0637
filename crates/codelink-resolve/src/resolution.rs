//! Name-based lookup for call and import targets.
//!
//! Resolution never looks at import edges: a call rendered as `a.helper`
//! only matches a function whose qualified name is literally `a.helper`.

use codelink_core::graph::function_id;
use std::collections::{BTreeSet, HashMap, HashSet};

/// How a call site's callee name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget<'a> {
    /// Defined in the calling file.
    Local(String),
    /// Exactly one function with that qualified name in the project.
    Unique(&'a str),
    /// Several functions share the name; ids in sorted order.
    Ambiguous(Vec<&'a str>),
    /// Nothing in the project matches (builtin, external, dynamic).
    Unresolved,
}

/// Every discovered function id, plus an index from qualified name to the
/// ids declaring it.
#[derive(Debug, Default)]
pub struct FunctionIndex {
    ids: HashSet<String>,
    by_name: HashMap<String, BTreeSet<String>>,
}

impl FunctionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_path: &str, full_name: &str) {
        let id = function_id(file_path, full_name);
        self.by_name
            .entry(full_name.to_string())
            .or_default()
            .insert(id.clone());
        self.ids.insert(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve `callee_name` as called from `file_path`: a function of that
    /// name in the same file wins, otherwise every function of that name in
    /// the project is a candidate.
    pub fn resolve_call(&self, file_path: &str, callee_name: &str) -> CallTarget<'_> {
        let local = function_id(file_path, callee_name);
        if self.ids.contains(&local) {
            return CallTarget::Local(local);
        }
        match self.by_name.get(callee_name) {
            None => CallTarget::Unresolved,
            Some(ids) if ids.len() == 1 => match ids.iter().next() {
                Some(id) => CallTarget::Unique(id),
                None => CallTarget::Unresolved,
            },
            Some(ids) => CallTarget::Ambiguous(ids.iter().map(String::as_str).collect()),
        }
    }
}

/// Path suffix an import of `module` is expected to live at:
/// `pkg.util` -> `pkg/util.py`.
pub fn module_suffix(module: &str, extension: &str) -> String {
    format!("{}.{}", module.replace('.', "/"), extension)
}

/// True when `file_id` ends with `suffix`. The match is textual, so
/// `data.py` satisfies `a.py` just as `x/a.py` does.
pub fn path_matches_suffix(file_id: &str, suffix: &str) -> bool {
    file_id.ends_with(suffix)
}

/// First file (in the given order) an import of `module` resolves to.
pub fn resolve_import<'a, I>(files: I, module: &str, extension: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if module.is_empty() {
        return None;
    }
    let suffix = module_suffix(module, extension);
    files
        .into_iter()
        .find(|id| path_matches_suffix(id, &suffix))
}
