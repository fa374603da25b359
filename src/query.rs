use crate::models::{FilterSelection, SortKey};

/// Upper bound on how many stations one search asks the directory for.
pub const RESULT_LIMIT: u32 = 100;

/// Parameters of one directory search. Absent fields are unconstrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub country: Option<String>,
    pub language: Option<String>,
    pub tag: Option<String>,
    pub name: Option<String>,
    pub order: SortKey,
    pub reverse: bool,
    pub limit: u32,
}

pub fn build_query(selection: &FilterSelection) -> SearchQuery {
    let term = selection.term.trim();
    SearchQuery {
        country: selection.country.clone(),
        language: selection.language.clone(),
        tag: selection.tag.clone(),
        name: (!term.is_empty()).then(|| term.to_string()),
        order: selection.sort,
        reverse: true,
        limit: RESULT_LIMIT,
    }
}

impl SearchQuery {
    /// Query-string pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        if let Some(c) = &self.country {
            pairs.push(("country", c.clone()));
        }
        if let Some(l) = &self.language {
            pairs.push(("language", l.clone()));
        }
        if let Some(t) = &self.tag {
            pairs.push(("tag", t.clone()));
        }
        if let Some(n) = &self.name {
            pairs.push(("name", n.clone()));
        }
        pairs.push(("order", self.order.as_param().to_string()));
        pairs.push(("reverse", self.reverse.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}
