//! Page reference datatype.
//!
//! User syntax is a site link such as `Help:Editing`: an optional namespace
//! prefix followed by a title. The normalized key-vector is
//! `[title, namespace_index]`; keeping the namespace as its own scalar makes
//! storage-side filtering by namespace cheap. A persisted vector with only
//! the title is accepted; the namespace then defaults to main.

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

use crate::{
    datatype::{Datatype, ParseCx},
    export::ExportData,
    properties::Scalar,
};

/// Recognized namespace prefixes and their indices. Index 0 is the main
/// namespace (no prefix).
static NAMESPACES: Lazy<Vec<(&'static str, i64)>> = Lazy::new(|| {
    vec![
        ("Help", 12),
        ("Category", 14),
        ("Property", 102),
        ("Type", 104),
        ("Concept", 108),
    ]
});

fn namespace_index(prefix: &str) -> Option<i64> {
    NAMESPACES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(prefix))
        .map(|(_, index)| *index)
}

fn namespace_prefix(index: i64) -> Option<&'static str> {
    NAMESPACES
        .iter()
        .find(|(_, ns)| *ns == index)
        .map(|(name, _)| *name)
}

/// Canonical title form: underscores become spaces, whitespace runs
/// collapse, the text is NFC-normalized and the first letter uppercased.
fn normalize_title(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let normalized: String = collapsed.nfc().collect();
    let mut chars = normalized.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => normalized,
    }
}

/// A reference to a site page, split into namespace and normalized title.
#[derive(Debug, Default, Clone)]
pub struct PageValue {
    title: Option<String>,
    namespace: i64,
}

impl PageValue {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn namespace(&self) -> i64 {
        self.namespace
    }

    /// The prefixed form, e.g. `Help:Editing`, or the bare title for the
    /// main namespace.
    fn prefixed_title(&self) -> Option<String> {
        let title = self.title.as_ref()?;
        match namespace_prefix(self.namespace) {
            Some(prefix) => Some(format!("{prefix}:{title}")),
            None => Some(title.clone()),
        }
    }
}

impl Datatype for PageValue {
    fn parse_user_value(&mut self, raw: &str, cx: &mut ParseCx<'_>) {
        // A leading colon forces the main namespace, mirroring site link
        // syntax for category/file escapes.
        let trimmed = raw.trim().trim_start_matches(':');
        let (namespace, title_part) = match trimmed.split_once(':') {
            Some((prefix, rest)) => match namespace_index(prefix.trim()) {
                Some(index) => (index, rest),
                // Unknown prefix: the colon is part of the title.
                None => (0, trimmed),
            },
            None => (0, trimmed),
        };
        let title = normalize_title(title_part);
        if title.is_empty() {
            cx.error("value-empty", &[]);
            return;
        }
        cx.propose_caption(raw.trim());
        self.title = Some(title);
        self.namespace = namespace;
    }

    fn parse_db_keys(&mut self, keys: &[Scalar], cx: &mut ParseCx<'_>) {
        let Some(first) = keys.first() else {
            cx.error("value-malformed-keys", &[]);
            return;
        };
        let title = normalize_title(&first.render());
        if title.is_empty() {
            cx.error("value-malformed-keys", &[]);
            return;
        }
        // Shorter-than-produced vectors are legal: namespace defaults to
        // main, unparseable namespace scalars degrade the same way.
        let namespace = keys
            .get(1)
            .and_then(Scalar::as_number)
            .map(|n| n as i64)
            .unwrap_or(0);
        self.title = Some(title);
        self.namespace = namespace;
    }

    fn db_keys(&self) -> Vec<Scalar> {
        vec![
            Scalar::Text(self.title.clone().unwrap_or_default()),
            Scalar::Int(self.namespace),
        ]
    }

    fn wiki_value(&self) -> Option<String> {
        self.prefixed_title()
    }

    fn long_label(&self, _output_format: Option<&str>) -> String {
        match (self.title.as_ref(), namespace_prefix(self.namespace)) {
            (Some(title), Some(prefix)) => format!("{title} ({prefix})"),
            (Some(title), None) => title.clone(),
            (None, _) => String::new(),
        }
    }

    fn service_link_params(&self) -> Option<Vec<String>> {
        let title = self.title.as_ref()?;
        Some(vec![
            title.replace(' ', "_"),
            format!("{}", self.namespace),
        ])
    }

    fn export_data(&self) -> Option<ExportData> {
        // Pages export as resource references, never as literals.
        let prefixed = self.prefixed_title()?;
        let title = self.title.clone()?;
        Some(ExportData::resource(prefixed.replace(' ', "_"), title))
    }
}
