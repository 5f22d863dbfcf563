// Category registry and color assignment handed to the renderer

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::coerce::as_category;
use crate::data::Dataset;

/// Category10 scheme.
pub const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    colors: Vec<String>,
}

impl ColorPalette {
    pub fn category10() -> Self {
        Self::new(CATEGORY10.iter().map(|c| c.to_string()).collect())
    }

    /// An empty palette falls back to a single neutral gray.
    pub fn new(colors: Vec<String>) -> Self {
        if colors.is_empty() {
            return Self {
                colors: vec!["#7f7f7f".to_string()],
            };
        }
        Self { colors }
    }

    /// Color for the `index`-th category, cycling when categories outnumber
    /// colors.
    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Ordered set of categories; position is assigned on first registration and
/// never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRegistry {
    categories: IndexSet<String>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category, returning its position. Re-registering returns the
    /// original position.
    pub fn register(&mut self, category: &str) -> usize {
        if let Some(idx) = self.categories.get_index_of(category) {
            return idx;
        }
        self.categories.insert_full(category.to_string()).0
    }

    /// Categories of `field` in the order they first appear in the dataset.
    pub fn from_dataset(dataset: &Dataset, field: &str) -> Self {
        let mut registry = Self::new();
        for record in dataset {
            registry.register(&as_category(record, field));
        }
        registry
    }

    pub fn extend<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for c in categories {
            self.register(c.as_ref());
        }
    }

    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.categories.get_index_of(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Category to color mapping, fixed at construction. The renderer receives
/// this instead of consulting shared color state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColorAssignment {
    colors: IndexMap<String, String>,
}

impl ColorAssignment {
    pub fn new(registry: &CategoryRegistry, palette: &ColorPalette) -> Self {
        let colors = registry
            .categories()
            .enumerate()
            .map(|(i, c)| (c.to_string(), palette.color(i).to_string()))
            .collect();
        Self { colors }
    }

    pub fn color_of(&self, category: &str) -> Option<&str> {
        self.colors.get(category).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
