use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// How a category node was located in the code file JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// `root[category]`
    DirectKey,
    /// `root.MAP[category]`
    MapWrapped,
    /// `root["1".."100"]` entries carrying `KEY == category`, searched recursively
    /// through nested object or array `MAP`s
    NumberedWrapper,
}

/// Strategies in priority order
const STRATEGIES: [SearchStrategy; 3] = [
    SearchStrategy::DirectKey,
    SearchStrategy::MapWrapped,
    SearchStrategy::NumberedWrapper,
];

#[derive(Debug, Clone, Copy)]
pub struct CategoryMatch<'a> {
    pub node: &'a Value,
    /// Strategy that matched at the level where the node was found
    pub strategy: SearchStrategy,
    /// Numbered-wrapper nesting depth of the match (0 = root)
    pub depth: usize,
}

/// Locates category sub-objects in the structurally inconsistent JSON that
/// different vendor tool versions emit.
#[derive(Debug, Clone)]
pub struct CategorySearch {
    max_depth: usize,
    numbered_max: usize,
}

impl Default for CategorySearch {
    fn default() -> Self {
        Self::new(8, 100)
    }
}

impl CategorySearch {
    pub fn new(max_depth: usize, numbered_max: usize) -> Self {
        Self { max_depth, numbered_max }
    }

    pub fn find<'a>(&self, root: &'a Value, category: &str) -> Option<CategoryMatch<'a>> {
        self.find_at(root, category, 0)
    }

    fn find_at<'a>(&self, node: &'a Value, category: &str, depth: usize) -> Option<CategoryMatch<'a>> {
        if !node.is_object() {
            return None;
        }
        for strategy in STRATEGIES {
            let found = match strategy {
                SearchStrategy::DirectKey => direct_key(node, category).map(|n| CategoryMatch {
                    node: n,
                    strategy,
                    depth,
                }),
                SearchStrategy::MapWrapped => map_wrapped(node, category).map(|n| CategoryMatch {
                    node: n,
                    strategy,
                    depth,
                }),
                SearchStrategy::NumberedWrapper => self.numbered_wrapper(node, category, depth),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn numbered_wrapper<'a>(&self, node: &'a Value, category: &str, depth: usize) -> Option<CategoryMatch<'a>> {
        let wrappers: Vec<&Value> = (1..=self.numbered_max)
            .filter_map(|i| node.get(i.to_string()))
            .collect();
        self.search_entries(wrappers, category, depth)
    }

    /// Wrapper entries from numbered keys or an array `MAP`, searched the same way
    fn search_entries<'a>(&self, entries: Vec<&'a Value>, category: &str, depth: usize) -> Option<CategoryMatch<'a>> {
        let wrappers: Vec<&Value> = entries.into_iter().filter(|entry| is_category_node(entry)).collect();

        // An entry tagged with the category wins over anything nested deeper
        if let Some(entry) = wrappers.iter().find(|entry| key_matches(entry, category)) {
            return Some(CategoryMatch {
                node: entry,
                strategy: SearchStrategy::NumberedWrapper,
                depth,
            });
        }

        if depth + 1 >= self.max_depth {
            if !wrappers.is_empty() {
                debug!(category, depth, "numbered wrapper search stopped at depth cap");
            }
            return None;
        }

        wrappers.into_iter().find_map(|entry| {
            let found = match entry.get("MAP").unwrap_or(entry) {
                Value::Array(items) => self.search_entries(items.iter().collect(), category, depth + 1),
                nested => self.find_at(nested, category, depth + 1),
            };
            found.map(|found| CategoryMatch {
                strategy: SearchStrategy::NumberedWrapper,
                ..found
            })
        })
    }
}

fn direct_key<'a>(node: &'a Value, category: &str) -> Option<&'a Value> {
    node.get(category).filter(|candidate| {
        is_category_node(candidate) && key_string(candidate).map_or(true, |key| key == category)
    })
}

fn map_wrapped<'a>(node: &'a Value, category: &str) -> Option<&'a Value> {
    node.get("MAP").and_then(|map| direct_key(map, category))
}

fn key_matches(entry: &Value, category: &str) -> bool {
    key_string(entry).is_some_and(|key| key == category)
}

/// `KEY` as a trimmed string; vendor files carry it as a string or a number
pub(crate) fn key_string(entry: &Value) -> Option<String> {
    scalar_string(entry.get("KEY")?)
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Objects that could describe a category. A code leaf (`DATA` without `MAP`)
/// never does, even when its code happens to equal a category key.
fn is_category_node(value: &Value) -> bool {
    value.is_object() && !(value.get("DATA").is_some() && value.get("MAP").is_none())
}
