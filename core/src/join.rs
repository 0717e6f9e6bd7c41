//! Join requirements as a tree rooted at the queried table.
//!
//! Callers add [`JoinSpec`] trees in any order; the graph keeps one node per
//! table key and [`JoinGraph::flatten`] emits parents before children in
//! first-insertion order.

use compact_str::CompactString;
use hashbrown::HashMap;

/// A requested join: `table` reached from its parent (or from the root table).
///
/// The table key may carry an alternate association after a dot
/// (`"images.thumb_image"`); see [`JoinSpec::base_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub table: CompactString,
    pub outer: bool,
    pub children: Vec<JoinSpec>,
}

impl JoinSpec {
    #[inline]
    pub fn inner(table: impl Into<CompactString>) -> Self {
        Self {
            table: table.into(),
            outer: false,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn outer(table: impl Into<CompactString>) -> Self {
        Self {
            table: table.into(),
            outer: true,
            children: Vec::new(),
        }
    }

    /// Parses `"table"` or `"table!"`; the trailing bang marks a left outer join.
    pub fn parse(name: &str) -> Self {
        match name.strip_suffix('!') {
            Some(table) => Self::outer(table),
            None => Self::inner(name),
        }
    }

    /// Builds a linear path `a -> b -> c` from parsed names.
    pub fn chain<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let specs: Vec<JoinSpec> = names.into_iter().map(Self::parse).collect();
        specs.into_iter().rev().fold(None, |child, mut spec| {
            if let Some(child) = child {
                spec.children.push(child);
            }
            Some(spec)
        })
    }

    pub fn with_child(mut self, child: JoinSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Table name without the alternate-association suffix.
    pub fn base_table(&self) -> &str {
        base_table(&self.table)
    }
}

/// Table name without the alternate-association suffix.
pub fn base_table(key: &str) -> &str {
    key.split_once('.').map_or(key, |(table, _)| table)
}

/// One step of a flattened join order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    /// Table key this join hangs off; `None` for the root table.
    pub parent: Option<CompactString>,
    pub table: CompactString,
    pub outer: bool,
}

#[derive(Debug, Clone)]
struct Node {
    table: CompactString,
    outer: bool,
    children: Vec<usize>,
}

/// Deduplicated join tree.
#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    index: HashMap<CompactString, usize>,
}

impl JoinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, table: &str) -> bool {
        self.index.contains_key(table)
    }

    /// Adds a join tree hanging off the root table.
    pub fn add(&mut self, spec: JoinSpec) {
        self.add_under(None, spec);
    }

    /// Adds a linear path of parsed names, e.g. `["observations", "locations!"]`.
    pub fn add_path<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        if let Some(spec) = JoinSpec::chain(names) {
            self.add(spec);
        }
    }

    /// Merges every join of `other` into this graph.
    pub fn merge(&mut self, other: &JoinGraph) {
        for step in other.flatten() {
            self.add_step(step);
        }
    }

    fn add_under(&mut self, parent: Option<usize>, spec: JoinSpec) {
        let JoinSpec {
            table,
            outer,
            children,
        } = spec;
        let id = match self.index.get(&table) {
            Some(&id) => {
                // outer wins
                self.nodes[id].outer |= outer;
                id
            }
            None => {
                let id = self.nodes.len();
                self.nodes.push(Node {
                    table: table.clone(),
                    outer,
                    children: Vec::new(),
                });
                self.index.insert(table, id);
                match parent {
                    Some(p) => self.nodes[p].children.push(id),
                    None => self.roots.push(id),
                }
                id
            }
        };
        for child in children {
            self.add_under(Some(id), child);
        }
    }

    fn add_step(&mut self, step: JoinStep) {
        let parent = step
            .parent
            .as_deref()
            .and_then(|p| self.index.get(p).copied());
        self.add_under(
            parent,
            JoinSpec {
                table: step.table,
                outer: step.outer,
                children: Vec::new(),
            },
        );
    }

    /// Preorder walk: each join follows its parent, siblings keep insertion order.
    ///
    /// Descendants of an outer join are emitted as outer joins too, so a
    /// missing optional row never filters out the root row.
    pub fn flatten(&self) -> Vec<JoinStep> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.walk(root, None, false, &mut out);
        }
        out
    }

    fn walk(&self, id: usize, parent: Option<&CompactString>, outer_above: bool, out: &mut Vec<JoinStep>) {
        let node = &self.nodes[id];
        let outer = node.outer || outer_above;
        out.push(JoinStep {
            parent: parent.cloned(),
            table: node.table.clone(),
            outer,
        });
        for &child in &node.children {
            self.walk(child, Some(&node.table), outer, out);
        }
    }

    /// Rebuilds a graph from a flattened order.
    pub fn from_steps(steps: impl IntoIterator<Item = JoinStep>) -> Self {
        let mut graph = Self::new();
        for step in steps {
            graph.add_step(step);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(graph: &JoinGraph) -> Vec<(String, bool)> {
        graph
            .flatten()
            .into_iter()
            .map(|s| (s.table.to_string(), s.outer))
            .collect()
    }

    #[test]
    fn test_duplicate_add_is_idempotent() {
        let mut graph = JoinGraph::new();
        graph.add(JoinSpec::inner("names"));
        graph.add(JoinSpec::inner("names"));
        assert_eq!(tables(&graph), vec![("names".into(), false)]);
    }

    #[test]
    fn test_outer_wins_either_order() {
        let mut a = JoinGraph::new();
        a.add(JoinSpec::inner("locations"));
        a.add(JoinSpec::outer("locations"));

        let mut b = JoinGraph::new();
        b.add(JoinSpec::outer("locations"));
        b.add(JoinSpec::inner("locations"));

        assert_eq!(tables(&a), vec![("locations".into(), true)]);
        assert_eq!(tables(&b), vec![("locations".into(), true)]);
    }

    #[test]
    fn test_children_follow_parents() {
        let mut graph = JoinGraph::new();
        graph.add_path(["observation_images", "observations", "names"]);
        graph.add_path(["observations", "locations!"]);
        let steps = graph.flatten();
        let order: Vec<&str> = steps.iter().map(|s| s.table.as_str()).collect();
        assert_eq!(order, ["observation_images", "observations", "names", "locations"]);
        assert_eq!(steps[2].parent.as_deref(), Some("observations"));
        assert_eq!(steps[3].parent.as_deref(), Some("observations"));
        assert!(steps[3].outer);
        assert!(steps[0].parent.is_none());
    }

    #[test]
    fn test_outer_propagates_to_descendants() {
        let mut graph = JoinGraph::new();
        graph.add_path(["locations!", "users"]);
        assert_eq!(
            tables(&graph),
            vec![("locations".into(), true), ("users".into(), true)]
        );
    }

    #[test]
    fn test_flatten_rebuild_is_stable() {
        let mut graph = JoinGraph::new();
        graph.add(
            JoinSpec::inner("observations")
                .with_child(JoinSpec::inner("names"))
                .with_child(JoinSpec::outer("locations")),
        );
        graph.add(JoinSpec::inner("rss_logs"));
        graph.add_path(["observations", "species_list_observations"]);

        let once = graph.flatten();
        let rebuilt = JoinGraph::from_steps(once.clone());
        assert_eq!(rebuilt.flatten(), once);
    }

    #[test]
    fn test_base_table_strips_alias() {
        assert_eq!(JoinSpec::inner("images.thumb_image").base_table(), "images");
        assert_eq!(base_table("names"), "names");
    }
}
