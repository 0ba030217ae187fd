//! In-memory vocabulary hierarchy.
//!
//! A `VocabularyTree` is built once from a term snapshot and answers
//! descendant queries and browse views without further storage round
//! trips. Every traversal carries a visited set, so malformed data with a
//! parent cycle still terminates.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use tessera_core::{VocabularyNode, VocabularyTerm};

/// Arena of vocabulary terms keyed by id with parent → children edges.
#[derive(Debug, Clone, Default)]
pub struct VocabularyTree {
    terms: HashMap<Uuid, VocabularyTerm>,
    children: HashMap<Uuid, Vec<Uuid>>,
    /// All ids in canonical (term text, id) order.
    order: Vec<Uuid>,
}

impl VocabularyTree {
    pub fn from_terms(mut terms: Vec<VocabularyTerm>) -> Self {
        terms.sort_by(|a, b| a.term.cmp(&b.term).then(a.id.cmp(&b.id)));

        let order: Vec<Uuid> = terms.iter().map(|t| t.id).collect();
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for term in &terms {
            if let Some(parent) = term.parent_id {
                children.entry(parent).or_default().push(term.id);
            }
        }

        Self {
            terms: terms.into_iter().map(|t| (t.id, t)).collect(),
            children,
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&VocabularyTerm> {
        self.terms.get(id)
    }

    /// Look up a term by its text, case-insensitively. Ties resolve to the
    /// first term in canonical order.
    pub fn find_by_name(&self, name: &str) -> Option<&VocabularyTerm> {
        let needle = name.trim().to_lowercase();
        self.order
            .iter()
            .filter_map(|id| self.terms.get(id))
            .find(|t| t.term.to_lowercase() == needle)
    }

    /// Direct children of `id`, in canonical order.
    pub fn children_of(&self, id: &Uuid) -> &[Uuid] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Breadth-first expansion of `roots` to every transitive descendant.
    ///
    /// The result always contains the roots themselves, including ids that
    /// are not in the tree.
    pub fn expand(&self, roots: &[Uuid]) -> HashSet<Uuid> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut queue: VecDeque<Uuid> = VecDeque::new();

        for root in roots {
            if visited.insert(*root) {
                queue.push_back(*root);
            }
        }

        while let Some(id) = queue.pop_front() {
            for child in self.children_of(&id) {
                if visited.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }

        visited
    }

    /// Nested browse view of the whole vocabulary.
    ///
    /// Roots are terms without a parent or whose parent is missing from the
    /// snapshot. Terms only reachable through a cycle are promoted to roots,
    /// so every term appears exactly once.
    pub fn forest(&self) -> Vec<VocabularyNode> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut forest = Vec::new();

        let roots = self.order.iter().filter(|id| {
            self.terms
                .get(id)
                .and_then(|t| t.parent_id)
                .map_or(true, |parent| !self.terms.contains_key(&parent))
        });
        for id in roots {
            if let Some(node) = self.build_node(*id, &mut visited) {
                forest.push(node);
            }
        }

        for id in &self.order {
            if !visited.contains(id) {
                if let Some(node) = self.build_node(*id, &mut visited) {
                    forest.push(node);
                }
            }
        }

        forest
    }

    fn build_node(&self, id: Uuid, visited: &mut HashSet<Uuid>) -> Option<VocabularyNode> {
        if !visited.insert(id) {
            return None;
        }
        let term = self.terms.get(&id)?;

        let children = self
            .children_of(&id)
            .iter()
            .filter_map(|child| self.build_node(*child, visited))
            .collect();

        Some(VocabularyNode {
            id,
            term: term.term.clone(),
            synonyms: term.synonyms.clone(),
            description: term.description.clone(),
            children,
        })
    }
}
