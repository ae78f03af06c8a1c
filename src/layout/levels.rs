use std::collections::{HashMap, VecDeque};

use crate::ir::Graph;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelAssignment {
    /// Node ids per level in dequeue order.
    pub levels: Vec<Vec<String>>,
    pub level_of: HashMap<String, usize>,
    /// Ids that no root reaches, placed by the fallback pass.
    pub fallback: Vec<String>,
}

/// Breadth-first leveling from every node without incoming edges.
///
/// Roots enter the queue in node order and targets in edge order, so the first
/// level that reaches a node wins. Nodes left unleveled (cycles, or components
/// without a root) are handled by seeding the first such node, in node order,
/// one level below the deepest level placed so far and running the same
/// traversal from it; this repeats until every node has a level.
pub(super) fn assign_levels(graph: &Graph) -> LevelAssignment {
    let mut incoming: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), 0))
        .collect();
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        if !incoming.contains_key(edge.from.as_str()) {
            continue;
        }
        let Some(count) = incoming.get_mut(edge.to.as_str()) else {
            continue;
        };
        *count += 1;
        outgoing
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    let mut assignment = LevelAssignment::default();
    let roots: Vec<&str> = graph
        .nodes
        .iter()
        .map(|node| node.id.as_str())
        .filter(|id| incoming.get(id).copied() == Some(0))
        .collect();
    traverse(&roots, 0, &outgoing, &mut assignment);

    while assignment.level_of.len() < graph.nodes.len() {
        let Some(seed) = graph
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .find(|id| !assignment.level_of.contains_key(*id))
        else {
            break;
        };
        let level = assignment.levels.len();
        let before = assignment.level_of.len();
        traverse(&[seed], level, &outgoing, &mut assignment);
        // Levels from `level` on were all created by this pass.
        let placed: Vec<String> = assignment.levels[level..].iter().flatten().cloned().collect();
        tracing::warn!(
            seed,
            level,
            placed = assignment.level_of.len() - before,
            "node unreachable from every root; using fallback level"
        );
        assignment.fallback.extend(placed);
    }

    assignment
}

fn traverse(
    seeds: &[&str],
    level: usize,
    outgoing: &HashMap<&str, Vec<&str>>,
    assignment: &mut LevelAssignment,
) {
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    for seed in seeds {
        if assignment.level_of.contains_key(*seed) {
            continue;
        }
        assignment.level_of.insert(seed.to_string(), level);
        queue.push_back((seed.to_string(), level));
    }

    while let Some((id, level)) = queue.pop_front() {
        if assignment.levels.len() <= level {
            assignment.levels.resize_with(level + 1, Vec::new);
        }
        assignment.levels[level].push(id.clone());
        let Some(targets) = outgoing.get(id.as_str()) else {
            continue;
        };
        for target in targets {
            if assignment.level_of.contains_key(*target) {
                continue;
            }
            assignment.level_of.insert(target.to_string(), level + 1);
            queue.push_back((target.to_string(), level + 1));
        }
    }
}
