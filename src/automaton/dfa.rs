//! Deterministic finite automaton for a single task.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, NodeFiltered};

use super::error::AutomatonError;

/// A task automaton with an explicit transition table.
///
/// States are dense indices `0..n_states`. A label with no entry in the
/// table leaves the state unchanged. Accepting states mark task success and
/// rejecting states mark task failure; both are absorbing for the purpose of
/// task tracking.
///
/// The transitions are mirrored into a [`DiGraph`] so that reachability of
/// acceptance can be answered for any state.
#[derive(Debug, Clone)]
pub struct Dfa {
    name: String,
    n_states: usize,
    initial: usize,
    transitions: HashMap<(usize, String), usize>,
    accepting: BTreeSet<usize>,
    rejecting: BTreeSet<usize>,
    graph: DiGraph<usize, String>,
}

impl Dfa {
    /// Creates an automaton with `n_states` states and no transitions.
    pub fn new(name: impl Into<String>, n_states: usize, initial: usize) -> Result<Self, AutomatonError> {
        if initial >= n_states {
            return Err(AutomatonError::UnknownState {
                state: initial,
                n_states,
            });
        }
        let mut dfa = Self::blank(name.into(), n_states);
        dfa.initial = initial;
        Ok(dfa)
    }

    /// Task satisfied once `label` has been observed.
    pub fn eventually(label: &str) -> Self {
        Self::sequence(&[label])
    }

    /// Task satisfied once every label has been observed, in order.
    pub fn sequence(labels: &[&str]) -> Self {
        let name = labels.join("->");
        let n_states = labels.len() + 1;
        let mut dfa = Self::blank(name, n_states);
        for (i, label) in labels.iter().enumerate() {
            dfa.insert(i, label, i + 1);
        }
        dfa.accepting.insert(labels.len());
        dfa
    }

    /// Task satisfied when `goal` is observed before `hazard`; observing
    /// `hazard` first fails it.
    pub fn avoid_until(hazard: &str, goal: &str) -> Self {
        let mut dfa = Self::blank(format!("!{hazard} U {goal}"), 3);
        dfa.insert(0, goal, 1);
        dfa.insert(0, hazard, 2);
        dfa.accepting.insert(1);
        dfa.rejecting.insert(2);
        dfa
    }

    fn blank(name: String, n_states: usize) -> Self {
        let mut graph = DiGraph::with_capacity(n_states, n_states);
        for s in 0..n_states {
            graph.add_node(s);
        }
        Self {
            name,
            n_states,
            initial: 0,
            transitions: HashMap::new(),
            accepting: BTreeSet::new(),
            rejecting: BTreeSet::new(),
            graph,
        }
    }

    fn insert(&mut self, from: usize, label: &str, to: usize) {
        self.transitions.insert((from, label.to_string()), to);
        self.graph
            .add_edge(NodeIndex::new(from), NodeIndex::new(to), label.to_string());
    }

    fn check_state(&self, state: usize) -> Result<(), AutomatonError> {
        if state >= self.n_states {
            return Err(AutomatonError::UnknownState {
                state,
                n_states: self.n_states,
            });
        }
        Ok(())
    }

    /// Adds the transition `from --label--> to`.
    pub fn add_transition(&mut self, from: usize, label: &str, to: usize) -> Result<(), AutomatonError> {
        self.check_state(from)?;
        self.check_state(to)?;
        if self.transitions.contains_key(&(from, label.to_string())) {
            return Err(AutomatonError::ConflictingTransition {
                state: from,
                label: label.to_string(),
            });
        }
        self.insert(from, label, to);
        Ok(())
    }

    /// Marks `state` as accepting.
    pub fn add_accepting(&mut self, state: usize) -> Result<(), AutomatonError> {
        self.check_state(state)?;
        if self.rejecting.contains(&state) {
            return Err(AutomatonError::OverlappingTerminal(state));
        }
        self.accepting.insert(state);
        Ok(())
    }

    /// Marks `state` as rejecting.
    pub fn add_rejecting(&mut self, state: usize) -> Result<(), AutomatonError> {
        self.check_state(state)?;
        if self.accepting.contains(&state) {
            return Err(AutomatonError::OverlappingTerminal(state));
        }
        self.rejecting.insert(state);
        Ok(())
    }

    /// Human-readable task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of states.
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// State the automaton starts in after a reset.
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Whether reaching `state` satisfies the task.
    pub fn is_accepting(&self, state: usize) -> bool {
        self.accepting.contains(&state)
    }

    /// Whether reaching `state` fails the task.
    pub fn is_rejecting(&self, state: usize) -> bool {
        self.rejecting.contains(&state)
    }

    /// Follows the labels in order, stopping at the first terminal state.
    pub fn next(&self, state: usize, labels: &[String]) -> usize {
        let mut current = state;
        for label in labels {
            if self.is_accepting(current) || self.is_rejecting(current) {
                break;
            }
            if let Some(&to) = self.transitions.get(&(current, label.clone())) {
                current = to;
            }
        }
        current
    }

    /// Whether some accepting state is reachable from `state` without
    /// passing through a rejecting state.
    pub fn can_accept(&self, state: usize) -> bool {
        if state >= self.n_states {
            return false;
        }
        if self.is_rejecting(state) {
            return false;
        }
        let rejecting = &self.rejecting;
        let graph = &self.graph;
        let live = NodeFiltered::from_fn(graph, |n: NodeIndex| !rejecting.contains(&graph[n]));
        let mut dfs = Dfs::new(&live, NodeIndex::new(state));
        while let Some(node) = dfs.next(&live) {
            if self.is_accepting(graph[node]) {
                return true;
            }
        }
        false
    }
}
