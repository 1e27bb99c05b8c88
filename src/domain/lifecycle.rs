//! Contract lifecycle
//!
//! Contracts move through a fixed approval lifecycle:
//!
//! ```text
//! CREATED  -> APPROVED | REVOKED
//! APPROVED -> SENT     | REVOKED
//! SENT     -> SIGNED   | REVOKED
//! SIGNED   -> LOCKED
//! LOCKED, REVOKED: terminal
//! ```
//!
//! The table is held as a petgraph `DiGraph` built once per process.
//! Every query is total: the lifecycle never fails, it only answers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

/// Status of a contract
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    #[default]
    Created,
    Approved,
    Sent,
    Signed,
    Locked,
    Revoked,
}

impl ContractStatus {
    /// Returns all statuses in lifecycle order
    pub fn all() -> &'static [ContractStatus] {
        &[
            ContractStatus::Created,
            ContractStatus::Approved,
            ContractStatus::Sent,
            ContractStatus::Signed,
            ContractStatus::Locked,
            ContractStatus::Revoked,
        ]
    }

    /// Returns the wire name (`CREATED`, `APPROVED`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Created => "CREATED",
            ContractStatus::Approved => "APPROVED",
            ContractStatus::Sent => "SENT",
            ContractStatus::Signed => "SIGNED",
            ContractStatus::Locked => "LOCKED",
            ContractStatus::Revoked => "REVOKED",
        }
    }

    /// Returns true if no transition leaves this status
    pub fn is_terminal(&self) -> bool {
        Lifecycle::global().is_terminal(*self)
    }

    /// Returns the statuses reachable in one step
    pub fn allowed_next(&self) -> Vec<ContractStatus> {
        Lifecycle::global().allowed_next_statuses(*self)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREATED" => Ok(ContractStatus::Created),
            "APPROVED" => Ok(ContractStatus::Approved),
            "SENT" => Ok(ContractStatus::Sent),
            "SIGNED" => Ok(ContractStatus::Signed),
            "LOCKED" => Ok(ContractStatus::Locked),
            // Older frontends spell it without the trailing D
            "REVOKED" | "REVOKE" => Ok(ContractStatus::Revoked),
            _ => Err(format!("Unknown contract status: {}", s)),
        }
    }
}

/// Directed edges of the lifecycle
const TRANSITIONS: &[(ContractStatus, ContractStatus)] = &[
    (ContractStatus::Created, ContractStatus::Approved),
    (ContractStatus::Created, ContractStatus::Revoked),
    (ContractStatus::Approved, ContractStatus::Sent),
    (ContractStatus::Approved, ContractStatus::Revoked),
    (ContractStatus::Sent, ContractStatus::Signed),
    (ContractStatus::Sent, ContractStatus::Revoked),
    (ContractStatus::Signed, ContractStatus::Locked),
];

/// The contract lifecycle as a transition graph
#[derive(Debug)]
pub struct Lifecycle {
    graph: DiGraph<ContractStatus, ()>,
    node_map: HashMap<ContractStatus, NodeIndex>,
}

impl Lifecycle {
    /// Builds the lifecycle graph from the transition table
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for status in ContractStatus::all() {
            let idx = graph.add_node(*status);
            node_map.insert(*status, idx);
        }

        for (from, to) in TRANSITIONS {
            graph.add_edge(node_map[from], node_map[to], ());
        }

        Self { graph, node_map }
    }

    /// Returns the process-wide lifecycle
    pub fn global() -> &'static Lifecycle {
        static LIFECYCLE: OnceLock<Lifecycle> = OnceLock::new();
        LIFECYCLE.get_or_init(Lifecycle::new)
    }

    /// Returns the statuses a contract in `status` may move to, in lifecycle order
    pub fn allowed_next_statuses(&self, status: ContractStatus) -> Vec<ContractStatus> {
        let Some(idx) = self.node_map.get(&status) else {
            return Vec::new();
        };

        let mut next: Vec<ContractStatus> = self
            .graph
            .neighbors(*idx)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        next.sort();
        next
    }

    /// Returns true if `from -> to` is an edge of the lifecycle
    pub fn is_valid_transition(&self, from: ContractStatus, to: ContractStatus) -> bool {
        match (self.node_map.get(&from), self.node_map.get(&to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    /// Returns true for LOCKED and REVOKED
    pub fn is_terminal(&self, status: ContractStatus) -> bool {
        matches!(status, ContractStatus::Locked | ContractStatus::Revoked)
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &DiGraph<ContractStatus, ()> {
        &self.graph
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::algo::is_cyclic_directed;
    use proptest::prelude::*;
    use ContractStatus::*;

    fn expected(from: ContractStatus) -> Vec<ContractStatus> {
        match from {
            Created => vec![Approved, Revoked],
            Approved => vec![Sent, Revoked],
            Sent => vec![Signed, Revoked],
            Signed => vec![Locked],
            Locked | Revoked => vec![],
        }
    }

    fn any_status() -> impl Strategy<Value = ContractStatus> {
        prop::sample::select(ContractStatus::all().to_vec())
    }

    #[test]
    fn allowed_next_matches_table() {
        let lifecycle = Lifecycle::new();
        for status in ContractStatus::all() {
            assert_eq!(lifecycle.allowed_next_statuses(*status), expected(*status));
        }
    }

    #[test]
    fn created_allows_approved_and_revoked() {
        assert_eq!(Created.allowed_next(), vec![Approved, Revoked]);
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        let lifecycle = Lifecycle::global();
        for status in ContractStatus::all() {
            let terminal = lifecycle.is_terminal(*status);
            assert_eq!(terminal, matches!(status, Locked | Revoked));
            assert_eq!(terminal, lifecycle.allowed_next_statuses(*status).is_empty());
        }
    }

    #[test]
    fn graph_is_acyclic() {
        assert!(!is_cyclic_directed(Lifecycle::global().graph()));
    }

    #[test]
    fn no_self_transitions() {
        for status in ContractStatus::all() {
            assert!(!Lifecycle::global().is_valid_transition(*status, *status));
        }
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("approved".parse::<ContractStatus>().unwrap(), Approved);
        assert_eq!("REVOKE".parse::<ContractStatus>().unwrap(), Revoked);
        assert!("archived".parse::<ContractStatus>().is_err());
        assert_eq!(Signed.to_string(), "SIGNED");
        assert_eq!(serde_json::to_string(&Locked).unwrap(), "\"LOCKED\"");
    }

    proptest! {
        #[test]
        fn valid_transition_iff_in_table(from in any_status(), to in any_status()) {
            let lifecycle = Lifecycle::global();
            prop_assert_eq!(
                lifecycle.is_valid_transition(from, to),
                expected(from).contains(&to)
            );
        }

        #[test]
        fn nothing_leaves_a_terminal_status(from in any_status(), to in any_status()) {
            let lifecycle = Lifecycle::global();
            if lifecycle.is_terminal(from) {
                prop_assert!(!lifecycle.is_valid_transition(from, to));
            }
        }

        #[test]
        fn every_walk_ends_in_a_terminal_status(choices in prop::collection::vec(0usize..2, 5..10)) {
            let lifecycle = Lifecycle::global();
            let mut status = Created;
            let mut steps = 0;
            for choice in choices {
                let next = lifecycle.allowed_next_statuses(status);
                if next.is_empty() {
                    break;
                }
                status = next[choice % next.len()];
                steps += 1;
            }
            // Longest path is CREATED -> APPROVED -> SENT -> SIGNED -> LOCKED
            prop_assert!(steps <= 4);
            prop_assert!(lifecycle.is_terminal(status));
        }
    }
}
