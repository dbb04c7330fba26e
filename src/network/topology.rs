//! Connectivity analysis of the network graph
use super::Network;
use crate::id::BusID;
use indexmap::IndexMap;
use petgraph::Undirected;
use petgraph::algo::connected_components;
use petgraph::graph::{Graph, NodeIndex};

/// A graph with buses as nodes and lines and links as edges
type BusGraph = Graph<BusID, (), Undirected>;

/// Build the undirected bus graph of the network
fn build_bus_graph(network: &Network) -> BusGraph {
    let mut graph = BusGraph::new_undirected();
    let nodes: IndexMap<&BusID, NodeIndex> = network
        .buses
        .keys()
        .map(|id| (id, graph.add_node(id.clone())))
        .collect();

    let branches = network
        .lines
        .values()
        .map(|line| (&line.bus0, &line.bus1))
        .chain(network.links.values().map(|link| (&link.bus0, &link.bus1)));
    for (bus0, bus1) in branches {
        // Dangling branches are reported by validation, not here
        if let (Some(&a), Some(&b)) = (nodes.get(bus0), nodes.get(bus1)) {
            graph.add_edge(a, b, ());
        }
    }

    graph
}

/// Count the connected sub-networks (islands) of the network
pub fn count_sub_networks(network: &Network) -> usize {
    connected_components(&build_bus_graph(network))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use rstest::rstest;

    #[rstest]
    fn test_count_sub_networks_connected(network: Network) {
        assert_eq!(count_sub_networks(&network), 1);
    }

    #[rstest]
    fn test_count_sub_networks_islands(mut network: Network) {
        network.lines.clear();
        network.links.clear();
        assert_eq!(count_sub_networks(&network), network.buses.len());
    }
}
