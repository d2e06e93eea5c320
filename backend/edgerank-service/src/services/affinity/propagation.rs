// ============================================
// Friend-of-friend affinity propagation
// ============================================
//
// A friend's strong connections lend the viewer a weak affinity, and a
// friend-of-friend's connections lend an even weaker one:
//
//   n ─friend→ f ──w→ m          adds w / 1_000  to n → m
//   n ─friend→ f ─friend→ g ──w→ m2   adds w / 10_000 to n → m2
//
// Only friend-flagged edges are followed as hops. Every weight read comes
// from the input graph, so the result is independent of iteration order.

use super::AffinityGraph;
use std::time::Instant;
use tracing::info;

pub const ONE_HOP_ATTENUATION: f64 = 1_000.0;
pub const TWO_HOP_ATTENUATION: f64 = 10_000.0;

/// Return a copy of `graph` with two-hop affinity added. `graph` is left
/// untouched for direct lookups.
pub fn propagate(graph: &AffinityGraph) -> AffinityGraph {
    let started = Instant::now();
    let mut output = graph.clone();

    for node in graph.nodes() {
        for (friend, _) in graph.friend_neighbors(node) {
            for (target, edge) in graph.neighbors(friend) {
                if target != node && target != friend {
                    output.add_contribution(node, target, edge.weight / ONE_HOP_ATTENUATION, false);
                }
            }

            for (second, _) in graph.friend_neighbors(friend) {
                for (target, edge) in graph.neighbors(second) {
                    if target != node && target != friend && target != second {
                        output.add_contribution(
                            node,
                            target,
                            edge.weight / TWO_HOP_ATTENUATION,
                            false,
                        );
                    }
                }
            }
        }
    }

    info!(
        base_edges = graph.edge_count(),
        propagated_edges = output.edge_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Affinity propagated"
    );

    output
}
