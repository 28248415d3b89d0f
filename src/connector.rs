//! Picks one full-panel pair per window for one individual, either by DP
//! over redundant pair sets or by set-intersection chain tracking.

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::redundant::{BitPair, Bitset, RedundantPairs};

/// One individual's chosen full-panel pair per window, strand orientation
/// NOT yet canonicalised — `breakpoint` resolves continuity across windows.
#[derive(Debug, Clone)]
pub struct ConnectorResult {
    pub chosen: Vec<(u32, u32)>,
}

/// `switch((a,b),(c,d))`: the number of strand-level mismatches after
/// considering the best of the two orderings of `(c,d)`.
pub fn switch_cost(prev: (u32, u32), next: (u32, u32)) -> u32 {
    let (a, b) = prev;
    let (c, d) = next;
    let straight = (a != c) as u32 + (b != d) as u32;
    let crossed = (a != d) as u32 + (b != c) as u32;
    straight.min(crossed)
}

/// DP mode. Modelled as a literal layered graph: nodes are `(window,
/// candidate index)`, edges run window `g-1 -> g` weighted by
/// `switch_cost`, and the minimiser is read off by a single forward
/// relaxation pass over those edges — not a generic shortest-path call,
/// since the graph is already topologically layered and every edge points
/// forward.
pub fn connect_dp(candidates: &[RedundantPairs], lambda: f64) -> ConnectorResult {
    let w = candidates.len();
    assert!(w > 0, "connect_dp requires at least one window");

    if w == 1 {
        return ConnectorResult { chosen: vec![lexicographic_min(&candidates[0].pairs)] };
    }

    let mut graph: StableGraph<(usize, usize), f64> = StableGraph::new();
    let mut nodes: Vec<Vec<NodeIndex>> = Vec::with_capacity(w);
    for (g, rp) in candidates.iter().enumerate() {
        nodes.push((0..rp.pairs.len()).map(|ci| graph.add_node((g, ci))).collect());
    }
    for g in 1..w {
        for (ci, &prev_pair) in candidates[g - 1].pairs.iter().enumerate() {
            for (cj, &next_pair) in candidates[g].pairs.iter().enumerate() {
                let cost = lambda * switch_cost(prev_pair, next_pair) as f64;
                graph.add_edge(nodes[g - 1][ci], nodes[g][cj], cost);
            }
        }
    }

    let mut dp: Vec<Vec<f64>> = candidates.iter().map(|rp| vec![0.0f64; rp.pairs.len()]).collect();
    let mut back: Vec<Vec<Option<usize>>> =
        candidates.iter().map(|rp| vec![None; rp.pairs.len()]).collect();

    for g in 1..w {
        for &node in &nodes[g] {
            let (_, cj) = graph[node];
            let mut best_cost = f64::INFINITY;
            let mut best_prev: Option<usize> = None;
            for edge in graph.edges_directed(node, Direction::Incoming) {
                let (_, ci) = graph[edge.source()];
                let cost = dp[g - 1][ci] + *edge.weight();
                let prev_pair = candidates[g - 1].pairs[ci];
                let better = match best_prev {
                    None => true,
                    Some(bp) => {
                        let bp_pair = candidates[g - 1].pairs[bp];
                        cost < best_cost || (cost == best_cost && prev_pair < bp_pair)
                    }
                };
                if better {
                    best_cost = cost;
                    best_prev = Some(ci);
                }
            }
            dp[g][cj] = best_cost;
            back[g][cj] = best_prev;
        }
    }

    let last = w - 1;
    let mut best_final = 0usize;
    for cj in 1..candidates[last].pairs.len() {
        let better = dp[last][cj] < dp[last][best_final]
            || (dp[last][cj] == dp[last][best_final]
                && candidates[last].pairs[cj] < candidates[last].pairs[best_final]);
        if better {
            best_final = cj;
        }
    }

    let mut chosen_idx = vec![0usize; w];
    chosen_idx[last] = best_final;
    for g in (1..w).rev() {
        chosen_idx[g - 1] =
            back[g][chosen_idx[g]].expect("DP backpointer must exist for every window g>=1");
    }

    ConnectorResult { chosen: (0..w).map(|g| candidates[g].pairs[chosen_idx[g]]).collect() }
}

fn lexicographic_min(pairs: &[(u32, u32)]) -> (u32, u32) {
    *pairs.iter().min().expect("window must have at least one candidate pair")
}

/// Set-intersection mode. Maintains two "chain sets" of surviving full
/// haplotype indices per strand; when a window's intersection empties
/// either chain, the run closes and every window in it is retroactively
/// assigned the smallest-index survivor of the pre-intersection sets.
pub fn connect_set_intersection(bitpairs: &[BitPair]) -> ConnectorResult {
    let w = bitpairs.len();
    assert!(w > 0, "connect_set_intersection requires at least one window");

    let mut chosen = vec![(0u32, 0u32); w];
    let mut run_windows: Vec<usize> = vec![0];
    let mut a = bitpairs[0].strand1.clone();
    let mut b = bitpairs[0].strand2.clone();

    for g in 1..w {
        let s1 = &bitpairs[g].strand1;
        let s2 = &bitpairs[g].strand2;

        let straight = a.intersection_len(s1) + b.intersection_len(s2);
        let crossed = a.intersection_len(s2) + b.intersection_len(s1);

        let (new_a, new_b) = if crossed > straight {
            (intersect(&a, s2), intersect(&b, s1))
        } else {
            (intersect(&a, s1), intersect(&b, s2))
        };

        if new_a.is_empty() || new_b.is_empty() {
            close_run(&run_windows, &a, &b, &mut chosen);
            run_windows = vec![g];
            a = s1.clone();
            b = s2.clone();
        } else {
            a = new_a;
            b = new_b;
            run_windows.push(g);
        }
    }
    close_run(&run_windows, &a, &b, &mut chosen);

    ConnectorResult { chosen }
}

fn intersect(x: &Bitset, y: &Bitset) -> Bitset {
    let mut r = x.clone();
    r.intersect_with(y);
    r
}

fn close_run(windows: &[usize], a: &Bitset, b: &Bitset, chosen: &mut [(u32, u32)]) {
    let rep1 = a.min_index().unwrap_or(0);
    let rep2 = b.min_index().unwrap_or(0);
    for &g in windows {
        chosen[g] = (rep1, rep2);
    }
}
