// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progressive Edge Growth construction of the staircase Tanner graphs.
//!
//! For each data column in order, three edges are added to check nodes chosen
//! to maximize the shortest cycle through the new edge: if some checks are
//! unreachable in a BFS from the variable the edge closes no cycle, so the
//! minimum-degree unreachable check is taken; otherwise the minimum-degree
//! check at maximum BFS depth. Ties are broken by `rng.next32() % candidates`
//! over candidates enumerated in ascending check order.

use pxf_core::rng::XorShift128P;

/// Builds the check-to-variable adjacency for an `(n, k)` staircase code.
/// Returns the flattened adjacency and per-check offsets.
pub fn build_graph(n: usize, k: usize, seed: u32) -> (Vec<u32>, Vec<u32>) {
    let m = n - k;

    let mut chk_vars: Vec<Vec<u32>> = vec![Vec::new(); m];
    let mut var_chks: Vec<Vec<u32>> = vec![Vec::new(); n];
    let mut chk_degree = vec![0u32; m];

    let add_edge = |chk_vars: &mut Vec<Vec<u32>>,
                    var_chks: &mut Vec<Vec<u32>>,
                    chk_degree: &mut Vec<u32>,
                    c: usize,
                    v: usize| {
        chk_vars[c].push(v as u32);
        var_chks[v].push(c as u32);
        chk_degree[c] += 1;
    };

    // Dual-diagonal staircase: check i sees p_i, and p_{i-1} for i >= 1.
    for i in 0..m {
        add_edge(&mut chk_vars, &mut var_chks, &mut chk_degree, i, k + i);
        if i >= 1 {
            add_edge(&mut chk_vars, &mut var_chks, &mut chk_degree, i, k + i - 1);
        }
    }

    let mut rng = XorShift128P::new(seed);

    let mut depth = vec![-1i32; m];
    let mut var_seen = vec![false; n];
    let mut frontier: Vec<u32> = Vec::with_capacity(m);
    let mut next_frontier: Vec<u32> = Vec::with_capacity(m);
    let mut candidates: Vec<u32> = Vec::with_capacity(m);

    for v in 0..k {
        for _ in 0..3 {
            // BFS from v over the current graph, recording check depths.
            depth.fill(-1);
            var_seen.fill(false);
            var_seen[v] = true;

            frontier.clear();
            for &c in &var_chks[v] {
                if depth[c as usize] < 0 {
                    depth[c as usize] = 0;
                    frontier.push(c);
                }
            }

            let mut level = 0i32;
            while !frontier.is_empty() {
                next_frontier.clear();
                for &c in frontier.iter() {
                    for &w in &chk_vars[c as usize] {
                        let w = w as usize;
                        if var_seen[w] {
                            continue;
                        }
                        var_seen[w] = true;
                        for &c2 in &var_chks[w] {
                            if depth[c2 as usize] < 0 {
                                depth[c2 as usize] = level + 1;
                                next_frontier.push(c2);
                            }
                        }
                    }
                }
                level += 1;
                std::mem::swap(&mut frontier, &mut next_frontier);
            }

            candidates.clear();

            let any_unreachable = depth.iter().any(|&d| d < 0);

            if any_unreachable {
                // An edge to an unreachable check closes no cycle at all.
                let min_degree = (0..m)
                    .filter(|&c| depth[c] < 0)
                    .map(|c| chk_degree[c])
                    .min()
                    .unwrap();
                for c in 0..m {
                    if depth[c] < 0 && chk_degree[c] == min_degree {
                        candidates.push(c as u32);
                    }
                }
            }
            else {
                let max_depth = depth.iter().copied().max().unwrap();
                let min_degree = (0..m)
                    .filter(|&c| depth[c] == max_depth)
                    .map(|c| chk_degree[c])
                    .min()
                    .unwrap();
                for c in 0..m {
                    if depth[c] == max_depth && chk_degree[c] == min_degree {
                        candidates.push(c as u32);
                    }
                }
            }

            let pick = candidates[(rng.next32() as usize) % candidates.len()] as usize;
            add_edge(&mut chk_vars, &mut var_chks, &mut chk_degree, pick, v);
        }
    }

    let mut flat = Vec::with_capacity(3 * k + 2 * m);
    let mut offsets = Vec::with_capacity(m + 1);
    offsets.push(0u32);
    for vars in &chk_vars {
        flat.extend_from_slice(vars);
        offsets.push(flat.len() as u32);
    }

    (flat, offsets)
}
