//! Breadth-first traversal over the visible grid.
//!
//! Match detection and ceiling reachability are the same walk with a
//! different predicate, so both go through [`flood`].

use std::collections::{HashSet, VecDeque};

use super::{grid::HexGrid, hex::HexCoord, token::Token};

/// Collect every visible token reachable from `seeds` through in-bounds
/// neighbors whose token satisfies `include`.
///
/// Seeds are subject to the same predicate. The result is in visit order,
/// seeds first.
pub fn flood<I, P>(grid: &HexGrid, seeds: I, include: P) -> Vec<HexCoord>
where
    I: IntoIterator<Item = HexCoord>,
    P: Fn(&Token) -> bool,
{
    let accepts = |coord: HexCoord| grid.get(coord).is_some_and(&include);

    let mut reached = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    for seed in seeds {
        if visited.insert(seed) && accepts(seed) {
            queue.push_back(seed);
        }
    }

    while let Some(coord) = queue.pop_front() {
        reached.push(coord);

        for neighbor in grid.bounds.neighbors(coord) {
            if visited.insert(neighbor) && accepts(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    reached
}
