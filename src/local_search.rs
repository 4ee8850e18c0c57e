//! 2-opt and 3-opt local search over a constructed tour.
//!
//! Both operators use first-improvement scanning with a `done`-flag
//! loop: keep scanning while some move improves, stop when a full pass
//! finds none. Neither operator can return a tour longer than its
//! input.

use serde::{Deserialize, Serialize};

use crate::city::Graph;
use crate::tour::Tour;

const EPS: f64 = 1e-9;

/// Which ants' tours a colony applies local search to per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalSearchMode {
    None,
    Best,
    All,
}

/// Reverse segment `[i, k]` (inclusive) in place and apply a 2-opt move
/// whenever it shortens the tour. Returns true if any move was applied.
pub fn two_opt(graph: &Graph, tour: &mut Tour) -> bool {
    let n = tour.sequence.len();
    if n < 4 {
        return false;
    }

    let mut improved_any = false;

    loop {
        let mut improved = false;

        'scan: for i in 1..n - 1 {
            for k in (i + 1)..n {
                let a = tour.sequence[i - 1];
                let b = tour.sequence[i];
                let c = tour.sequence[k];
                let d = tour.sequence[(k + 1) % n];

                let delta =
                    graph.distance(a, c) + graph.distance(b, d) - graph.distance(a, b) - graph.distance(c, d);

                if delta < -EPS {
                    tour.sequence[i..=k].reverse();
                    tour.distance += delta;
                    improved = true;
                    improved_any = true;
                    break 'scan;
                }
            }
        }

        if !improved {
            break;
        }
    }

    improved_any
}

/// The seven non-identity 3-opt reconnections of a tour cut at three
/// points `i < j < k`, labeled by which of the two inner segments are
/// reversed and whether their order is swapped. `Identity` is never
/// produced by [`best_reconnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconnection {
    ReverseFirst,
    ReverseSecond,
    ReverseBoth,
    SwapSegments,
    SwapReverseSecond,
    SwapReverseFirst,
    SwapReverseBoth,
}

/// For cut points `i < j < k`, evaluate the delta of all seven
/// reconnections using only the six boundary-edge distances (no full
/// retour), and return the best one if it strictly improves.
///
/// Segments: `a = s[i-1]`, `b = s[i]`, `c = s[j-1]`, `d = s[j]`,
/// `e = s[k]`, `f = s[(k+1) mod n]`. `P1 = s[i..j]`, `P2 = s[j..=k]`;
/// everything else is the fixed "spine" `P3` that stays in place.
fn best_reconnection(graph: &Graph, sequence: &[usize], i: usize, j: usize, k: usize) -> Option<(Reconnection, f64)> {
    let n = sequence.len();
    let a = sequence[i - 1];
    let b = sequence[i];
    let c = sequence[j - 1];
    let d = sequence[j];
    let e = sequence[k];
    let f = sequence[(k + 1) % n];

    let d_ab = graph.distance(a, b);
    let d_cd = graph.distance(c, d);
    let d_ef = graph.distance(e, f);
    let removed = d_ab + d_cd + d_ef;

    let candidates = [
        (
            Reconnection::ReverseFirst,
            graph.distance(a, c) + graph.distance(b, d) + d_ef,
        ),
        (
            Reconnection::ReverseSecond,
            d_ab + graph.distance(c, e) + graph.distance(d, f),
        ),
        (
            Reconnection::ReverseBoth,
            graph.distance(a, c) + graph.distance(b, e) + graph.distance(d, f),
        ),
        (
            Reconnection::SwapSegments,
            graph.distance(a, d) + graph.distance(e, b) + graph.distance(c, f),
        ),
        (
            Reconnection::SwapReverseSecond,
            graph.distance(a, e) + graph.distance(d, b) + graph.distance(c, f),
        ),
        (
            Reconnection::SwapReverseFirst,
            graph.distance(a, d) + graph.distance(e, c) + graph.distance(b, f),
        ),
        (
            Reconnection::SwapReverseBoth,
            graph.distance(a, e) + graph.distance(d, c) + graph.distance(b, f),
        ),
    ];

    candidates
        .into_iter()
        .map(|(r, new_cost)| (r, new_cost - removed))
        .filter(|&(_, delta)| delta < -EPS)
        .min_by(|x, y| x.1.partial_cmp(&y.1).expect("distances are always finite"))
}

/// Rebuild the full sequence for a chosen reconnection at cut points
/// `i < j < k`. `P3` (the spine, `s[k+1..] ++ s[..i]`) never moves;
/// `P1 = s[i..j]` and `P2 = s[j..=k]` are reversed and/or swapped.
fn apply_reconnection(sequence: &[usize], i: usize, j: usize, k: usize, reconnection: Reconnection) -> Vec<usize> {
    let n = sequence.len();
    let mut spine: Vec<usize> = sequence[(k + 1)..n].to_vec();
    spine.extend_from_slice(&sequence[0..i]);

    let p1: Vec<usize> = sequence[i..j].to_vec();
    let p2: Vec<usize> = sequence[j..=k].to_vec();

    let (first, second) = match reconnection {
        Reconnection::ReverseFirst => {
            let mut p1r = p1;
            p1r.reverse();
            (p1r, p2)
        }
        Reconnection::ReverseSecond => {
            let mut p2r = p2;
            p2r.reverse();
            (p1, p2r)
        }
        Reconnection::ReverseBoth => {
            let mut p1r = p1;
            p1r.reverse();
            let mut p2r = p2;
            p2r.reverse();
            (p1r, p2r)
        }
        Reconnection::SwapSegments => (p2, p1),
        Reconnection::SwapReverseSecond => {
            let mut p2r = p2;
            p2r.reverse();
            (p2r, p1)
        }
        Reconnection::SwapReverseFirst => {
            let mut p1r = p1;
            p1r.reverse();
            (p2, p1r)
        }
        Reconnection::SwapReverseBoth => {
            let mut p1r = p1;
            p1r.reverse();
            let mut p2r = p2;
            p2r.reverse();
            (p2r, p1r)
        }
    };

    let mut new_sequence = spine;
    new_sequence.extend(first);
    new_sequence.extend(second);
    new_sequence
}

/// First-improvement 3-opt: for each triple of cut points, apply the
/// best strictly-improving reconnection (if any) and restart scanning.
pub fn three_opt(graph: &Graph, tour: &mut Tour) -> bool {
    let n = tour.sequence.len();
    if n < 6 {
        return false;
    }

    let mut improved_any = false;

    loop {
        let mut improved = false;

        'scan: for i in 1..n - 2 {
            for j in (i + 1)..n - 1 {
                for k in (j + 1)..n {
                    if let Some((reconnection, delta)) = best_reconnection(graph, &tour.sequence, i, j, k) {
                        tour.sequence = apply_reconnection(&tour.sequence, i, j, k, reconnection);
                        tour.distance += delta;
                        improved = true;
                        improved_any = true;
                        break 'scan;
                    }
                }
            }
        }

        if !improved {
            break;
        }
    }

    improved_any
}

/// Maximum number of 2-opt/3-opt alternation rounds when both operators
/// are enabled.
const MAX_ALTERNATION_ROUNDS: usize = 3;

/// Apply local search per `mode` and `use_3opt`. When 3-opt is enabled,
/// alternates 2-opt-to-convergence and 3-opt-to-convergence for up to
/// `MAX_ALTERNATION_ROUNDS` rounds, stopping early once a round applies
/// no further improvement.
pub fn improve(graph: &Graph, tour: &mut Tour, use_3opt: bool) -> bool {
    let mut improved_any = two_opt(graph, tour);

    if use_3opt {
        for _ in 0..MAX_ALTERNATION_ROUNDS {
            let three_opt_improved = three_opt(graph, tour);
            let two_opt_improved = two_opt(graph, tour);
            improved_any = improved_any || three_opt_improved || two_opt_improved;
            if !three_opt_improved && !two_opt_improved {
                break;
            }
        }
    }

    improved_any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::City;

    fn four_city_crossed() -> Graph {
        // A "bowtie" ordering [0,2,1,3] crosses itself; 2-opt should
        // uncross it back to the perimeter tour of length 4.
        Graph::new(vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 1.0, 0.0),
            City::new(2, 1.0, 1.0),
            City::new(3, 0.0, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn two_opt_never_lengthens_a_tour() {
        let g = four_city_crossed();
        let mut t = Tour::from_sequence(&g, vec![0, 2, 1, 3]);
        let before = t.distance;
        two_opt(&g, &mut t);
        assert!(t.distance <= before + 1e-9);
    }

    #[test]
    fn two_opt_uncrosses_a_bowtie() {
        let g = four_city_crossed();
        let mut t = Tour::from_sequence(&g, vec![0, 2, 1, 3]);
        two_opt(&g, &mut t);
        assert!((t.distance - 4.0).abs() < 1e-9);
        assert!(t.validate(4));
    }

    #[test]
    fn two_opt_distance_matches_recomputation() {
        let g = four_city_crossed();
        let mut t = Tour::from_sequence(&g, vec![0, 2, 1, 3]);
        two_opt(&g, &mut t);
        let mut recomputed = t.clone();
        recomputed.recompute_distance(&g);
        assert!((t.distance - recomputed.distance).abs() < 1e-6);
    }

    fn six_city_instance() -> Graph {
        Graph::new(vec![
            City::new(0, 0.0, 0.0),
            City::new(1, 2.0, 0.0),
            City::new(2, 3.0, 2.0),
            City::new(3, 2.0, 4.0),
            City::new(4, 0.0, 4.0),
            City::new(5, -1.0, 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn three_opt_never_lengthens_a_tour() {
        let g = six_city_instance();
        let mut t = Tour::from_sequence(&g, vec![0, 3, 1, 4, 2, 5]);
        let before = t.distance;
        three_opt(&g, &mut t);
        assert!(t.distance <= before + 1e-9);
        assert!(t.validate(6));
    }

    #[test]
    fn three_opt_distance_matches_recomputation() {
        let g = six_city_instance();
        let mut t = Tour::from_sequence(&g, vec![0, 3, 1, 4, 2, 5]);
        three_opt(&g, &mut t);
        let mut recomputed = t.clone();
        recomputed.recompute_distance(&g);
        assert!((t.distance - recomputed.distance).abs() < 1e-6);
    }

    #[test]
    fn improve_with_3opt_never_lengthens_a_tour() {
        let g = six_city_instance();
        let mut t = Tour::from_sequence(&g, vec![0, 3, 1, 4, 2, 5]);
        let before = t.distance;
        improve(&g, &mut t, true);
        assert!(t.distance <= before + 1e-9);
        assert!(t.validate(6));
    }

    #[test]
    fn apply_reconnection_swap_reverse_both_reverses_and_swaps_both_segments() {
        // spine = [6, 0]; P1 = [1, 2]; P2 = [3, 4, 5].
        let sequence: Vec<usize> = (0..7).collect();
        let result = apply_reconnection(&sequence, 1, 3, 5, Reconnection::SwapReverseBoth);
        assert_eq!(result, vec![6, 0, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn best_reconnection_picks_swap_reverse_both_when_it_is_cheapest() {
        // Cities positioned so that connecting a-e, d-c, b-f is far
        // cheaper than any other reconnection of cut points (1, 3, 5):
        // sequence [a, b, c, d, g, e, f] with a/e and b/f nearly
        // coincident while a-b and e-f are long.
        let g = Graph::new(vec![
            City::new(0, 0.0, 0.0),     // a
            City::new(1, 0.0, 10.0),    // b
            City::new(2, 100.0, 100.0), // c
            City::new(3, 100.0, 101.0), // d
            City::new(4, 50.0, 50.0),   // filler between d and e
            City::new(5, 0.0, 1.0),     // e
            City::new(6, 0.0, 11.0),    // f
        ])
        .unwrap();

        let sequence: Vec<usize> = (0..7).collect();
        let (reconnection, delta) = best_reconnection(&g, &sequence, 1, 3, 5).expect("an improving reconnection exists");
        assert_eq!(reconnection, Reconnection::SwapReverseBoth);
        assert!(delta < -15.0, "expected a large improvement, got delta={delta}");

        let new_sequence = apply_reconnection(&sequence, 1, 3, 5, reconnection);
        assert_eq!(new_sequence, vec![6, 0, 5, 4, 3, 2, 1]);

        let before = g.tour_length(&sequence);
        let after = g.tour_length(&new_sequence);
        assert!((after - (before + delta)).abs() < 1e-6);

        // Regardless of which cut points three_opt's scan visits first,
        // it must never leave this tour longer than the reconnection
        // above, and its cached distance must match recomputation.
        let mut tour = Tour::from_sequence(&g, sequence);
        three_opt(&g, &mut tour);
        let mut recomputed = tour.clone();
        recomputed.recompute_distance(&g);
        assert!((tour.distance - recomputed.distance).abs() < 1e-6);
        assert!(tour.distance <= after + 1e-6);
        assert!(tour.validate(7));
    }

    #[test]
    fn small_tour_is_left_untouched() {
        let g = Graph::new(vec![City::new(0, 0.0, 0.0), City::new(1, 1.0, 0.0), City::new(2, 0.5, 1.0)]).unwrap();
        let mut t = Tour::from_sequence(&g, vec![0, 1, 2]);
        let before = t.distance;
        assert!(!two_opt(&g, &mut t));
        assert!((t.distance - before).abs() < 1e-9);
    }
}
