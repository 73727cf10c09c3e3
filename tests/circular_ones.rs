use std::panic;

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64;

use ::pc_tree::PCTree;

#[test]
fn arcs_of_a_hidden_cycle_are_accepted() {
    let mut rng = thread_rng();
    for i in 0..500 {
        let seed = rng.next_u64();
        let n = rng.gen_range(4..=16);
        let constraints = rng.gen_range(1..=12);

        let result = panic::catch_unwind(|| hidden_cycle_iter(n, constraints, seed));
        if result.is_err() {
            dbg!(i, n, constraints, seed);
            panic!();
        }
    }
}

fn hidden_cycle_iter(n: usize, constraints: usize, seed: u64) {
    let mut rng = Pcg64::seed_from_u64(seed);

    let mut hidden: Vec<usize> = (0..n).collect();
    hidden.shuffle(&mut rng);

    let mut tree = PCTree::new(n);
    let mut accepted: Vec<Vec<usize>> = Vec::new();
    for _ in 0..constraints {
        let start = rng.gen_range(0..n);
        let len = rng.gen_range(2..=n - 2);
        let arc: Vec<usize> = (0..len).map(|k| hidden[(start + k) % n]).collect();
        assert!(tree.restrict(&arc), "arc {arc:?} of the hidden cycle rejected");
        accepted.push(arc);
    }

    let frontier = tree.frontier();
    assert_eq!(frontier.len(), n);
    for arc in &accepted {
        assert!(
            is_circularly_consecutive(&frontier, arc),
            "arc {arc:?} broken in frontier {frontier:?}"
        );
    }
}

#[test]
fn fixed_cycle_rejects_everything_but_arcs() {
    let mut rng = thread_rng();
    for i in 0..200 {
        let seed = rng.next_u64();
        let n = rng.gen_range(5..=14);

        let result = panic::catch_unwind(|| fixed_cycle_iter(n, seed));
        if result.is_err() {
            dbg!(i, n, seed);
            panic!();
        }
    }
}

fn fixed_cycle_iter(n: usize, seed: u64) {
    let mut rng = Pcg64::seed_from_u64(seed);

    let mut hidden: Vec<usize> = (0..n).collect();
    hidden.shuffle(&mut rng);

    // adjacent pairs pin the whole circular order
    let mut tree = PCTree::new(n);
    for i in 0..n - 1 {
        assert!(tree.restrict(&[hidden[i], hidden[i + 1]]));
    }

    for _ in 0..10 {
        let len = rng.gen_range(2..=n - 2);
        let mut subset: Vec<usize> = hidden.clone();
        subset.shuffle(&mut rng);
        subset.truncate(len);

        if is_circularly_consecutive(&hidden, &subset) {
            assert!(tree.restrict(&subset), "arc {subset:?} of the pinned cycle rejected");
        } else {
            let before = tree.represent(true);
            assert!(!tree.restrict(&subset), "non-arc {subset:?} accepted on a pinned cycle");
            assert_eq!(tree.represent(true), before, "rejected {subset:?} left a trace");
        }
    }
}

fn is_circularly_consecutive(order: &[usize], set: &[usize]) -> bool {
    let n = order.len();
    let mut changes = 0;
    for i in 0..n {
        let here = set.contains(&order[i]);
        let before = set.contains(&order[(i + n - 1) % n]);
        if here != before {
            changes += 1;
        }
    }
    changes == 2
}
