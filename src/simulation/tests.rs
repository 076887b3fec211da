use super::*;

// Greatest simulation by repeatedly removing pairs that violate the transfer condition
fn naive_preorder(lts: &TransitionSystem) -> Vec<Vec<bool>> {
    let n = lts.n_states() as usize;
    let trans = lts.transitions();
    let mut rel = vec![vec![true; n]; n];
    let mut changed = true;
    while changed {
        changed = false;
        for s in 0..n {
            for t in 0..n {
                if !rel[s][t] {
                    continue;
                }
                let matched = trans.iter()
                    .filter(|st| st.from as usize == s)
                    .all(|st| trans.iter().any(|tt| tt.from as usize == t
                        && tt.label == st.label
                        && rel[st.to as usize][tt.to as usize]));
                if !matched {
                    rel[s][t] = false;
                    changed = true;
                }
            }
        }
    }
    rel
}

fn assert_matches_naive(mut lts: TransitionSystem) {
    let expected = naive_preorder(&lts);
    let n = lts.n_states();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    for s in 0..n {
        for t in 0..n {
            assert_eq!(partitioner.in_preorder(s, t), expected[s as usize][t as usize],
                "States {s} and {t}");
        }
    }
}

// Every quotient edge is witnessed by an original transition,
// and every original transition is covered by a quotient edge into a class at least as large.
fn assert_quotient_sound(partitioner: &SimPartitioner) {
    let quotient = partitioner.quotient_transitions().unwrap();
    let original = partitioner.lts.transitions();
    for q in &quotient {
        assert!(original.iter().any(|t| t.label == q.label
                && partitioner.class_of(t.from) == q.from as usize
                && partitioner.class_of(t.to) == q.to as usize),
            "Quotient transition {q:?} has no witness");
    }
    for t in original {
        assert!(quotient.iter().any(|q| q.label == t.label
                && q.from as usize == partitioner.class_of(t.from)
                && partitioner.class_in_preorder(partitioner.class_of(t.to), q.to as usize)),
            "Transition {t:?} is not covered by the quotient");
    }
}

// 0 -a-> 1, 0 -a-> 2, 1 -b-> 3, 2 -c-> 3
fn branching() -> TransitionSystem {
    let (a, b, c) = (0, 1, 2);
    TransitionSystem::from(vec![(0, 1, a), (0, 2, a), (1, 3, b), (2, 3, c)])
}

fn cyclic() -> TransitionSystem {
    let a = 0;
    TransitionSystem::from(vec![(0, 0, a), (1, 2, a), (2, 1, a), (3, 4, a)])
}

#[test]
fn test_single_transition() {
    let mut lts = TransitionSystem::from(vec![(0, 1, 0)]);
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    assert!(partitioner.in_preorder(1, 0));
    assert!(!partitioner.in_preorder(0, 1));
    assert!(!partitioner.same_class(0, 1));
    assert_eq!(partitioner.num_classes(), 2);
}

#[test]
fn test_branching() {
    let mut lts = branching();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    assert_eq!(partitioner.num_classes(), 4);
    assert!(partitioner.in_preorder(1, 1));
    assert!(!partitioner.same_class(1, 2));
    assert!(!partitioner.in_preorder(1, 2));
    assert!(!partitioner.in_preorder(2, 1));
    for s in 0..3 {
        assert!(partitioner.in_preorder(3, s));
        assert!(!partitioner.in_preorder(s, 3));
    }
    assert!(!partitioner.in_preorder(0, 1));
    assert!(!partitioner.in_preorder(1, 0));
}

#[test]
fn test_branching_quotient() {
    let mut lts = branching();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    let c = |s| partitioner.class_of(s) as u32;
    let mut quotient = partitioner.quotient_transitions().unwrap();
    quotient.sort();
    let mut expected = vec![
        Transition::new(c(0), 0, c(1)),
        Transition::new(c(0), 0, c(2)),
        Transition::new(c(1), 1, c(3)),
        Transition::new(c(2), 2, c(3)),
    ];
    expected.sort();
    assert_eq!(quotient, expected);
}

#[test]
fn test_dominated_transition_dropped() {
    let (a, b) = (0, 1);
    // 0 -a-> 2 is redundant because 0 -a-> 1 and 2 is simulated by 1
    let mut lts = TransitionSystem::from(vec![(0, 1, a), (0, 2, a), (1, 3, b)]);
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    assert!(partitioner.same_class(2, 3));
    assert_eq!(partitioner.num_classes(), 3);
    let c = |s| partitioner.class_of(s) as u32;
    let mut quotient = partitioner.quotient_transitions().unwrap();
    quotient.sort();
    let mut expected = vec![
        Transition::new(c(0), a, c(1)),
        Transition::new(c(1), b, c(3)),
    ];
    expected.sort();
    assert_eq!(quotient, expected);
    assert_quotient_sound(&partitioner);
}

#[test]
fn test_cycles() {
    let mut lts = cyclic();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    assert_eq!(partitioner.num_classes(), 3);
    assert!(partitioner.same_class(0, 1));
    assert!(partitioner.same_class(1, 2));
    assert!(partitioner.in_preorder(3, 0));
    assert!(!partitioner.in_preorder(0, 3));
    assert_eq!(partitioner.class_members(partitioner.class_of(2)), vec![0, 1, 2]);
    assert_quotient_sound(&partitioner);
}

#[test]
fn test_no_labels() {
    let mut lts = TransitionSystem::new(3, 0, 0, vec![]).unwrap();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    assert_eq!(partitioner.num_classes(), 1);
    assert!(partitioner.in_preorder(2, 0));
    assert!(partitioner.quotient_transitions().unwrap().is_empty());
}

#[test]
fn test_against_naive() {
    let (a, b, c) = (0, 1, 2);
    assert_matches_naive(branching());
    assert_matches_naive(cyclic());
    // Milner's vending machines
    assert_matches_naive(TransitionSystem::from(vec![
        (0, 1, a), (1, 2, b), (1, 3, c),
        (4, 5, a), (4, 6, a), (5, 7, b), (6, 8, c),
    ]));
    // Infinite a-chains that differ in where b is possible
    assert_matches_naive(TransitionSystem::from(vec![
        (0, 1, a), (1, 0, a), (1, 2, b),
        (3, 4, a), (4, 5, a), (5, 3, a), (4, 2, b), (5, 2, b),
        (6, 6, a), (6, 2, b),
    ]));
    // Several labels into the same targets
    assert_matches_naive(TransitionSystem::from(vec![
        (0, 1, a), (0, 1, b), (1, 0, c), (2, 3, a), (3, 2, c), (2, 4, b), (4, 2, c),
        (5, 5, a), (5, 5, b), (5, 6, c),
    ]));
}

#[test]
fn test_preorder_properties() {
    let mut lts = TransitionSystem::from(vec![
        (0, 1, 0), (0, 2, 0), (1, 3, 1), (2, 3, 1), (2, 4, 0), (4, 0, 1), (5, 4, 0), (5, 1, 0),
    ]);
    let n = lts.n_states();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    assert!(partitioner.q.is_reflexive());
    for s in 0..n {
        assert!(partitioner.in_preorder(s, s));
        for t in 0..n {
            assert_eq!(partitioner.same_class(s, t),
                partitioner.in_preorder(s, t) && partitioner.in_preorder(t, s));
            for u in 0..n {
                if partitioner.in_preorder(s, t) && partitioner.in_preorder(t, u) {
                    assert!(partitioner.in_preorder(s, u));
                }
            }
        }
    }
    assert_quotient_sound(&partitioner);
}

#[test]
fn test_deterministic() {
    let lts = TransitionSystem::from(vec![
        (3, 1, 0), (0, 2, 1), (2, 4, 0), (1, 4, 1), (0, 3, 0), (4, 4, 0),
    ]);
    let mut first = lts.clone();
    let mut second = lts.clone();
    let mut p1 = SimPartitioner::new(&mut first);
    let mut p2 = SimPartitioner::new(&mut second);
    p1.run();
    p2.run();
    for s in 0..lts.n_states() {
        assert_eq!(p1.class_of(s), p2.class_of(s));
    }
    assert_eq!(p1.relation_pairs().collect::<Vec<_>>(), p2.relation_pairs().collect::<Vec<_>>());
    assert_eq!(p1.quotient_transitions().unwrap(), p2.quotient_transitions().unwrap());
    assert_eq!(p1.rounds(), p2.rounds());
}

#[test]
fn test_rounds_monotone() {
    let mut lts = TransitionSystem::from(vec![
        (0, 1, 0), (1, 2, 0), (2, 3, 0), (3, 4, 0), (4, 5, 1), (6, 7, 0), (7, 6, 0),
    ]);
    let n = lts.n_states() as usize;
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    let rounds = partitioner.rounds();
    assert!(rounds.len() >= 2);
    for w in rounds.windows(2) {
        assert!(w[0].blocks <= w[1].blocks, "Blocks merged: {rounds:?}");
        assert!(w[0].related_states >= w[1].related_states, "Relation grew: {rounds:?}");
    }
    let last = rounds[rounds.len() - 1];
    assert_eq!(last.blocks, partitioner.num_classes());
    assert!(last.related_states <= n * n);
    let related = (0..n as u32)
        .flat_map(|s| (0..n as u32).map(move |t| (s, t)))
        .filter(|&(s, t)| partitioner.in_preorder(s, t))
        .count();
    assert_eq!(last.related_states, related);
}

#[test]
fn test_run_twice() {
    let mut lts = cyclic();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    let rounds = partitioner.rounds().len();
    partitioner.run();
    assert_eq!(partitioner.rounds().len(), rounds);
}

#[test]
fn test_seed_is_respected() {
    let mut lts = cyclic();
    // Keep 0 apart from the 2-cycle, but let it be simulated by it
    let seed = SeedPartition::new(vec![0, 1, 1, 0, 0], ndarray::arr2(&[[true, true], [false, true]]));
    let mut partitioner = SimPartitioner::with_seed(&mut lts, seed);
    partitioner.run();
    assert!(!partitioner.same_class(0, 1));
    assert!(partitioner.in_preorder(0, 1));
    assert!(!partitioner.in_preorder(1, 0));
    assert!(partitioner.same_class(1, 2));
}

#[test]
fn test_equivalence_relation() {
    let mut lts = cyclic();
    let mut partitioner = SimPartitioner::new(&mut lts);
    partitioner.run();
    let relation = partitioner.equivalence_relation();
    assert_eq!(relation.count_classes() as usize, partitioner.num_classes());
    assert_eq!(relation.get_classes(), vec![vec![0, 1, 2], vec![3], vec![4]]);
}

#[test]
#[should_panic]
fn test_query_before_run() {
    let mut lts = cyclic();
    let partitioner = SimPartitioner::new(&mut lts);
    partitioner.in_preorder(0, 1);
}

#[test]
fn test_transitions_sorted() {
    let mut lts = TransitionSystem::from(vec![(1, 0, 1), (0, 1, 0), (1, 1, 0)]);
    SimPartitioner::new(&mut lts);
    assert!(lts.is_sorted_by(TransitionOrder::LabelTargetSource));
}
