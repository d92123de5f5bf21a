//! Epsilon-greedy action selection

use rand::Rng;

use crate::action::ActionId;
use crate::state::StateId;
use crate::value_store::ValueStore;

/// Stateless epsilon-greedy selector.
///
/// The exploration rate is owned by the episode controller and passed in on
/// every call, so selection is reproducible given a seeded random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsilonGreedy;

impl EpsilonGreedy {
    pub fn new() -> Self {
        Self
    }

    /// With probability `epsilon` pick uniformly at random, otherwise the best known action
    pub fn choose<R: Rng + ?Sized>(
        &self,
        store: &mut ValueStore,
        state: StateId,
        epsilon: f64,
        rng: &mut R,
    ) -> ActionId {
        // Materialize the entry even when exploring
        store.get(state);

        if rng.gen::<f64>() < epsilon {
            rng.gen_range(0..store.action_count())
        } else {
            store.best_action(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_greedy_when_epsilon_zero() {
        let mut store = ValueStore::new(6);
        store.update(4, 3, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            assert_eq!(EpsilonGreedy.choose(&mut store, 4, 0.0, &mut rng), 3);
        }
    }

    #[test]
    fn test_random_when_epsilon_one() {
        let mut store = ValueStore::new(6);
        store.update(0, 0, 100.0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = [false; 6];
        for _ in 0..500 {
            let action = EpsilonGreedy.choose(&mut store, 0, 1.0, &mut rng);
            assert!(action < 6);
            seen[action] = true;
        }
        assert!(seen.iter().all(|&s| s), "every action explored: {seen:?}");
    }

    #[test]
    fn test_choose_materializes_state() {
        let mut store = ValueStore::new(6);
        let mut rng = StdRng::seed_from_u64(1);

        EpsilonGreedy.choose(&mut store, 9, 1.0, &mut rng);
        assert_eq!(store.len(), 1);
        assert!(store.peek(9).is_some());
    }

    #[test]
    fn test_same_seed_same_choices() {
        let mut store = ValueStore::new(6);
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);

        let first: Vec<_> = (0..50)
            .map(|s| EpsilonGreedy.choose(&mut store, s, 0.5, &mut a))
            .collect();
        let second: Vec<_> = (0..50)
            .map(|s| EpsilonGreedy.choose(&mut store, s, 0.5, &mut b))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exploration_rate_is_respected() {
        let mut store = ValueStore::new(6);
        store.update(0, 5, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);

        let trials = 10_000;
        let greedy = (0..trials)
            .filter(|_| EpsilonGreedy.choose(&mut store, 0, 0.3, &mut rng) == 5)
            .count();
        // 0.7 greedy + 0.3 * 1/6 random hits on action 5 = 0.75
        let rate = greedy as f64 / trials as f64;
        assert!((rate - 0.75).abs() < 0.03, "greedy rate {rate}");
    }
}
