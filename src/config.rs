// src/config.rs

/// Resource budgets for the two fixed points whose size is not bounded by
/// the grammar alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Upper bound on the number of parallel-lexer states (including identity).
    pub max_parallel_states: usize,
    /// Upper bound on the number of LLP item sets.
    pub max_item_sets: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            // Keeps parallel-state ids within u16 for table consumers.
            max_parallel_states: 1 << 16,
            max_item_sets: 100_000,
        }
    }
}

impl GeneratorConfig {
    /// Defaults, overridden by `LLPGEN_MAX_PARALLEL_STATES` and
    /// `LLPGEN_MAX_ITEM_SETS` when set.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_parallel_states: env_usize("LLPGEN_MAX_PARALLEL_STATES", d.max_parallel_states),
            max_item_sets: env_usize("LLPGEN_MAX_ITEM_SETS", d.max_item_sets),
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(s) => match s.trim().parse::<usize>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("ignoring {name}={s:?}: not an unsigned integer");
                default
            }
        },
        Err(_) => default,
    }
}
