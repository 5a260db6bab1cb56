// src/config.rs
//
// Boundary configuration. Environment variables provide the defaults and
// command line flags override them.

use clap::ValueEnum;
use thiserror::Error;

use crate::boundary::{Boundary, Strategy};

/// Selects the boundary strategy.
pub const STRATEGY_VAR: &str = "SCANGUARD_STRATEGY";
/// Fiber stack size in bytes; accepts a `k`/`m` suffix.
pub const FIBER_STACK_VAR: &str = "SCANGUARD_FIBER_STACK";

/// Smallest fiber stack accepted.
pub const MIN_FIBER_STACK: usize = 16 * 1024;

/// Strategy selector exposed on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// Unwind from the error handler on the caller's stack
    #[default]
    Unwind,
    /// Run each engine call on its own fiber and abandon it on error
    Fiber,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: unknown strategy '{value}' (expected 'unwind' or 'fiber')")]
    UnknownStrategy { var: &'static str, value: String },

    #[error("{var}: invalid stack size '{value}'")]
    InvalidStackSize { var: &'static str, value: String },

    #[error("fiber stack of {0} bytes is below the {MIN_FIBER_STACK} byte minimum")]
    StackTooSmall(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryConfig {
    pub strategy: StrategyKind,
    pub fiber_stack: usize,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            strategy: StrategyKind::Unwind,
            fiber_stack: Strategy::DEFAULT_FIBER_STACK,
        }
    }
}

impl BoundaryConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = BoundaryConfig::default();

        if let Some(value) = lookup(STRATEGY_VAR) {
            config.strategy = StrategyKind::from_str(value.trim(), true).map_err(|_| {
                ConfigError::UnknownStrategy {
                    var: STRATEGY_VAR,
                    value,
                }
            })?;
        }
        if let Some(value) = lookup(FIBER_STACK_VAR) {
            config.fiber_stack = parse_size(&value).ok_or(ConfigError::InvalidStackSize {
                var: FIBER_STACK_VAR,
                value,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        strategy: Option<StrategyKind>,
        fiber_stack: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if let Some(strategy) = strategy {
            self.strategy = strategy;
        }
        if let Some(size) = fiber_stack {
            self.fiber_stack = size;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fiber_stack < MIN_FIBER_STACK {
            return Err(ConfigError::StackTooSmall(self.fiber_stack));
        }
        Ok(())
    }

    pub fn strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::Unwind => Strategy::Unwind,
            StrategyKind::Fiber => Strategy::Fiber {
                stack_size: self.fiber_stack,
            },
        }
    }

    pub fn boundary(&self) -> Boundary {
        Boundary::new(self.strategy())
    }
}

/// Parse a byte count such as `65536`, `64k` or `2M`.
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    let (digits, scale) = match value.char_indices().last()? {
        (i, 'k' | 'K') => (&value[..i], 1024),
        (i, 'm' | 'M') => (&value[..i], 1024 * 1024),
        _ => (value, 1),
    };
    digits.parse::<usize>().ok()?.checked_mul(scale)
}
