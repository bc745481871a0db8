use super::params::{FilletParams, RetryStrategy};

/// Seam inset scale forced by [`RetryStrategy::ForceSeamInset`].
const FORCED_INSET_SCALE: f64 = 2e-2;

/// The knobs a retry may change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    pub project_strips: bool,
    pub inset_scale: f64,
    pub inflate: f64,
}

impl Recipe {
    #[must_use]
    pub fn initial(params: &FilletParams, inflate: f64) -> Self {
        Self {
            project_strips: params.project_strips,
            inset_scale: params.inset_scale,
            inflate,
        }
    }
}

impl RetryStrategy {
    /// Resolves `Auto` and applies the adjustment. `None` when this
    /// strategy has nothing to change for `recipe`.
    #[must_use]
    pub fn adjust(self, recipe: &Recipe) -> Option<(Self, Recipe)> {
        match self {
            Self::None => None,
            Self::Auto => {
                if recipe.inflate > 0.0 {
                    Self::ShrinkInflate.adjust(recipe)
                } else {
                    Self::ToggleProjection.adjust(recipe)
                }
            }
            Self::ToggleProjection => Some((
                self,
                Recipe {
                    project_strips: !recipe.project_strips,
                    ..*recipe
                },
            )),
            Self::ForceSeamInset => (recipe.inset_scale < FORCED_INSET_SCALE).then(|| {
                (
                    self,
                    Recipe {
                        inset_scale: FORCED_INSET_SCALE,
                        ..*recipe
                    },
                )
            }),
            Self::ShrinkInflate => (recipe.inflate > 0.0).then(|| {
                (
                    self,
                    Recipe {
                        inflate: 0.5 * recipe.inflate,
                        ..*recipe
                    },
                )
            }),
        }
    }
}

/// One construction attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attempt {
    pub recipe: Recipe,
    /// The adjustment that produced this recipe; `None` for the first try.
    pub adjusted_by: Option<RetryStrategy>,
}

/// Bounded retry state: the initial recipe, then at most one adjusted one.
#[derive(Debug, Clone)]
pub struct RetryPlan {
    strategy: RetryStrategy,
    initial: Recipe,
    state: PlanState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanState {
    Fresh,
    Tried,
    Exhausted,
}

impl RetryPlan {
    #[must_use]
    pub fn new(strategy: RetryStrategy, initial: Recipe) -> Self {
        Self {
            strategy,
            initial,
            state: PlanState::Fresh,
        }
    }

    /// The next attempt, or `None` once the plan is exhausted.
    pub fn next_attempt(&mut self) -> Option<Attempt> {
        match self.state {
            PlanState::Fresh => {
                self.state = PlanState::Tried;
                Some(Attempt {
                    recipe: self.initial,
                    adjusted_by: None,
                })
            }
            PlanState::Tried => {
                self.state = PlanState::Exhausted;
                self.strategy
                    .adjust(&self.initial)
                    .map(|(strategy, recipe)| Attempt {
                        recipe,
                        adjusted_by: Some(strategy),
                    })
            }
            PlanState::Exhausted => None,
        }
    }
}
