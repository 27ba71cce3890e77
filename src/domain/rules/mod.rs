// Domain rules - Business logic and policies

use crate::domain::errors::ValidationError;
use crate::domain::model::*;

/// Bounds an accepted trim attempt will play between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimPlan {
    pub start: f64,
    pub end: f64,
}

/// Preconditions a trim attempt must pass, in the order they are checked
pub struct TrimValidator;

impl TrimValidator {
    /// Check every precondition and fail on the first unmet one
    pub fn validate(
        source: Option<&SourceMedia>,
        ready_state: ReadyState,
        range: &TrimRange,
    ) -> Result<TrimPlan, ValidationError> {
        let source = source.ok_or(ValidationError::NoSource)?;

        if !ready_state.can_render_frames() {
            return Err(ValidationError::NotLoaded);
        }

        Self::check_bounds(range.start(), range.end(), source.duration())?;

        Ok(TrimPlan {
            start: range.start(),
            end: range.end(),
        })
    }

    /// Range checks 3 and 4 on raw numbers
    pub fn check_bounds(start: f64, end: f64, duration: f64) -> Result<(), ValidationError> {
        if end <= start {
            return Err(ValidationError::EndNotAfterStart);
        }
        if start < 0.0 || end > duration {
            return Err(ValidationError::OutOfRange);
        }
        Ok(())
    }

    /// Whether the trim trigger should be offered at all
    pub fn can_trigger(source: Option<&SourceMedia>, busy: bool) -> bool {
        match source {
            Some(source) => source.duration_known() && !busy,
            None => false,
        }
    }
}
