//! Small helpers for the two periodic task loops.

use core::ops::Add;

/// Deadline of the next cycle.
///
/// Stays on the fixed grid while the loop keeps up. Once a cycle has overrun
/// the grid restarts one period after `now`, so missed cycles are dropped
/// instead of being run back to back.
pub fn next_deadline<T, D>(deadline: T, now: T, period: D) -> T
where
    T: Copy + Ord + Add<D, Output = T>,
    D: Copy,
{
    let next = deadline + period;
    if next < now {
        now + period
    } else {
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report<E> {
    /// First failure after a good cycle.
    Failed(E),
    /// Back to normal. `repeats` failures were swallowed in between.
    Recovered { repeats: u32 },
}

/// Turns per-cycle results into edge reports so a stuck peripheral is logged
/// once, not on every cycle.
#[derive(Debug, Default)]
pub struct FaultLatch {
    failing: bool,
    repeats: u32,
}

impl FaultLatch {
    pub fn observe<T, E>(&mut self, result: Result<T, E>) -> Option<Report<E>> {
        match (result, self.failing) {
            (Ok(_), false) => None,
            (Ok(_), true) => {
                let repeats = self.repeats;
                self.failing = false;
                self.repeats = 0;
                Some(Report::Recovered { repeats })
            }
            (Err(e), false) => {
                self.failing = true;
                Some(Report::Failed(e))
            }
            (Err(_), true) => {
                self.repeats = self.repeats.saturating_add(1);
                None
            }
        }
    }
}
