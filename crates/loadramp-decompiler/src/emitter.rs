use std::time::Duration;

use loadramp_core::{Param, ProfileOp};

use crate::timeline::Breakpoint;

/// Walks breakpoints (implicit origin at `(0, 0)`) and emits the operations
/// reproducing them.
///
/// A ramp followed by a hold becomes one `RampToAndHold`. A ramp followed by
/// another ramp, or by the end, becomes `RampTo`. A hold with no ramp before
/// it becomes `HoldFor`. A jump to zero at the very end is left out, since the
/// schedule ending already implies it.
#[must_use]
pub fn emit_ops(points: &[Breakpoint]) -> Vec<ProfileOp> {
    let mut ops = Vec::new();
    let mut prev = Breakpoint::new(Duration::ZERO, 0);
    let mut hold = Duration::ZERO;
    let mut pending_ramp: Option<Duration> = None;

    for point in points {
        let elapsed = point.at.saturating_sub(prev.at);
        if point.level == prev.level {
            hold += elapsed;
        } else {
            flush(&mut ops, prev.level, pending_ramp, hold);
            hold = Duration::ZERO;
            pending_ramp = Some(elapsed);
        }
        prev = *point;
    }

    let trailing_drop = prev.level == 0 && pending_ramp == Some(Duration::ZERO) && hold.is_zero();
    if !trailing_drop {
        flush(&mut ops, prev.level, pending_ramp, hold);
    }
    ops
}

fn flush(ops: &mut Vec<ProfileOp>, level: u32, ramp: Option<Duration>, hold: Duration) {
    match ramp {
        Some(ramp) if hold.is_zero() => ops.push(ProfileOp::RampTo {
            concurrency: Param::Literal(level),
            duration: Param::Literal(ramp),
        }),
        Some(ramp) => ops.push(ProfileOp::RampToAndHold {
            concurrency: Param::Literal(level),
            ramp: Param::Literal(ramp),
            hold: Param::Literal(hold),
        }),
        None if !hold.is_zero() => ops.push(ProfileOp::HoldFor {
            duration: Param::Literal(hold),
        }),
        None => {}
    }
}
