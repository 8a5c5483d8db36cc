//! Assignment eligibility shared by construction and repair.

use super::board::Board;
use super::context::GenerationContext;
use crate::models::Shift;

/// Whether a staff row can take a ward night on `day` under `cap`.
///
/// The cell must be movable and hold nothing, a day shift or an off day.
/// Rejects when the previous day is a night, the next day cannot hold the
/// after-shift, a third consecutive night cycle would form, or the work
/// run ending on the night would exceed the consecutive cap.
pub(crate) fn can_take_night(board: &Board<'_>, ctx: &GenerationContext, staff: usize, day: usize, cap: u32) -> bool {
    board.is_movable(staff, day) && night_fits(board, ctx, staff, day, cap)
}

/// Whether a staff row can take a ward night on the rest day of an
/// earlier night, turning night→after→off into night→after→night→after.
///
/// Same checks as [`can_take_night`]; the third-cycle check still applies.
pub(crate) fn can_take_night_over_rest(board: &Board<'_>, ctx: &GenerationContext, staff: usize, day: usize, cap: u32) -> bool {
    board.is_rest_day(staff, day) && night_fits(board, ctx, staff, day, cap)
}

fn night_fits(board: &Board<'_>, ctx: &GenerationContext, staff: usize, day: usize, cap: u32) -> bool {
    if cap == 0 || ctx.staff[staff].night_cap == 0 {
        return false;
    }
    if !matches!(board.get(staff, day), None | Some(Shift::Day) | Some(Shift::Off)) {
        return false;
    }
    if board.nights(staff) >= cap {
        return false;
    }
    if day > 0 && board.is_night(staff, day - 1) {
        return false;
    }

    let days = board.days();
    if day + 1 < days {
        if board.is_locked(staff, day + 1) {
            if board.get(staff, day + 1) != Some(Shift::NightAfter) {
                return false;
            }
        } else if !board.is_movable(staff, day + 1) || board.is_night(staff, day + 1) {
            return false;
        }
    }

    let night_at = |offset: isize| -> bool {
        let d = day as isize + offset;
        d >= 0 && (d as usize) < days && board.is_night(staff, d as usize)
    };
    if (night_at(-2) && night_at(-4)) || (night_at(-2) && night_at(2)) || (night_at(2) && night_at(4)) {
        return false;
    }

    board.run_before(staff, day) < ctx.max_consecutive()
}

/// Whether a staff row can switch an empty or off cell to a day shift.
pub(crate) fn can_take_day(board: &Board<'_>, ctx: &GenerationContext, staff: usize, day: usize) -> bool {
    ctx.can_work_day(staff, day)
        && board.is_movable(staff, day)
        && matches!(board.get(staff, day), None | Some(Shift::Off))
        && board.run_through(staff, day) <= ctx.max_consecutive()
}

/// Whether one more day off stays within the staff row's cap.
pub(crate) fn has_off_room(board: &Board<'_>, ctx: &GenerationContext, staff: usize) -> bool {
    ctx.off_cap(staff).map_or(true, |cap| board.days_off(staff) < cap)
}

/// Whether a movable day shift can become an off day.
pub(crate) fn can_drop_day(board: &Board<'_>, ctx: &GenerationContext, staff: usize, day: usize) -> bool {
    board.get(staff, day) == Some(Shift::Day) && board.is_movable(staff, day) && has_off_room(board, ctx, staff)
}

/// Ordering key used when pulling staff onto an understaffed day:
/// rank priority, then a low-night bucket, then total work.
pub(crate) fn fill_priority(board: &Board<'_>, ctx: &GenerationContext, staff: usize) -> (u8, u8, u32, usize) {
    let low_night = board.nights(staff) <= ctx.config.max_night_shifts / 2;
    (
        ctx.staff[staff].rank.priority(),
        u8::from(!low_night),
        board.total_work(staff),
        staff,
    )
}
