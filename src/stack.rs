//! Splitting of ill-formed clusters into stacks.
//!
//! A run of word characters that is not a single stack (see
//! [`is_well_formed_stack`](crate::char_categories::is_well_formed_stack)) is cut
//! left to right: each stack is extended for as long as the grammar allows and
//! closed right before the first character that would break it.

use crate::char_categories::StackState;

/// Split a run of characters into stacks.
///
/// Returns the exclusive end offset (in characters, relative to the run) of
/// each stack. The offsets are strictly increasing and the last one is
/// `run.len()`, so the spans cover the whole run without overlap. A character
/// that cannot start a stack (an orphan vowel sign, for instance) becomes a
/// span of its own. An empty run gives no spans.
pub fn split_stacks(run: &[char]) -> Vec<usize> {
    let mut breaks = Vec::new();
    let mut state = StackState::Start;
    let mut i = 0;

    while i < run.len() {
        match state.advance(run[i]) {
            Some(next) => {
                state = next;
                i += 1;
            }
            None if state.is_complete() => {
                // close the current stack, retry this character as a new one
                breaks.push(i);
                state = StackState::Start;
            }
            None => {
                i += 1;
                breaks.push(i);
            }
        }
    }

    if state.is_complete() {
        breaks.push(run.len());
    }

    breaks
}
