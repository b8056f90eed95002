//! Colouring algorithms.
//!
//! Escape iterations are mapped onto a black -> red -> white gradient: the
//! first half of the budget ramps red up from black, the second half ramps
//! green and blue up to white. Points that never escape are black.

use log::trace;
use rayon::prelude::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::{
    escape::IterationResult,
    pixel::{Pixel, Rgba},
};

pub fn colour_of(result: IterationResult, max_iterations: u32) -> Rgba {
    let n = match result {
        IterationResult::Bounded => return Rgba::BLACK,
        IterationResult::Escaped(n) => n,
    };

    let half = (max_iterations / 2).saturating_sub(1);
    if n <= half {
        Rgba::opaque(ramp(n, half), 0, 0)
    } else {
        let range = max_iterations
            .saturating_sub(1)
            .saturating_sub(max_iterations / 2);
        let start = n.saturating_sub(range);
        let value = ramp(start, range);
        Rgba::opaque(255, value, value)
    }
}

/// `value * 255 / end`, saturating at 255. An empty ramp is already at its end.
fn ramp(value: u32, end: u32) -> u8 {
    if end == 0 {
        return 255;
    }
    (u64::from(value) * 255 / u64::from(end)).min(255) as u8
}

/// Colours a row-major iteration-count buffer, where `max_iterations` means bounded.
pub fn colour_counts(counts: &[u32], width: u32, max_iterations: u32) -> Vec<Pixel> {
    trace!("begin colour_counts");

    let pixels = counts
        .par_iter()
        .enumerate()
        .map(|(index, count)| Pixel {
            x: (index % width as usize) as u32,
            y: (index / width as usize) as u32,
            colour: colour_of(IterationResult::from_count(*count, max_iterations), max_iterations),
        })
        .collect();

    trace!("end colour_counts");
    pixels
}
