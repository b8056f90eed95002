//! The escape-time test shared by every engine.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub real: f64,
    pub imaginary: f64,
}

impl Complex {
    pub const ZERO: Self = Complex {
        real: 0.0,
        imaginary: 0.0,
    };

    pub fn norm_sqr(&self) -> f64 {
        self.real * self.real + self.imaginary * self.imaginary
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationResult {
    /// `|Z|² > 4` first held after iteration `k`, with `0 <= k < max_iterations`.
    Escaped(u32),
    /// Still within radius 2 after `max_iterations` steps.
    Bounded,
}

impl IterationResult {
    /// Decodes an entry of an iteration-count buffer, where `max_iterations` means bounded.
    pub fn from_count(count: u32, max_iterations: u32) -> Self {
        if count >= max_iterations {
            IterationResult::Bounded
        } else {
            IterationResult::Escaped(count)
        }
    }

    pub fn to_count(self, max_iterations: u32) -> u32 {
        match self {
            IterationResult::Escaped(k) => k,
            IterationResult::Bounded => max_iterations,
        }
    }
}

/// Iterates `Z <- Z² + c` from `Z = 0`, testing for escape after every step.
pub fn escape_time(c: Complex, max_iterations: u32) -> IterationResult {
    let mut z = Complex::ZERO;
    for n in 0..max_iterations {
        let imaginary_sqr = z.imaginary * z.imaginary;
        z.imaginary = 2.0 * z.real * z.imaginary + c.imaginary;
        z.real = z.real * z.real - imaginary_sqr + c.real;

        if z.norm_sqr() > 4.0 {
            return IterationResult::Escaped(n);
        }
    }
    IterationResult::Bounded
}
